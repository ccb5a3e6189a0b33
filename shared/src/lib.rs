//! Shared types for the market platform
//!
//! Common types used by both market-server and market-client:
//! order and payment-session models, roles, push-event messages,
//! request/response DTOs and time utilities.

pub mod message;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{PushEvent, PushEventType};
pub use models::{Order, OrderAction, OrderStatus, PaymentSession, Role, SessionStatus};
pub use response::ApiResponse;
