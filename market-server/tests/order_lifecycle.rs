//! 订单生命周期集成测试
//!
//! 内存数据库 + mock 协作方，走与生产相同的服务装配路径。

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use market_server::core::{BackgroundTasks, Config, ServerState};
use market_server::db::DbService;
use market_server::orders::{Actor, OrderError};
use market_server::services::gateway::mock::MockGateway;
use market_server::services::inventory::mock::MockInventory;
use market_server::services::{InventoryService, PaymentGateway};
use shared::message::PushEventType;
use shared::models::{Order, OrderAction, OrderItem, OrderStatus, Role, SessionStatus};
use shared::request::CreateOrderRequest;

const BUYER: &str = "buyer-1";
const SELLER: &str = "seller-1";

struct TestHarness {
    state: ServerState,
    gateway: Arc<MockGateway>,
    inventory: Arc<MockInventory>,
    // 持有任务管理器，测试结束前后台任务保持运行
    _tasks: BackgroundTasks,
}

async fn harness() -> TestHarness {
    harness_with_config(Config::for_tests()).await
}

async fn harness_with_config(config: Config) -> TestHarness {
    let db = DbService::memory().await.unwrap();
    let gateway = Arc::new(MockGateway::default());
    let inventory = Arc::new(MockInventory::default());

    let state = ServerState::initialize_with_collaborators(
        config,
        db,
        gateway.clone() as Arc<dyn PaymentGateway>,
        inventory.clone() as Arc<dyn InventoryService>,
    )
    .unwrap();

    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks).await.unwrap();

    TestHarness {
        state,
        gateway,
        inventory,
        _tasks: tasks,
    }
}

fn cart() -> CreateOrderRequest {
    CreateOrderRequest {
        seller_id: SELLER.to_string(),
        items: vec![OrderItem {
            product_id: "p-1".to_string(),
            name: "Ceramic mug".to_string(),
            price: 250_000,
            quantity: 2,
            image: None,
        }],
        shipping_fee: 30_000,
        discount: 0,
        shipping_address: "1 Example Street".to_string(),
        shipping_method: "standard".to_string(),
        note: None,
    }
}

fn buyer() -> Actor {
    Actor::user(BUYER, Role::Buyer)
}

fn seller() -> Actor {
    Actor::user(SELLER, Role::Seller)
}

async fn create_order(h: &TestHarness) -> Order {
    h.state.orders.create(BUYER, cart()).await.unwrap()
}

/// 创建 + 开启会话 + 支付成功，订单落在 AWAITING_ACCEPT
async fn create_paid_order(h: &TestHarness) -> Order {
    let order = create_order(h).await;
    h.state.payments.open(&order.order_id).await.unwrap();
    h.state
        .payments
        .resolve_success(&order.order_id)
        .await
        .unwrap();
    h.state.orders.find(&order.order_id).await.unwrap().unwrap()
}

async fn wait_for<F: Fn() -> bool>(cond: F, what: &str) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

// ===== 场景：完整正向流程 =====

#[tokio::test]
async fn test_full_happy_path() {
    let h = harness().await;

    let order = create_order(&h).await;
    assert_eq!(order.subtotal, 500_000);
    assert_eq!(order.total, 530_000);
    assert_eq!(order.status, OrderStatus::AwaitingPayment);

    let session = h.state.payments.open(&order.order_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Open);
    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.expires_at, Some(session.deadline_millis()));

    h.state
        .payments
        .resolve_success(&order.order_id)
        .await
        .unwrap();
    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::AwaitingAccept);
    assert_eq!(stored.expires_at, None);

    h.state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::Confirm)
        .await
        .unwrap();
    let delivered = h
        .state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::MarkReceived)
        .await
        .unwrap();

    assert_eq!(delivered.status, OrderStatus::Delivered);
    // created + payment_succeeded + confirm + mark_received
    assert_eq!(delivered.timeline.len(), 4);
    assert_eq!(delivered.timeline[0].status, OrderStatus::AwaitingPayment);
    assert_eq!(delivered.timeline[3].status, OrderStatus::Delivered);

    // 创建时预占库存
    wait_for(
        || h.inventory.reserved.lock().unwrap().contains(&delivered.order_id),
        "inventory reservation",
    )
    .await;
}

// ===== 场景：取消协商恢复原状态 =====

#[tokio::test]
async fn test_reject_cancel_restores_prior_status() {
    let h = harness().await;
    let order = create_paid_order(&h).await;
    assert_eq!(order.status, OrderStatus::AwaitingAccept);

    let requested = h
        .state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::CancelRequest)
        .await
        .unwrap();
    assert_eq!(requested.status, OrderStatus::CancelRequested);
    assert_eq!(requested.prior_status, Some(OrderStatus::AwaitingAccept));

    let restored = h
        .state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::RejectCancel)
        .await
        .unwrap();
    assert_eq!(restored.status, OrderStatus::AwaitingAccept);
    assert_eq!(restored.prior_status, None);
}

#[tokio::test]
async fn test_reject_cancel_restores_accepted() {
    let h = harness().await;
    let order = create_paid_order(&h).await;
    h.state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::Confirm)
        .await
        .unwrap();

    h.state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::CancelRequest)
        .await
        .unwrap();
    let restored = h
        .state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::RejectCancel)
        .await
        .unwrap();
    assert_eq!(restored.status, OrderStatus::Accepted);
}

// ===== 场景：同意取消进入终态 =====

#[tokio::test]
async fn test_accept_cancel_is_terminal_and_refunds() {
    let h = harness().await;
    let order = create_paid_order(&h).await;

    h.state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::CancelRequest)
        .await
        .unwrap();
    let cancelled = h
        .state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::AcceptCancel)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // 终态后任何动作都非法
    let err = h
        .state
        .orders
        .apply_transition(&seller(), &order.order_id, OrderAction::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    // 已支付订单取消：回补库存 + 退款
    wait_for(
        || h.inventory.restored.lock().unwrap().contains(&order.order_id),
        "inventory restore",
    )
    .await;
    wait_for(
        || h.gateway.refunds.lock().unwrap().contains(&order.order_id),
        "refund scheduling",
    )
    .await;
}

#[tokio::test]
async fn test_cancel_before_payment_has_no_refund() {
    let h = harness().await;
    let order = create_order(&h).await;

    let cancelled = h
        .state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::CancelOrder)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    wait_for(
        || h.inventory.restored.lock().unwrap().contains(&order.order_id),
        "inventory restore",
    )
    .await;
    assert!(h.gateway.refunds.lock().unwrap().is_empty());
}

// ===== 场景:并发流转只提交一次 =====

#[tokio::test]
async fn test_concurrent_confirm_commits_once() {
    let h = harness().await;
    let order = create_paid_order(&h).await;

    // 支付事件已送达完毕后再注册，之后收到的只有 confirm 的推送
    let (_conn, mut rx) = h.state.registry.register(BUYER);

    let seller = seller();
    let (a, b) = tokio::join!(
        h.state
            .orders
            .apply_transition(&seller, &order.order_id, OrderAction::Confirm),
        h.state
            .orders
            .apply_transition(&seller, &order.order_id, OrderAction::Confirm),
    );

    let results = [a, b];
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok_count, 1, "exactly one of the two confirms may commit");
    let conflict = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        conflict.as_ref().unwrap_err(),
        OrderError::InvalidTransition { .. }
    ));

    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Accepted);
    // 时间线只记录一次 confirm
    assert_eq!(
        stored
            .timeline
            .iter()
            .filter(|e| e.status == OrderStatus::Accepted)
            .count(),
        1
    );

    // 恰好一条 ORDER_UPDATED 推送
    let mut updates = 0;
    while let Ok(event) = rx.try_recv() {
        if event.event_type == PushEventType::OrderUpdated {
            updates += 1;
        }
    }
    assert_eq!(updates, 1);
}

// ===== 支付会话 =====

#[tokio::test]
async fn test_duplicate_webhook_is_idempotent() {
    let h = harness().await;
    let order = create_order(&h).await;
    h.state.payments.open(&order.order_id).await.unwrap();

    let (_conn, mut rx) = h.state.registry.register(BUYER);

    h.state
        .payments
        .resolve_success(&order.order_id)
        .await
        .unwrap();
    h.state
        .payments
        .resolve_success(&order.order_id)
        .await
        .unwrap();

    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::AwaitingAccept);
    assert_eq!(
        stored
            .timeline
            .iter()
            .filter(|e| e.status == OrderStatus::AwaitingAccept)
            .count(),
        1
    );

    let mut successes = 0;
    while let Ok(event) = rx.try_recv() {
        if event.event_type == PushEventType::PaymentSuccess {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_open_session_is_single_flight() {
    let h = harness().await;
    let order = create_order(&h).await;

    h.state.payments.open(&order.order_id).await.unwrap();
    let err = h.state.payments.open(&order.order_id).await.unwrap_err();
    assert!(matches!(err, OrderError::SessionConflict { .. }));

    // 过期后可重开
    h.state.payments.expire(&order.order_id).await.unwrap();
    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::AwaitingPayment);
    assert_eq!(stored.expires_at, None);

    let reopened = h.state.payments.open(&order.order_id).await.unwrap();
    assert_eq!(reopened.status, SessionStatus::Open);
}

#[tokio::test]
async fn test_expire_is_noop_after_success() {
    let h = harness().await;
    let order = create_order(&h).await;
    h.state.payments.open(&order.order_id).await.unwrap();
    h.state
        .payments
        .resolve_success(&order.order_id)
        .await
        .unwrap();

    // 定时器与回调竞争：晚到的过期不得覆盖成功
    h.state.payments.expire(&order.order_id).await.unwrap();

    let session = h.state.payments.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Succeeded);
    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::AwaitingAccept);
}

#[tokio::test]
async fn test_gateway_unavailable_leaves_order_payable() {
    let h = harness().await;
    let order = create_order(&h).await;

    h.gateway.unavailable.store(true, Ordering::SeqCst);
    let err = h.state.payments.open(&order.order_id).await.unwrap_err();
    assert!(matches!(err, OrderError::UpstreamUnavailable { .. }));

    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::AwaitingPayment);

    // 网关恢复后重开成功：失败的 open 不得留下占位
    h.gateway.unavailable.store(false, Ordering::SeqCst);
    h.state.payments.open(&order.order_id).await.unwrap();
    assert_eq!(h.gateway.checkout_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_session_ttl_follows_config() {
    let mut config = Config::for_tests();
    config.session_ttl_secs = 60;
    let h = harness_with_config(config).await;

    let order = create_order(&h).await;
    let session = h.state.payments.open(&order.order_id).await.unwrap();
    assert_eq!(session.expire_in, 60);
    assert_eq!(session.deadline_millis(), session.created_at + 60_000);

    let stored = h.state.orders.find(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.expires_at, Some(session.deadline_millis()));
}

#[tokio::test]
async fn test_open_session_recovery_scan() {
    let h = harness().await;
    let order = create_order(&h).await;
    let session = h.state.payments.open(&order.order_id).await.unwrap();

    let recovered = h.state.payments.scan_open_sessions().await.unwrap();
    assert!(
        recovered
            .iter()
            .any(|(id, deadline)| id == &order.order_id && *deadline == session.deadline_millis())
    );
}

// ===== 授权 =====

#[tokio::test]
async fn test_stranger_cannot_transition() {
    let h = harness().await;
    let order = create_paid_order(&h).await;

    // 非参与方与读路径一致，以 NotFound 掩盖订单存在性
    let stranger = Actor::user("seller-999", Role::Seller);
    let err = h
        .state
        .orders
        .apply_transition(&stranger, &order.order_id, OrderAction::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound { .. }));

    // 买家不能执行卖家动作
    let err = h
        .state
        .orders
        .apply_transition(&buyer(), &order.order_id, OrderAction::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_admin_can_act_for_either_side() {
    let h = harness().await;
    let order = create_paid_order(&h).await;

    let admin = Actor::user("admin-1", Role::Admin);
    let confirmed = h
        .state
        .orders
        .apply_transition(&admin, &order.order_id, OrderAction::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Accepted);
    // 管理员代操作与普通操作记录方式一致
    assert_eq!(confirmed.timeline.last().unwrap().actor_id, "admin-1");

    let delivered = h
        .state
        .orders
        .apply_transition(&admin, &order.order_id, OrderAction::MarkReceived)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_payment_succeeded_rejected_for_users() {
    let h = harness().await;
    let order = create_order(&h).await;

    // 管理员也不能伪造支付确认
    let admin = Actor::user("admin-1", Role::Admin);
    let err = h
        .state
        .orders
        .apply_transition(&admin, &order.order_id, OrderAction::PaymentSucceeded)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Unauthorized { .. }));
}

// ===== 可见性 =====

#[tokio::test]
async fn test_get_and_list_scoped_by_role() {
    let h = harness().await;
    let order = create_order(&h).await;

    // 参与方可见
    h.state
        .orders
        .get_for_actor(BUYER, Role::Buyer, &order.order_id)
        .await
        .unwrap();
    h.state
        .orders
        .get_for_actor(SELLER, Role::Seller, &order.order_id)
        .await
        .unwrap();

    // 外人不可见（以 NotFound 掩盖存在性）
    let err = h
        .state
        .orders
        .get_for_actor("buyer-999", Role::Buyer, &order.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound { .. }));

    let mine = h
        .state
        .orders
        .list_for_actor(BUYER, Role::Buyer, None)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let none = h
        .state
        .orders
        .list_for_actor(BUYER, Role::Buyer, Some(OrderStatus::Delivered))
        .await
        .unwrap();
    assert!(none.is_empty());
    let admin_view = h
        .state
        .orders
        .list_for_actor("admin-1", Role::Admin, None)
        .await
        .unwrap();
    assert_eq!(admin_view.len(), 1);
}
