use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::auth::JwtService;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::repository::{OrderRepository, PaymentSessionRepository};
use crate::db::DbService;
use crate::message::{ConnectionRegistry, Notifier};
use crate::orders::OrderService;
use crate::payments::{ExpiryScheduler, PaymentSessionManager};
use crate::services::gateway::HttpPaymentGateway;
use crate::services::inventory::HttpInventoryService;
use crate::services::{
    InventoryService, PaymentGateway, SideEffectQueue, SideEffectWorker,
};
use crate::utils::AppError;

/// 尚未启动的后台工作者
///
/// worker 持有 channel 接收端，不可克隆，初始化后暂存于此，
/// 由 [`ServerState::start_background_tasks`] 一次性取走。
struct PendingWorkers {
    side_effect_worker: SideEffectWorker,
    expiry_rx: mpsc::UnboundedReceiver<(String, i64)>,
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 |
/// | jwt_service | JWT 验签服务 |
/// | registry | 推送连接注册表 |
/// | notifier | 业务事件推送 |
/// | orders | 订单状态机服务 |
/// | payments | 支付会话管理器 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub jwt_service: Arc<JwtService>,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Notifier,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentSessionManager>,
    workers: Arc<StdMutex<Option<PendingWorkers>>>,
}

impl ServerState {
    /// 初始化全部服务（生产入口）
    pub async fn initialize(config: Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.data_dir).await?;
        let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
            config.gateway_url.clone(),
            config.session_ttl_secs,
        ));
        let inventory: Arc<dyn InventoryService> =
            Arc::new(HttpInventoryService::new(config.inventory_url.clone()));
        Self::initialize_with_collaborators(config, db, gateway, inventory)
    }

    /// 以指定数据库与协作方初始化（测试以内存库 + mock 进入）
    pub fn initialize_with_collaborators(
        config: Config,
        db: DbService,
        gateway: Arc<dyn PaymentGateway>,
        inventory: Arc<dyn InventoryService>,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::new(&config.jwt));

        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(registry.clone());

        let (side_effects, side_effect_rx) = SideEffectQueue::new();
        let orders = Arc::new(OrderService::new(
            OrderRepository::new(db.db.clone()),
            notifier.clone(),
            side_effects,
        ));

        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let payments = Arc::new(PaymentSessionManager::new(
            PaymentSessionRepository::new(db.db.clone()),
            orders.clone(),
            gateway.clone(),
            notifier.clone(),
            config.session_ttl_secs,
            expiry_tx,
        ));

        let side_effect_worker = SideEffectWorker::new(side_effect_rx, gateway, inventory);

        Ok(Self {
            config,
            db,
            jwt_service,
            registry,
            notifier,
            orders,
            payments,
            workers: Arc::new(StdMutex::new(Some(PendingWorkers {
                side_effect_worker,
                expiry_rx,
            }))),
        })
    }

    /// 启动后台任务：副作用 worker、期限调度器、推送保活
    ///
    /// 只能调用一次；期限调度器启动前先扫描存量 OPEN 会话重建定时器。
    pub async fn start_background_tasks(
        &self,
        tasks: &mut BackgroundTasks,
    ) -> Result<(), AppError> {
        let pending = self
            .workers
            .lock()
            .map_err(|_| AppError::internal("Worker state poisoned"))?
            .take()
            .ok_or_else(|| AppError::internal("Background tasks already started"))?;

        let recovered = self
            .payments
            .scan_open_sessions()
            .await
            .map_err(AppError::from)?;

        tasks.spawn(
            "side_effect_worker",
            TaskKind::Worker,
            pending.side_effect_worker.run(tasks.shutdown_token()),
        );

        let scheduler = ExpiryScheduler::new(pending.expiry_rx, self.payments.clone(), recovered);
        tasks.spawn(
            "expiry_scheduler",
            TaskKind::Worker,
            scheduler.run(tasks.shutdown_token()),
        );

        let registry = self.registry.clone();
        let interval = Duration::from_secs(self.config.ping_interval_secs);
        let shutdown = tasks.shutdown_token();
        tasks.spawn("push_keepalive", TaskKind::Periodic, async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => registry.ping_all(),
                }
            }
        });

        tasks.log_summary();
        Ok(())
    }
}
