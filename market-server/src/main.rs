use market_server::{BackgroundTasks, Config, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment();

    tracing::info!("Market server starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 初始化服务器状态
    let state = ServerState::initialize(config).await?;

    // 4. 启动后台任务 (副作用 worker、期限调度、推送保活)
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks).await?;

    // 5. 启动 HTTP 服务器，Ctrl-C 触发优雅关闭
    let shutdown = tasks.shutdown_token();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            ctrl_c_shutdown.cancel();
        }
    });

    if let Err(e) = market_server::core::server::serve(state, shutdown).await {
        tracing::error!("Server error: {}", e);
        tasks.shutdown().await;
        return Err(e.into());
    }

    tasks.shutdown().await;
    Ok(())
}
