use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::info;

mod app;
mod dispatch;
mod error;
mod http;
mod ratelimit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coordinator_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("COORD_CONFIG").ok();
    let config = coordinator_core::config::CoordinatorConfig::load(config_path.as_deref())?;

    let pool = coordinator_db::build_pool(&config.database.db_url)?;
    {
        let conn = pool.get()?;
        coordinator_db::schema::init_schema(&conn)?;
    }

    let session_store = coordinator_sessions::SessionStore::connect(config.cache.url.as_deref()).await;

    let (outbox_adapters, tabular_store_adapter, llm) = app::build_adapters(&config);
    let state = Arc::new(app::AppState::new(
        config.clone(),
        pool.clone(),
        session_store,
        llm,
        tabular_store_adapter,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let outbox_repo = coordinator_db::OutboxRepo::new(pool.clone());
    let mut outbox_pool = coordinator_outbox::OutboxWorkerPool::new(outbox_repo, 4)
        .with_boss_conversation(config.transport.boss_user_id.clone());
    for adapter in outbox_adapters {
        outbox_pool.register(adapter);
    }
    let outbox_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        outbox_pool.run(outbox_shutdown).await;
    });

    let scheduler_conn = rusqlite::Connection::open(&config.database.db_url)?;
    let scheduler_handle = coordinator_scheduler::SchedulerHandle::new(scheduler_conn)?;
    let tz: chrono_tz::Tz = config
        .timezone
        .parse()
        .unwrap_or(chrono_tz::Tz::UTC);
    coordinator_scheduler::seed_jobs(&scheduler_handle, tz)?;

    let (fired_tx, fired_rx) = mpsc::channel(32);
    let engine_conn = rusqlite::Connection::open(&config.database.db_url)?;
    let scheduler_engine = coordinator_scheduler::SchedulerEngine::new(engine_conn, Some(fired_tx))?;
    let engine_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        scheduler_engine.run(engine_shutdown).await;
    });

    let job_runner = coordinator_scheduler::JobRunner {
        task_repo: coordinator_db::TaskRepo::new(pool.clone()),
        reminder_ledger: coordinator_db::ReminderLedgerRepo::new(pool.clone()),
        recurring_repo: coordinator_db::RecurringTaskRepo::new(pool.clone()),
        audit_repo: coordinator_db::AuditRepo::new(pool.clone()),
        outbox: coordinator_db::OutboxRepo::new(pool.clone()),
        boss_conversation_id: config.transport.boss_user_id.clone(),
    };
    tokio::spawn(async move {
        job_runner.run(fired_rx).await;
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("coordinator gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}
