//! Service entry point: wires the stores, the dispatcher workers, the
//! prober and the HTTP API together.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use oncallsrv::api::routes;
use oncallsrv::assign::AssignmentResolver;
use oncallsrv::dispatcher::Dispatcher;
use oncallsrv::engine::LifecycleEngine;
use oncallsrv::lease::LeaseRegistry;
use oncallsrv::notify::LogNotifier;
use oncallsrv::prober::{build_http_client, IncidentCorrelator, Prober};
use oncallsrv::queue::AlertQueue;
use oncallsrv::store::{schema, AlertStore, OnCallStore, UptimeStore};
use oncallsrv::transient::{RedisTransientStore, TransientStore};
use oncallsrv::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    oncall_common::logging::init_with_config(oncall_common::logging::LogConfig {
        service_name: config.service.name.clone(),
        log_dir: None,
        default_filter: format!("info,{}=debug", oncallsrv::SERVICE_NAME),
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting {} v{}", oncallsrv::SERVICE_NAME, oncallsrv::VERSION);

    // Durable store
    let db = oncall_common::SqliteClient::new(&config.store.path).await?;
    schema::run_migrations(db.pool()).await?;

    // Transient store (queue + lease registry)
    let transient: Arc<dyn TransientStore> =
        Arc::new(RedisTransientStore::new(&config.redis.url).await?);
    info!("Connected to Redis at {}", config.redis.url);

    let alerts = AlertStore::new(db.pool().clone());
    let oncall = OnCallStore::new(db.pool().clone());
    let uptime = UptimeStore::new(db.pool().clone());
    let queue = AlertQueue::new(transient.clone());
    let leases = LeaseRegistry::new(transient.clone());
    let resolver = AssignmentResolver::new(oncall.clone());

    let engine = LifecycleEngine::new(
        alerts.clone(),
        queue.clone(),
        leases.clone(),
        resolver,
        config.escalation_ttl(),
    );

    let notifier = Arc::new(LogNotifier);

    // Dispatcher workers
    let mut dispatchers = Vec::new();
    for worker_index in 0..config.dispatcher.workers.max(1) {
        let dispatcher = Dispatcher::new(
            queue.clone(),
            leases.clone(),
            alerts.clone(),
            engine.clone(),
            oncall.clone(),
            notifier.clone(),
            config.dispatcher_config(worker_index),
        );
        tokio::spawn(dispatcher.clone().run());
        dispatchers.push(dispatcher);
    }

    // Uptime prober
    let http = build_http_client()?;
    let correlator = IncidentCorrelator::new(uptime.clone(), engine.clone());
    let prober = Prober::new(
        uptime.clone(),
        correlator.clone(),
        http.clone(),
        config.prober_config(),
    );
    tokio::spawn(prober.run());

    // HTTP API
    let state = AppState {
        config: Arc::new(config.clone()),
        db,
        engine,
        alerts,
        oncall,
        uptime,
        queue,
        correlator,
        http,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.service.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.service.bind))?;
    info!("API listening on {}", config.service.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = oncall_common::shutdown::wait_for_shutdown().await;
            info!("{} received, shutting down", signal);
        })
        .await
        .context("API server exited")?;

    // Hand any in-flight alert back to a successor before exiting.
    for dispatcher in &dispatchers {
        dispatcher.release_current().await;
    }
    info!("Shutdown complete");

    Ok(())
}
