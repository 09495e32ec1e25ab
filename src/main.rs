use anyhow::Context;
use calltone::application::call::{CallService, Repositories};
use calltone::config::{Config, StorageBackend, SyncConfig};
use calltone::domain::billing::OrganizationUsageRecorder;
use calltone::domain::guardrails::PlanGuardrails;
use calltone::domain::rate_limit::{InMemoryRateLimiter, RateLimiter};
use calltone::infrastructure::persistence::MemoryRepositories;
use calltone::infrastructure::vapi::VapiClient;
use calltone::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use calltone::infrastructure::persistence::{
    create_pool, pg_repositories, run_migrations, PgRateLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting CallTone");

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics().context("Failed to install metrics recorder")?;

    let (repos, rate_limiter) = storage(&config).await?;

    if config.vapi.api_key.is_empty() {
        warn!("No Vapi API key configured; call dispatch will be rejected");
    }
    if config.vapi.webhook_secret.is_none() {
        warn!("No webhook secret configured; webhooks are accepted unauthenticated");
    }
    let vapi = VapiClient::new(
        config.vapi.api_key.clone(),
        config.vapi.base_url.clone(),
        config.vapi.request_timeout(),
    )
    .context("Failed to build Vapi client")?;

    let call_service = Arc::new(CallService::new(
        repos.clone(),
        Arc::new(PlanGuardrails::new(repos.organizations.clone())),
        Arc::new(OrganizationUsageRecorder::new(repos.organizations.clone())),
        Arc::new(vapi),
    ));

    let sweep = if config.sync.enabled {
        Some(spawn_sync_sweep(call_service.clone(), &config.sync))
    } else {
        info!("Call sync sweep disabled");
        None
    };

    let state = AppState {
        call_service,
        rate_limiter,
        initiate_limit: config.rate_limit.initiate_limit,
        rate_window: config.rate_limit.window(),
        webhook_secret: config.vapi.webhook_secret.clone(),
    };
    let app = build_router(state, prometheus_handle);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind {}:{}",
                    config.server.host, config.server.port
                )
            })?;
    info!(
        "REST API server listening on {}:{}",
        config.server.host, config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweep {
        handle.abort();
        info!("Call sync sweep stopped");
    }
    info!("CallTone stopped");

    Ok(())
}

#[cfg(feature = "postgres")]
async fn storage(config: &Config) -> anyhow::Result<(Repositories, Arc<dyn RateLimiter>)> {
    let needs_pool = config.storage.backend == StorageBackend::Postgres
        || config.rate_limit.backend == StorageBackend::Postgres;

    let pool = if needs_pool {
        let pool = create_pool(&config.database)
            .await
            .context("Failed to connect to database")?;
        run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
        Some(pool)
    } else {
        None
    };

    let repos = match (config.storage.backend, &pool) {
        (StorageBackend::Postgres, Some(pool)) => {
            info!("Using PostgreSQL storage");
            pg_repositories(pool.clone())
        }
        _ => memory_repositories(),
    };

    let rate_limiter: Arc<dyn RateLimiter> = match (config.rate_limit.backend, pool) {
        (StorageBackend::Postgres, Some(pool)) => {
            info!("Using shared PostgreSQL rate limiter");
            Arc::new(PgRateLimiter::new(pool))
        }
        _ => Arc::new(InMemoryRateLimiter::new()),
    };

    Ok((repos, rate_limiter))
}

#[cfg(not(feature = "postgres"))]
async fn storage(config: &Config) -> anyhow::Result<(Repositories, Arc<dyn RateLimiter>)> {
    if config.storage.backend == StorageBackend::Postgres
        || config.rate_limit.backend == StorageBackend::Postgres
    {
        anyhow::bail!("PostgreSQL backend configured but the postgres feature is disabled");
    }
    Ok((memory_repositories(), Arc::new(InMemoryRateLimiter::new())))
}

fn memory_repositories() -> Repositories {
    warn!("Using in-memory storage; records are lost on restart");
    MemoryRepositories::new().repositories()
}

/// Periodically refresh dispatched calls the webhooks have gone quiet on
fn spawn_sync_sweep(service: Arc<CallService>, config: &SyncConfig) -> JoinHandle<()> {
    let stale_after = config.stale_after();
    let batch_size = config.batch_size;
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Call sync sweep every {:?} for calls idle over {}s",
        config.interval(),
        stale_after.num_seconds()
    );

    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            if let Err(e) = service.sync_stale_calls(stale_after, batch_size).await {
                error!("Call sync sweep failed: {}", e);
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
