mod config;
mod routes;

use std::sync::Arc;

use parking_lot::RwLock;
use registry::{
    AgentRegistry, FileStore, HttpAuthService, KeyValueStore, LoginFlow, MemoryStore,
    SessionStore,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{dispatcher, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::AdminConfig;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::from_env()?;
    init_tracing(&config.log_filter)?;
    let state = build_state(&config)?;

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, auth_url = %config.auth_url, "admin console starting");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Installs the JSON log subscriber. `RUST_LOG` wins over `fallback`.
fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    if dispatcher::has_been_set() {
        return Ok(());
    }
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_target(true))
        .try_init()?;
    Ok(())
}

fn build_state(config: &AdminConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn KeyValueStore> = match &config.store_path {
        Some(path) => {
            info!(path = %path.display(), "using file-backed session store");
            Arc::new(FileStore::new(path)?)
        }
        None => Arc::new(MemoryStore::new()),
    };
    let auth = HttpAuthService::new(config.auth_url.clone(), config.auth_timeout)?;
    let registry = if config.seed_sample {
        AgentRegistry::seeded()
    } else {
        AgentRegistry::default()
    };

    Ok(AppState {
        registry: Arc::new(RwLock::new(registry)),
        login: LoginFlow::new(Arc::new(auth), SessionStore::new(store)),
        page_sizes: config.page_sizes.clone(),
    })
}
