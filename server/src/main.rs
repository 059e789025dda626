use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use campus_events_server::config::Config;
use campus_events_server::routes::create_routes;
use campus_events_server::state::AppState;
use campus_events_server::store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("campus_events_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let state = match &config.database_url {
        Some(url) => {
            let store = Arc::new(PgStore::connect(url, config.max_connections).await?);
            store.migrate().await?;
            AppState::new(store.clone(), store, &config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
            AppState::in_memory(&config)
        }
    };

    if let Some(admin) = &config.admin {
        state.accounts.ensure_admin(admin).await?;
    }

    let app = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Campus events API listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
