mod auth;
mod error;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use pointdesk_core::{ChangeNotifier, Desk, Store};
use pointdesk_platform::{PgStore, RedisBus, ServiceConfig, connect_database, ensure_schema};
use pointdesk_store::{BroadcastNotifier, InMemoryStore};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::auth::TokenSigner;
use crate::routes::{AppState, build_router};

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "pointdesk_gateway=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = connect_database(database_url).await?;
            ensure_schema(&pool).await?;
            info!("using postgres store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, data will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let notifier: Arc<dyn ChangeNotifier> = match &config.redis_url {
        Some(redis_url) => {
            info!("publishing change events to redis");
            Arc::new(RedisBus::connect(redis_url)?)
        }
        None => {
            let bus = BroadcastNotifier::default();
            let mut events = bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => debug!(
                            "{} {} {:?}",
                            event.entity, event.entity_id, event.change
                        ),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("change log fell behind by {skipped} event(s)")
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            Arc::new(bus)
        }
    };

    let desk = Desk::new(store, notifier);
    if desk.ensure_admin(&config.admin_password).await? {
        warn!("created default administrator account, change its password");
    }

    let state = AppState {
        desk,
        tokens: TokenSigner::new(&config.jwt_secret, config.token_ttl_minutes),
    };
    let router = build_router(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
