use std::sync::Arc;

use pairchat::{auth::{self, FirebaseIdentity, Identity, LocalIdentity}, blobs::BlobStore, chat, config::Config, db, index, live::Feed, users, AppState};
use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

const BLOB_URL_PREFIX: &str = "/blobs";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_minutes)));

    let db_pool = db::connect(&config.database_url).await?;

    let identity: Arc<dyn Identity> = match &config.firebase_api_key {
        Some(api_key) => {
            log::info!("accounts: firebase");
            Arc::new(FirebaseIdentity::new(api_key.clone()))
        }
        None => {
            log::info!("accounts: local database");
            Arc::new(LocalIdentity::new(db_pool.clone()))
        }
    };

    let app_state = AppState {
        db_pool,
        identity,
        feed: Feed::new(),
        blobs: BlobStore::new(config.blob_dir.clone(), BLOB_URL_PREFIX),
    };

    let app = Router::new()
        .route("/", get(index::index))

        .merge(auth::router())
        .merge(users::router())
        .merge(chat::router())
        .nest_service(BLOB_URL_PREFIX, ServeDir::new(&config.blob_dir))

        .with_state(app_state)
        .layer(session_layer);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
