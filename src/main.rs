use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use trendai::{
    auth::AuthService,
    gallery::Gallery,
    gemini::GeminiClient,
    server::{self, AppState},
    store::{FileBackend, KvStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);
    let bind_address = format!("0.0.0.0:{}", port);

    let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    let model = match resolve_base_url()? {
        Some(base_url) => GeminiClient::with_base_url(api_key, base_url),
        None => GeminiClient::new(api_key),
    };

    let data_dir = resolve_data_dir();
    let backend = Arc::new(FileBackend::new(data_dir.clone())?);
    let store = KvStore::new(backend);
    let state = Arc::new(AppState {
        model: Arc::new(model),
        auth: AuthService::new(store.clone()),
        gallery: Gallery::new(store),
    });

    let static_dir = env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    let router = server::router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(%bind_address, data_dir = %data_dir.display(), "trendai server started");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn resolve_data_dir() -> PathBuf {
    let data_dir = env::var("DATA_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    if let Some(dir) = data_dir {
        return dir;
    }
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("trendai");
    base
}

fn resolve_base_url() -> Result<Option<Url>> {
    let Some(raw) = env::var("GEMINI_BASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(None);
    };
    let url = Url::parse(raw.trim())
        .with_context(|| format!("GEMINI_BASE_URL is not a valid URL: {raw}"))?;
    Ok(Some(url))
}
