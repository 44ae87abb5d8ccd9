pub mod handlers;
mod types;

pub use types::{ErrorResponse, PromptRequest, PromptResponse};

use crate::{Result, config::Config, llm::OllamaChatClient};
use axum::{Router, routing::post};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: handlers::AppState) -> Router {
    Router::new()
        .route("/get_response", post(handlers::get_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let chat_client = OllamaChatClient::new(config.llm.clone())?;

    let app_state = handlers::AppState {
        chat: Arc::new(chat_client),
    };

    let app = router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
