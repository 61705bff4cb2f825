use crate::agent::{ AskError, ChatAgent };
use crate::cli::Args;
use crate::history::encode_log;
use crate::models::api::{ AskRequest, AskResponse, ErrorResponse, HistoryResponse };
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::{ ServeDir, ServeFile };
use log::{ info, warn };

pub const MISSING_PROMPT_MESSAGE: &str = "Prompt is missing.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
pub const HISTORY_ERROR_MESSAGE: &str = "Failed to load history.";

#[derive(Clone)]
struct AppState {
    agent: Arc<ChatAgent>,
}

/// Builds the HTTP surface: `POST /ask`, `GET /history`, and the static UI.
pub fn router(agent: Arc<ChatAgent>, public_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let index = ServeFile::new(public_dir.join("index.html"));
    let assets = ServeDir::new(public_dir);

    Router::new()
        .route("/ask", post(ask_handler))
        .route("/history", get(history_handler))
        .route_service("/", index)
        .fallback_service(assets)
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    addr: SocketAddr,
    app: Router,
    args: &Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                return Err("ENABLE_TLS requires both --tls-cert-path and --tls-key-path".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Server running at https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
        })?;

        info!("Server running at http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

fn error_response(code: StatusCode, message: &str) -> Response {
    (code, Json(ErrorResponse::new(message))).into_response()
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Unreadable /ask body: {}", rejection);
            AskRequest::default()
        }
    };

    match state.agent.ask(request.prompt.as_deref()).await {
        Ok(answer) => (StatusCode::OK, Json(AskResponse { answer })).into_response(),
        Err(AskError::MissingPrompt) => error_response(StatusCode::BAD_REQUEST, MISSING_PROMPT_MESSAGE),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE),
    }
}

async fn history_handler(State(state): State<AppState>) -> Response {
    match state.agent.history().await {
        Ok(log) => {
            let history = encode_log(&log);
            (StatusCode::OK, Json(HistoryResponse { history })).into_response()
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, HISTORY_ERROR_MESSAGE),
    }
}
