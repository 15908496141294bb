// ./api/src/main.rs
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    ApplicationError, DocumentRepository, DocumentService, SaveDocumentRequest, StatsService,
};
use domain::{DocumentId, SearchRequest};
use infrastructure::InMemoryDocumentRepository;

mod config;

use config::ServerConfig;

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    document_service: Arc<DocumentService>,
    stats_service: Arc<StatsService>,
}

impl AppState {
    fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            document_service: Arc::new(DocumentService::new(repository.clone())),
            stats_service: Arc::new(StatsService::new(repository)),
        }
    }
}

#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let config = ServerConfig::from_env();

    // --- Dependency Injection ---
    let repository = Arc::new(InMemoryDocumentRepository::new());
    info!("In-memory document store initialized.");
    let app = router(AppState::new(repository));
    info!("API routes configured.");

    // --- Server Startup ---
    let addr = config.bind_addr();
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats_handler))
        .route("/documents", post(save_document_handler))
        .route("/documents/search", post(search_documents_handler))
        .route("/documents/:doc_id", get(get_document_handler))
        .with_state(state)
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

/// Handler for saving a document (POST /documents).
async fn save_document_handler(
    State(state): State<AppState>,
    Json(payload): Json<Option<SaveDocumentRequest>>,
) -> Response {
    let Some(request) = payload else {
        return map_application_error_to_response(ApplicationError::InvalidInput(
            "Document body is required".to_string(),
        ));
    };
    info!(has_id = request.id.is_some(), "Received request to save document");
    match state.document_service.save_document(request).await {
        Ok(document) => (StatusCode::CREATED, JsonResponse(document)).into_response(),
        Err(e) => {
            error!("Failed to save document via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for fetching a document (GET /documents/:doc_id).
async fn get_document_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Response {
    info!(doc_id = %doc_id, "Received request to get document");
    let id = match doc_id.parse::<DocumentId>() {
        Ok(id) => id,
        Err(e) => return map_application_error_to_response(e.into()),
    };
    match state.document_service.get_document(&id).await {
        Ok(document) => (StatusCode::OK, JsonResponse(document)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for searching documents (POST /documents/search).
async fn search_documents_handler(
    State(state): State<AppState>,
    Json(payload): Json<Option<SearchRequest>>,
) -> Response {
    let Some(request) = payload else {
        return map_application_error_to_response(ApplicationError::InvalidInput(
            "Search request body is required".to_string(),
        ));
    };
    info!(
        unfiltered = request.is_unfiltered(),
        "Received search request via POST"
    );
    match state.document_service.search_documents(request).await {
        Ok(response) => {
            info!(
                "Search completed successfully via handler, {} total hits",
                response.nb_hits
            );
            (StatusCode::OK, JsonResponse(response)).into_response()
        }
        Err(e) => {
            error!("Failed to search documents via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn get_stats_handler(State(state): State<AppState>) -> Response {
    info!("Received request to get statistics");
    match state.stats_service.get_stats().await {
        Ok(stats_response) => (StatusCode::OK, JsonResponse(stats_response)).into_response(),
        Err(e) => {
            error!("Failed to get statistics via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps ApplicationError to HTTP status codes and response body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        ApplicationError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Document '{}' not found", id),
        ),
        ApplicationError::InfrastructureError(msg) => {
            error!("Underlying infrastructure error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            (StatusCode::BAD_REQUEST, domain_err.to_string())
        }
    };
    (status, body).into_response()
}
