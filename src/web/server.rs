use axum::http::header;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::catalog::cluster::ClusterConfig;
use crate::catalog::store::Database;
use crate::cli::ServeArgs;
use crate::core::sequence::Sequence;
use crate::matching::cancel::CancelToken;
use crate::matching::engine::{Ranking, SearchConfig, SearchEngine, SearchError};
use crate::parsing::fasta::parse_query;
use crate::report::SearchReport;
use crate::utils::validation::{query_file_stem, validate_upload, ValidationError};

/// Security configuration constants to prevent `DoS` attacks
pub const MAX_MULTIPART_FIELDS: usize = 10;
pub const MAX_FILE_FIELD_SIZE: usize = 16 * 1024 * 1024; // 16MB
pub const MAX_TEXT_FIELD_SIZE: usize = 1024 * 1024; // 1MB

/// Searches align against every reference, so allow far longer than a typical request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared application state
pub struct AppState {
    /// Current database snapshot; a reload swaps in a new one
    database: RwLock<Arc<Database>>,
    cluster_config: ClusterConfig,
    search_config: SearchConfig,
    data_dir: Option<PathBuf>,
    last_report: RwLock<Option<SearchReport>>,
}

impl AppState {
    pub fn new(database: Database, cluster_config: ClusterConfig, search_config: SearchConfig) -> Self {
        Self {
            data_dir: database.source.clone(),
            database: RwLock::new(Arc::new(database)),
            cluster_config,
            search_config,
            last_report: RwLock::new(None),
        }
    }

    pub async fn snapshot(&self) -> Arc<Database> {
        Arc::clone(&*self.database.read().await)
    }
}

/// Enhanced error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    // Log detailed error server-side for debugging (not exposed to client)
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None, // Never expose internal details to prevent information disclosure
    }
}

fn error_response(
    status: StatusCode,
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> Response {
    (
        status,
        Json(create_safe_error_response(
            error_type,
            user_message,
            internal_error,
        )),
    )
        .into_response()
}

/// Cancels the search when the request is dropped (client gone or request timed out)
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the database cannot be loaded, the tokio runtime cannot
/// be created, or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let cluster_config = args.database.cluster_config();
    let search_config = args.ranking.search_config(&args.database.alignment);
    search_config.validate()?;

    let database = Database::load_and_cluster(&args.database.db, &cluster_config)?;
    tracing::info!(
        "Serving {} references in {} families",
        database.collection.len(),
        database.families.len()
    );
    let state = Arc::new(AppState::new(database, cluster_config, search_config));

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, state).await })
}

/// API routes bound to `state`, without the protective middleware
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/search", post(search_handler))
        .route("/api/report", get(report_handler))
        .route("/api/families", get(families_handler))
        .route("/api/reload", post(reload_handler))
        .with_state(state)
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the rate limiter configuration is rejected.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?;

    // Build router with comprehensive security layers
    let app = api_routes(state).layer(
        ServiceBuilder::new()
            // Security headers for browser protection
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-xss-protection"),
                HeaderValue::from_static("1; mode=block"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            // IP-based rate limiting to prevent abuse
            .layer(GovernorLayer {
                config: Arc::new(governor_conf),
            })
            // Request timeout to prevent slow client attacks
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                REQUEST_TIMEOUT,
            ))
            // Limit concurrent requests to prevent DOS
            .layer(ConcurrencyLimitLayer::new(100))
            // Limit request body size (accommodate largest file + multipart overhead)
            .layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB limit
    );

    Ok(app)
}

async fn run_server(args: ServeArgs, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting seq-kin web server at http://{addr}");

    if args.open {
        if let Err(e) = open::that(format!("http://{addr}")) {
            tracing::warn!("Could not open a browser: {e}");
        }
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Main page handler
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("templates/index.html"))
}

/// Query input and options extracted from the multipart form
#[derive(Debug, Default)]
struct SearchRequest {
    text: Option<String>,
    filename: Option<String>,
    threshold: Option<f64>,
}

/// API endpoint for ranking the database against a query
async fn search_handler(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let start_time = Instant::now();

    let request = match extract_request_data(&mut multipart).await {
        Ok(request) => request,
        Err(error_response) => return error_response,
    };

    let Some(text) = request.text.as_deref() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_input",
            "No data received. Please upload a file or paste a DNA sequence.",
            None,
        );
    };

    let query = match parse_query(text) {
        Ok(query) => name_from_upload(query, text, request.filename.as_deref()),
        Err(e) => {
            tracing::debug!("Rejected query: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_query",
                "No valid DNA sequence found in the provided input",
                None,
            );
        }
    };

    let mut config = state.search_config.clone();
    if let Some(threshold) = request.threshold {
        config.threshold = threshold;
    }

    let database = state.snapshot().await;
    let cancel = config.cancel_token();
    let guard = CancelOnDrop(cancel.clone());

    let task = {
        let database = Arc::clone(&database);
        let query = query.clone();
        tokio::task::spawn_blocking(move || {
            let threshold = config.threshold;
            SearchEngine::for_database(&database, config)
                .rank(query.bases(), &cancel)
                .map(|ranking| (ranking, threshold))
        })
    };

    let outcome = task.await;
    drop(guard);

    match outcome {
        Ok(Ok((ranking, threshold))) => {
            let report = SearchReport::new(query.name(), &ranking, &database.families);
            *state.last_report.write().await = Some(report);

            #[allow(clippy::cast_possible_truncation)] // Processing time won't exceed u64
            let processing_time = start_time.elapsed().as_millis() as u64;
            search_success(&query, &ranking, &database, threshold, processing_time)
        }
        Ok(Err(e)) => search_error_response(&e),
        Err(join_error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred while processing the search",
            Some(&join_error.to_string()),
        ),
    }
}

/// A headerless upload is named after its file
fn name_from_upload(query: Sequence, text: &str, filename: Option<&str>) -> Sequence {
    if text.trim_start().starts_with('>') {
        return query;
    }
    match filename.and_then(query_file_stem) {
        Some(stem) => query.with_name(stem),
        None => query,
    }
}

fn search_success(
    query: &Sequence,
    ranking: &Ranking,
    database: &Database,
    threshold: f64,
    processing_time: u64,
) -> Response {
    let matches: Vec<serde_json::Value> = ranking
        .matches
        .iter()
        .map(|m| {
            serde_json::json!({
                "name": m.name,
                "score": m.score,
                "family": database.families.family_of(&m.name),
                "aligned_query": m.aligned_query,
                "aligned_reference": m.aligned_reference,
            })
        })
        .collect();

    Json(serde_json::json!({
        "success": true,
        "query": query,
        "matches": matches,
        "best_family": ranking.best_family,
        "processing_info": {
            "processing_time_ms": processing_time,
            "compared": ranking.compared,
            "faults": ranking.faults,
            "threshold": threshold,
            "database_loaded_at": database.loaded_at,
        }
    }))
    .into_response()
}

fn search_error_response(error: &SearchError) -> Response {
    match error {
        SearchError::InvalidQuery(_) => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            "No valid DNA sequence found in the provided input",
            None,
        ),
        SearchError::NoMatch { .. } => error_response(
            StatusCode::NOT_FOUND,
            "no_match",
            "No matches found above the threshold",
            None,
        ),
        SearchError::EmptyCollection => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "empty_database",
            "No DNA sequences found in the database",
            None,
        ),
        SearchError::Interrupted(reason) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "search_interrupted",
            "The search was stopped before it finished",
            Some(&reason.to_string()),
        ),
        SearchError::InvalidConfig(_) => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_configuration",
            "The search options are invalid",
            None,
        ),
        SearchError::AllTasksFailed(_) | SearchError::ThreadPool(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred while processing the search",
            Some(&error.to_string()),
        ),
    }
}

fn validation_error_response(error: &ValidationError) -> Response {
    let (error_type, message) = match error {
        ValidationError::FilenameTooLong => (
            "filename_too_long",
            "Filename exceeds maximum length limit",
        ),
        ValidationError::InvalidFilename | ValidationError::EmptyFilename => (
            "invalid_filename",
            "Filename contains invalid or dangerous characters",
        ),
        ValidationError::InvalidFileContent => (
            "invalid_content",
            "File content appears malformed or corrupted",
        ),
    };
    error_response(StatusCode::BAD_REQUEST, error_type, message, None)
}

fn too_large(error_type: &str, message: &str) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorResponse {
            error: message.to_string(),
            error_type: error_type.to_string(),
            details: None,
        }),
    )
        .into_response()
}

async fn extract_request_data(multipart: &mut Multipart) -> Result<SearchRequest, Response> {
    let mut request = SearchRequest::default();
    let mut fields_received = 0usize;

    loop {
        // Check field count limit before processing
        if fields_received >= MAX_MULTIPART_FIELDS {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "field_limit_exceeded",
                "Too many form fields",
                None,
            ));
        }

        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Malformed multipart body: {e}");
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "malformed_upload",
                    "Failed to parse upload. Please check the file format.",
                    None,
                ));
            }
        };
        fields_received += 1;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(ToString::to_string);
                let Ok(bytes) = field.bytes().await else {
                    continue;
                };
                if bytes.is_empty() && filename.as_deref().map_or(true, str::is_empty) {
                    // Browsers send an empty file part when nothing was chosen
                    continue;
                }
                if bytes.len() > MAX_FILE_FIELD_SIZE {
                    return Err(too_large("file_too_large", "File size exceeds limit"));
                }

                request.filename =
                    validate_upload(filename.as_deref(), &bytes).map_err(|e| validation_error_response(&e))?;
                request.text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            "sequence_text" => {
                let Ok(text) = field.text().await else {
                    continue;
                };
                if text.len() > MAX_TEXT_FIELD_SIZE {
                    return Err(too_large(
                        "text_too_large",
                        "Text field size exceeds limit",
                    ));
                }
                // An uploaded file takes precedence over pasted text
                if request.text.is_none() && !text.trim().is_empty() {
                    request.text = Some(text);
                }
            }
            "threshold" => {
                if let Ok(text) = field.text().await {
                    match text.trim().parse::<f64>() {
                        Ok(threshold) if threshold.is_finite() => {
                            request.threshold = Some(threshold);
                        }
                        _ if text.trim().is_empty() => {}
                        _ => {
                            return Err(error_response(
                                StatusCode::BAD_REQUEST,
                                "invalid_threshold",
                                "Threshold must be a number",
                                None,
                            ));
                        }
                    }
                }
            }
            _ => {} // Ignore unknown fields
        }
    }

    Ok(request)
}

/// Text report of the most recent successful search
async fn report_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.last_report.read().await.as_ref() {
        Some(report) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"virus_report.txt\"",
                ),
            ],
            report.render_text(),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "no_report",
            "No report available. Run a search first.",
            None,
        ),
    }
}

async fn families_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = state.snapshot().await;
    Json(families_json(&database))
}

fn families_json(database: &Database) -> serde_json::Value {
    let families: Vec<serde_json::Value> = database
        .families
        .iter()
        .map(|(family, members)| {
            let members: Vec<&Sequence> = members
                .iter()
                .filter_map(|name| database.collection.get(name))
                .collect();
            serde_json::json!({
                "family": family,
                "members": members,
            })
        })
        .collect();

    serde_json::json!({
        "count": families.len(),
        "reference_count": database.collection.len(),
        "loaded_at": database.loaded_at,
        "families": families,
    })
}

/// Reload the database directory and recluster
async fn reload_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(dir) = state.data_dir.clone() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "no_data_dir",
            "This server was not started from a database directory",
            None,
        );
    };

    let config = state.cluster_config.clone();
    let loaded =
        tokio::task::spawn_blocking(move || Database::load_and_cluster(&dir, &config)).await;

    match loaded {
        Ok(Ok(database)) => {
            let body = serde_json::json!({
                "success": true,
                "reference_count": database.collection.len(),
                "family_count": database.families.len(),
                "loaded_at": database.loaded_at,
            });
            *state.database.write().await = Arc::new(database);
            tracing::info!("Database reloaded");
            Json(body).into_response()
        }
        Ok(Err(e)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "reload_failed",
            "Failed to reload the database",
            Some(&e.to_string()),
        ),
        Err(join_error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred while reloading",
            Some(&join_error.to_string()),
        ),
    }
}
