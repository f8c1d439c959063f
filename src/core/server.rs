//! MCP Server Implementation
//!
//! HTTP transport (Actix Web) for the REST tool endpoints, the JSON-RPC
//! endpoint and the SSE stream, plus a line-based STDIO transport that shares
//! the same dispatcher.

use std::future::Future;
use std::time::Duration;

use actix_web::{
    App, HttpResponse, HttpServer,
    error::BlockingError,
    http::{Method, StatusCode, header},
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use serde_json::{Map, Value, json};
use tokio::time;

use crate::core::config::ServerConfig;
use crate::core::dispatcher::{Dispatcher, ServerInfo};
use crate::core::error::ToolError;
use crate::core::protocol::{JsonRpcError, JsonRpcResponse};
use crate::core::registry::{Lookup, ToolRegistry};
use crate::core::sse;
use crate::tools;

const SERVER_DESCRIPTION: &str = "A comprehensive set of tools including weather, calculator, text analysis, and file search capabilities";

/// Application state shared across all worker threads and transports.
pub struct AppState {
    pub config: ServerConfig,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: ServerConfig, registry: ToolRegistry) -> Self {
        let dispatcher = Dispatcher::new(registry, ServerInfo::from(&config));
        Self { config, dispatcher }
    }
}

/// State with the built-in tools, ready to hand to [`configure`]'s app.
pub fn app_state(config: ServerConfig) -> web::Data<AppState> {
    web::Data::new(AppState::new(config, ToolRegistry::builtin()))
}

/// Register every route. Shared by the production server and tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/", web::get().to(health))
        .service(
            web::resource("/mcp")
                .route(web::post().to(mcp_rpc))
                .route(web::get().to(mcp_info))
                .route(web::route().method(Method::OPTIONS).to(preflight)),
        )
        .service(
            web::resource("/mcp/sse")
                .route(web::get().to(mcp_sse))
                .route(web::route().method(Method::OPTIONS).to(preflight)),
        )
        .service(
            web::resource("/mcp/tools")
                .route(web::get().to(tools_manifest))
                .route(web::route().method(Method::OPTIONS).to(preflight)),
        )
        .route("/tools/{name}", web::post().to(call_tool))
        .route("/manifest", web::get().to(app_manifest))
        .route("/widget/{name}", web::get().to(widget));
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn detail(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "detail": message.into() }))
}

enum Aborted {
    Timeout,
    Worker(BlockingError),
}

/// Run synchronous work on the blocking pool under the request deadline.
fn with_deadline<F, R>(deadline: Duration, work: F) -> impl Future<Output = Result<R, Aborted>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    async move {
        match time::timeout(deadline, web::block(work)).await {
            Err(_) => Err(Aborted::Timeout),
            Ok(Err(e)) => Err(Aborted::Worker(e)),
            Ok(Ok(value)) => Ok(value),
        }
    }
}

fn request_timeout(deadline: Duration) -> HttpResponse {
    tracing::warn!(?deadline, "request exceeded deadline");
    detail(StatusCode::GATEWAY_TIMEOUT, "Request timeout")
}

/// Health check endpoint handler.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": now()
    }))
}

/// Describes the MCP surface for clients that `GET /mcp`.
async fn mcp_info(state: web::Data<AppState>) -> HttpResponse {
    let info = state.dispatcher.info();
    HttpResponse::Ok().json(json!({
        "name": info.name,
        "version": info.version,
        "description": SERVER_DESCRIPTION,
        "endpoints": {
            "rpc": "/mcp",
            "sse": "/mcp/sse",
            "tools": "/mcp/tools",
            "health": "/health"
        }
    }))
}

/// JSON-RPC endpoint.
///
/// The body is taken raw so malformed JSON is answered with a JSON-RPC parse
/// error rather than an extractor rejection.
async fn mcp_rpc(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let deadline = state.config.request_timeout;
    let worker = state.clone();
    match with_deadline(deadline, move || worker.dispatcher.handle_raw(&body)).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(Aborted::Timeout) => request_timeout(deadline),
        Err(Aborted::Worker(e)) => {
            tracing::error!(error = %e, "dispatch worker failed");
            HttpResponse::Ok().json(JsonRpcResponse::error(None, JsonRpcError::internal_error(e)))
        }
    }
}

/// Keep-alive event stream bound to the connection's lifetime.
async fn mcp_sse(state: web::Data<AppState>) -> HttpResponse {
    let (_emitter, body) = sse::spawn(
        state.dispatcher.initialize_result(),
        state.config.sse_ping_interval,
    );

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
        ]))
        // Disable nginx buffering for real-time streaming
        .insert_header(("x-accel-buffering", "no"))
        // Keeps Compress from buffering the stream
        .insert_header((header::CONTENT_ENCODING, "identity"))
        .streaming(body)
}

/// CORS preflight for the MCP paths.
async fn preflight() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization, Accept"))
        .insert_header((header::ACCESS_CONTROL_MAX_AGE, "86400"))
        .finish()
}

async fn tools_manifest(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.tools_list_result())
}

/// REST tool endpoint: `POST /tools/{name}` with the arguments as the body.
async fn call_tool(
    state: web::Data<AppState>,
    name: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    let name = name.into_inner();
    let descriptor = match state.dispatcher.registry().resolve(&name) {
        Lookup::Found(descriptor) => descriptor.clone(),
        Lookup::Unknown => {
            return detail(
                StatusCode::NOT_FOUND,
                format!("Unknown tool: {name}"),
            );
        }
    };

    let arguments: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(arguments) => arguments,
        Err(e) => return actix_web::ResponseError::error_response(&ToolError::from(e)),
    };

    let deadline = state.config.request_timeout;
    let kind = descriptor.kind;
    let outcome = with_deadline(deadline, move || tools::invoke(kind, &arguments)).await;

    match outcome {
        Ok(Ok(output)) => HttpResponse::Ok().json(json!({
            "content": [{ "type": "text", "text": output.text }],
            "structuredContent": output.structured,
            "_meta": {
                "openai/outputTemplate": descriptor.output_template(),
                "openai/toolInvocation/invoking": descriptor.invoking,
                "openai/toolInvocation/invoked": descriptor.invoked
            }
        })),
        Ok(Err(e)) => {
            tracing::warn!(tool = descriptor.name, error = %e, "tool failed");
            actix_web::ResponseError::error_response(&e)
        }
        Err(Aborted::Timeout) => request_timeout(deadline),
        Err(Aborted::Worker(e)) => {
            tracing::error!(tool = descriptor.name, error = %e, "tool worker failed");
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} tool error: {e}", descriptor.name),
            )
        }
    }
}

/// App manifest for chat clients, read from disk on each request.
async fn app_manifest(state: web::Data<AppState>) -> HttpResponse {
    let path = &state.config.manifest_path;
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return detail(StatusCode::NOT_FOUND, "App manifest not found");
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read manifest");
            return detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "App manifest could not be read",
            );
        }
    };

    match serde_json::from_slice::<Value>(&raw) {
        Ok(manifest) => HttpResponse::Ok().json(manifest),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "manifest is not valid JSON");
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "App manifest is not valid JSON",
            )
        }
    }
}

/// Widget HTML served from the configured directory. `name` may omit the
/// `.html` suffix; anything that could leave the directory is a 404.
async fn widget(state: web::Data<AppState>, name: web::Path<String>) -> HttpResponse {
    let name = name.into_inner();
    let not_found = || detail(StatusCode::NOT_FOUND, "Widget not found");

    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return not_found();
    }
    let file = if name.ends_with(".html") { name } else { format!("{name}.html") };

    match tokio::fs::read(state.config.widget_dir.join(&file)).await {
        Ok(html) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(e) => {
            tracing::debug!(%file, error = %e, "widget not served");
            not_found()
        }
    }
}

/// Run the MCP server in HTTP mode.
///
/// The server is configured with:
/// - Worker threads: from config (CPU count, max 16, by default)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive: 30 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(state: web::Data<AppState>) -> std::io::Result<()> {
    let config = state.config.clone();
    let bind_addr = config.bind_addr();

    tracing::info!(
        name = %config.server_name,
        version = %config.server_version,
        bind = %bind_addr,
        workers = config.workers,
        tools = state.dispatcher.registry().list().len(),
        "MCP server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Access-Control-Allow-Origin", "*")),
            )
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure)
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// Reads newline-delimited JSON-RPC requests from stdin and writes one
/// response per line to stdout. Id-less notifications get no reply. All
/// logging goes to stderr.
pub async fn run_server_stdio(state: web::Data<AppState>) -> std::io::Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

    tracing::info!(
        name = %state.config.server_name,
        version = %state.config.server_version,
        "MCP server starting (STDIO mode)"
    );

    let mut stdin = BufReader::with_capacity(8192, tokio::io::stdin()).lines();
    let mut stdout = BufWriter::with_capacity(8192, tokio::io::stdout());

    while let Some(line) = stdin.next_line().await? {
        let Some(response) = state.dispatcher.handle_line(&line) else {
            continue;
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                continue;
            }
        };

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn slow_work_hits_the_deadline() {
        let outcome = with_deadline(Duration::from_millis(1), || {
            std::thread::sleep(Duration::from_millis(300));
        })
        .await;
        assert!(matches!(outcome, Err(Aborted::Timeout)));
    }

    #[actix_rt::test]
    async fn fast_work_returns_its_value() {
        let outcome = with_deadline(Duration::from_secs(5), || 6 * 7).await;
        assert!(matches!(outcome, Ok(42)));
    }

    #[actix_rt::test]
    async fn timeout_response_is_504_with_detail() {
        let resp = request_timeout(Duration::from_millis(1));
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"detail": "Request timeout"}));
    }
}
