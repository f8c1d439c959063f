use actix_web::web;
use mcp_tools_server::core::config::ServerConfig;
use mcp_tools_server::core::server::{self, AppState};

/// State with the built-in tools and default configuration.
pub fn state() -> web::Data<AppState> {
    server::app_state(ServerConfig::default())
}

/// State whose static files live under `dir`.
#[allow(dead_code)]
pub fn state_in(dir: &std::path::Path) -> web::Data<AppState> {
    server::app_state(ServerConfig {
        manifest_path: dir.join("app_manifest.json"),
        widget_dir: dir.join("components"),
        ..ServerConfig::default()
    })
}
