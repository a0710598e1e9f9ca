//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that build the [`App`]
//! from configuration and expose it through the MCP tool handler.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

use crate::tools::DotsparkTools;
use dotspark::config::DotsparkConfig;
use dotspark::App;

/// Build the shared application state.
fn setup_shared_state(config: &DotsparkConfig) -> Result<Arc<App>> {
    let app = App::from_config(config)?;
    tracing::info!("engine ready");
    Ok(Arc::new(app))
}

/// Start the MCP server on the configured transport.
pub async fn serve(config: DotsparkConfig) -> Result<()> {
    match config.server.transport.as_str() {
        "stdio" => serve_stdio(config).await,
        "http" => serve_http(config).await,
        other => anyhow::bail!("unknown transport: {other}. Supported: stdio, http"),
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: DotsparkConfig) -> Result<()> {
    tracing::info!("starting dotspark MCP server on stdio");

    let app = setup_shared_state(&config)?;
    let tools = DotsparkTools::new(app, config.retrieval.default_limit);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over streamable HTTP transport.
pub async fn serve_http(config: DotsparkConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting dotspark MCP server on HTTP");

    let app = setup_shared_state(&config)?;
    let default_limit = config.retrieval.default_limit;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(DotsparkTools::new(Arc::clone(&app), default_limit)),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
