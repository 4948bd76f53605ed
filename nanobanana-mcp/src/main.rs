//! Nano Banana MCP Server
//!
//! MCP server for image generation and editing using Gemini image models.

use anyhow::Result;
use clap::Parser;
use nanobanana_mcp::{NanoBananaHandler, NanoBananaServer};
use nanobanana_mcp_common::config::API_KEY_ENV;
use nanobanana_mcp_common::{Config, McpServerBuilder, TransportArgs};

/// Command-line arguments for the Nano Banana server.
#[derive(Parser, Debug)]
#[command(name = "nanobanana-mcp")]
#[command(about = "MCP server for image generation and editing using Gemini image models")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    nanobanana_mcp_common::tracing::init_tracing();

    tracing::info!("nanobanana-mcp server starting...");

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        output_dir = %config.output_dir.display(),
        model_override = ?config.model_override,
        "Configuration loaded"
    );

    // Create the server handler and pick up any existing API key
    let server = NanoBananaServer::new(NanoBananaHandler::new(config));
    let env_key = std::env::var(API_KEY_ENV).ok();
    server.load_on_startup(env_key.as_deref()).await;

    // Build and run the MCP server
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
