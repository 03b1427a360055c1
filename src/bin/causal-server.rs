//! Causal Effect API Server Binary
//!
//! Run with: `cargo run --bin causal-server`

use causal_panel::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server()
    // Set RUST_LOG to control log level:
    //   RUST_LOG=debug cargo run --bin causal-server
    //   RUST_LOG=causal_panel::estimation=debug cargo run --bin causal-server  (per-cell output)

    // HOST, PORT, DATABASE_PATH and MODEL (linear | random_forest) override the defaults
    let config = ServerConfig::from_env();

    println!("Starting Causal Effect API Server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Database: {}", config.database_path);
    println!("   Model: {:?}", config.model);
    println!();
    println!(
        "Server will be available at: http://{}:{}",
        config.host, config.port
    );
    println!();
    println!("Available endpoints:");
    println!("  GET  /health            - Health check");
    println!("  POST /data              - Upload panel CSV");
    println!("  GET  /variables         - Dataset variables");
    println!("  POST /parse_graph       - Upload grouped graph");
    println!("  GET  /graph/variables   - Static/dynamic graph variables");
    println!("  GET  /causal_effect     - Intervention x delay effect grid");
    println!();

    run_server(config).await?;

    Ok(())
}
