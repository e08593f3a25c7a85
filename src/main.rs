//! filedock - A Remote File-Storage Server
//!
//! This is the main entry point for the filedock server.
//! It loads the configuration, opens the storage directory and runs the
//! accept loop until Ctrl+C.

use anyhow::Context;
use filedock::config::Config;
use filedock::server::Server;
use filedock::storage::FileStore;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
filedock v{} - Remote File-Storage Server
──────────────────────────────────────────────────────────────
Serving   {}
Listening {} ({} workers, {} pool)

Use Ctrl+C to shutdown gracefully.
"#,
        filedock::VERSION,
        config.storage_root.display(),
        config.bind_address(),
        config.max_workers,
        config.policy,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments and the optional config file
    let config = Config::load()?;

    // Set up logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    let store = FileStore::open(&config.storage_root).with_context(|| {
        format!(
            "failed to open storage root {}",
            config.storage_root.display()
        )
    })?;

    let server = Server::bind(&config, store).await?;

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        result = server.run() => result?,
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}
