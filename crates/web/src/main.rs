use std::path::PathBuf;

use tracing::info;

use framedev_web::DevtoolsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // FRAMEDEV_CONFIG points at a TOML file; FRAMEDEV_* variables override it.
    let config_path = std::env::var("FRAMEDEV_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("framedev.toml"));

    let cfg = DevtoolsConfig::load(&config_path)?.with_env()?;

    info!(
        "Starting framedev {} (config: {}, {} routes)",
        framedev_common::VERSION,
        config_path.display(),
        cfg.routes.len()
    );

    framedev_web::server::serve(cfg).await
}
