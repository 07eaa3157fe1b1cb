use std::path::Path;

use engine::Engine;
use util::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::global().clone();

    let _log_guard = common::logger::init_logging(
        Path::new("logs"),
        &config.log_file,
        &config.log_level,
        config.log_to_stdout,
    );

    let engine = Engine::start(&config).await?;

    tracing::info!(
        project = %config.project_name,
        env = %config.env,
        database = %config.database_path,
        armed = engine.sweep.armed,
        immediate = engine.sweep.immediate,
        "engine running"
    );
    println!(
        "{} ({}) running, {} deadline(s) armed. Ctrl-C to stop.",
        config.project_name, config.env, engine.sweep.armed
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    engine.shutdown();
    Ok(())
}
