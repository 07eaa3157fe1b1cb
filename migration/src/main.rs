use std::{env, fs, path::Path, process};

use util::config::AppConfig;

mod runner;

#[tokio::main]
async fn main() {
    let config = AppConfig::global().clone();
    let db_path = config.database_path.clone();
    let url = format!("sqlite://{}?mode=rwc", db_path);
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(|s| s.as_str()) {
        Some("clean") => clean(&db_path, &config.storage_root),
        Some("fresh") => match clean(&db_path, &config.storage_root) {
            Ok(()) => migrate(&db_path, &url).await,
            Err(e) => Err(e),
        },
        _ => migrate(&db_path, &url).await,
    };

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}

async fn migrate(db_path: &str, url: &str) -> Result<(), String> {
    if let Some(parent) = Path::new(db_path).parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create DB directory: {e}"))?;
    }
    runner::run_all_migrations(url).await
}

fn clean(db_path: &str, storage_root: &str) -> Result<(), String> {
    let db_file = Path::new(db_path);
    if db_file.exists() {
        fs::remove_file(db_file).map_err(|e| format!("Failed to delete DB file: {e}"))?;
        println!("Deleted DB: {}", db_file.display());
    } else {
        println!("DB file does not exist: {}", db_file.display());
    }

    // Stored submissions belong to the rows that were just dropped.
    let submissions = util::paths::submissions_dir(Path::new(storage_root));
    if submissions.exists() {
        fs::remove_dir_all(&submissions)
            .map_err(|e| format!("Failed to delete stored submissions: {e}"))?;
        println!("Deleted stored submissions: {}", submissions.display());
    }
    Ok(())
}
