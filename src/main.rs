use std::sync::{Arc, RwLock};

use slideforge_backend::{cascade, config::AppConfig, db, logging, server};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    tracing::info!("Starting Slideforge backend v{}", env!("CARGO_PKG_VERSION"));

    let app_config = AppConfig::from_env();

    // The base schema must exist before anything else runs; this is the one
    // failure that aborts startup.
    let pool = match db::init_db(&app_config.database_path) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut effective = app_config.initial_effective();
    cascade::resolve(&pool, &mut effective);
    let config = Arc::new(RwLock::new(effective));

    if let Err(e) = server::serve(pool, config, &app_config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
