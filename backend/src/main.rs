use std::sync::Arc;
use backend::{
    build_rocket,
    config::AppConfig,
    controller::PhaseController,
    images::{DiskImageStore, ImageStore},
    pg_store::PgStore,
    processor::ContestProcessor,
    routes::AppState,
    store::ContestStore,
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tokio::time::{interval, Duration};
use tracing::{info, error};

async fn run_orphan_sweep(store: Arc<dyn ContestStore>, images: Arc<dyn ImageStore>, every: Duration) {
    let mut interval = interval(every);
    // Images younger than one sweep interval may still be mid-upload.
    let grace = time::Duration::try_from(every).unwrap_or(time::Duration::ZERO);
    info!("🧹 Orphan image sweep started");

    loop {
        interval.tick().await;
        match PhaseController::sweep_orphan_images(store.as_ref(), images.as_ref(), grace).await {
            Ok(0) => {}
            Ok(removed) => info!("🗑️ Removed {} orphaned costume images", removed),
            Err(e) => error!("Orphan image sweep failed: {}", e),
        }
    }
}

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🎃 Starting costume contest server");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let config = AppConfig::from_lookup(|key| secret_store.get(key));
    std::fs::create_dir_all(&config.image_dir).map_err(CustomError::new)?;

    let store: Arc<dyn ContestStore> = Arc::new(PgStore::new(pool));
    let images: Arc<dyn ImageStore> = Arc::new(DiskImageStore::new(config.image_dir.clone()));

    ContestProcessor::ensure_settings(store.as_ref())
        .await
        .map_err(CustomError::new)?;

    tokio::spawn(run_orphan_sweep(
        store.clone(),
        images.clone(),
        Duration::from_secs(config.orphan_sweep_seconds),
    ));

    let rocket = build_rocket(AppState::new(store, images, config));
    Ok(rocket.into())
}
