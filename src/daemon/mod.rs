use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::SettingsFile,
    notify::Notifier,
    rpc::server::RpcServer,
    storage::Database,
    utils::{clock::DefaultClock, dir::AppPaths},
};

pub mod args;
pub mod foreground;
pub mod sampler;
pub mod services;
pub mod shutdown;

use foreground::CommandDetector;
use sampler::ActivitySampler;
use services::Services;

/// Daemon entry point: opens the store (running migrations), loads settings,
/// binds the socket and drives the accept loop and the sampler until a
/// shutdown signal cancels both.
pub async fn start_daemon(paths: AppPaths) -> Result<()> {
    std::env::set_current_dir("/")?;

    let settings = SettingsFile::load_or_init(paths.settings())?;
    info!("settings loaded from {:?}", settings.path);
    let db = Arc::new(
        Database::open(&paths.database())
            .with_context(|| format!("failed to open database at {:?}", paths.database()))?,
    );
    let services = Arc::new(Services::new(db, settings.settings));

    info!("daemon starting, data dir {:?}", paths.data_dir());

    // Presence is known at startup even before the first timer fire.
    if let Err(e) = services.activity.record(Utc::now(), None).await {
        warn!("failed to record startup activity {e:?}");
    }

    let shutdown_token = CancellationToken::new();

    let server = RpcServer::bind(paths.socket(), services.clone(), shutdown_token.clone())?;

    let sampler = ActivitySampler::new(
        services,
        Box::new(CommandDetector),
        Notifier::with_platform_backends(),
        shutdown_token.clone(),
        Box::new(DefaultClock),
    );

    let (_, server_result, sampler_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        server.run(),
        sampler.run(),
    );

    if let Err(server_result) = server_result {
        error!("Rpc server got an error {:?}", server_result);
    }

    if let Err(sampler_result) = sampler_result {
        error!("Sampler got an error {:?}", sampler_result);
    }

    Ok(())
}
