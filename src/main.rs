//! Camera Session CLI
//!
//! Command-line interface for exercising the persistent capture session
//! against the mock camera backend.

use camera_session::{
    capture::{FileConfig, MockBackend},
    CameraError, PersistentCaptureSession,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-session", version, about = "Drive a persistent camera capture session")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera id override.
    #[arg(long)]
    camera: Option<String>,

    /// Number of photos to take.
    #[arg(long)]
    photos: Option<u32>,

    /// Simulate the platform taking the camera away, then recover.
    #[arg(long)]
    simulate_disconnect: bool,
}

async fn configure(
    session: &PersistentCaptureSession,
    config: &FileConfig,
) -> Result<(), CameraError> {
    session
        .with_configuration(|s| {
            s.set_input(&config.input.camera_id)?;
            s.set_outputs(config.outputs.clone())?;
            s.set_repeating_request(config.repeating.clone())?;
            s.set_is_active(true)
        })
        .await
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Camera Session v{}", camera_session::VERSION);
    info!("This is a demonstration using the mock camera backend");

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(camera) = args.camera {
        config.input.camera_id = camera;
    }
    if let Some(photos) = args.photos {
        config.demo.photo_count = photos;
    }

    let backend = MockBackend::new();
    let session = Arc::new(PersistentCaptureSession::new(
        Arc::new(backend.clone()),
        Arc::new(|error: CameraError| warn!("Camera error: {}", error)),
    ));

    #[cfg(feature = "metrics")]
    if config.metrics.port != 0 {
        use camera_session::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

        match MetricsRegistry::new() {
            Ok(registry) => {
                let server = MetricsServer::new(
                    MetricsServerConfig::with_port(config.metrics.port),
                    registry,
                    Arc::clone(&session),
                );
                tokio::spawn(async move {
                    if let Err(e) = server.run().await {
                        warn!("Metrics server stopped: {}", e);
                    }
                });
            }
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    if let Err(e) = configure(&session, &config).await {
        eprintln!("Failed to configure camera session: {}", e);
        std::process::exit(1);
    }
    info!(
        camera_id = %config.input.camera_id,
        running = session.is_running(),
        "Preview started"
    );

    if args.simulate_disconnect {
        backend.disconnect(&config.input.camera_id, None);
        info!(destroyed = session.is_destroyed(), "Platform closed the camera");

        if let Err(e) = session.with_configuration(|s| s.set_is_active(true)).await {
            eprintln!("Failed to recover camera session: {}", e);
            std::process::exit(1);
        }
        info!(running = session.is_running(), "Recovered after disconnect");
    }

    let mut captured = 0;
    for i in 0..config.demo.photo_count {
        match session.capture(&config.photo).await {
            Ok(result) => {
                captured += 1;
                info!(
                    "Photo {}: frame {} at {}",
                    i,
                    result.frame_number(),
                    result.timestamp().to_rfc3339()
                );
            }
            Err(e) => warn!("Photo {} failed: {}", i, e),
        }
    }
    info!("Captured {} of {} photos", captured, config.demo.photo_count);

    if config.demo.continuous {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        } else {
            info!("Preview running, press Ctrl-C to stop");
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    }

    if let Err(e) = session.with_configuration(|s| s.set_is_active(false)).await {
        warn!("Failed to stop preview: {}", e);
    }
    session.close();

    let stats = session.stats();
    println!(
        "Session stats: {} passes, {} devices opened, {} sessions created, {} external destructions, {} photos",
        stats.reconcile_passes,
        stats.devices_opened,
        stats.sessions_created,
        stats.external_destructions,
        stats.photos_captured
    );
}
