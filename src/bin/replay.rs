//! poi-telemetry-replay binary
//!
//! Plays a recorded observer path against a scene description and writes the
//! resulting telemetry rows (header first) to stdout or a file.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                      | Default | Description                         |
//! |--------------------------|---------|-------------------------------------|
//! | `POI_SCENE`              | –       | Scene description JSON              |
//! | `POI_SCRIPT`             | –       | Replay script JSON                  |
//! | `POI_WORDS`              | –       | Optional CSV word list for labels   |
//! | `POI_OUTPUT`             | stdout  | Row output file                     |
//! | `POI_CONFIG`             | –       | Optional TOML telemetry config      |
//! | `POI_TICK_RATE_HZ`       | `0`     | Frame pacing (0 = as fast as possible) |
//! | `POI_MAX_VISIBLE_POIS`   | `4`     | POI slots per row                   |
//! | `POI_BUCKET_SIZE`        | `10.0`  | Identity bucket width along z       |
//! | `POI_OCCLUSION_EPSILON`  | `0.05`  | Self-hit ray slack                  |
//! | `POI_BOX_FACE_INSET`     | `0.01`  | Box sample inset from the face      |
//!
//! Explicit CLI flags override the TOML file and environment.

use anyhow::{Context, Result};
use clap::Parser;
use poi_telemetry::{
    flatten,
    geometry::MonospaceLayout,
    identity::parse_word_list,
    protocol::{ReplayEvent, ReplayFrame, ReplayScript, SceneDescription},
    sink::RowSink,
    transport, TelemetryConfig, TelemetrySession,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Instrument;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "poi-telemetry-replay",
    about = "Replay an observer path and emit POI telemetry rows",
    version
)]
struct Args {
    /// Scene description (JSON)
    #[arg(long, env = "POI_SCENE")]
    scene: PathBuf,

    /// Replay script (JSON)
    #[arg(long, env = "POI_SCRIPT")]
    script: PathBuf,

    /// Word list for TEXT labels (CSV)
    #[arg(long, env = "POI_WORDS")]
    words: Option<PathBuf>,

    /// Output file; rows go to stdout when omitted
    #[arg(long, short, env = "POI_OUTPUT")]
    output: Option<PathBuf>,

    /// TOML file with telemetry settings
    #[arg(long, env = "POI_CONFIG")]
    config: Option<PathBuf>,

    /// Frames per second (0 = as fast as possible)
    #[arg(long, env = "POI_TICK_RATE_HZ", default_value_t = 0.0)]
    tick_rate_hz: f32,

    /// POI slots per row
    #[arg(long)]
    max_visible_pois: Option<usize>,

    /// Identity bucket width along z
    #[arg(long)]
    bucket_size: Option<f32>,

    /// Self-hit ray slack
    #[arg(long)]
    occlusion_epsilon: Option<f32>,

    /// Box sample inset from the forward face
    #[arg(long)]
    box_face_inset: Option<f32>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Rows may go to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("poi_telemetry=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let period = frame_period(args.tick_rate_hz)?;

    log::info!(
        "Starting poi-telemetry-replay (scene='{}', script='{}', slots={}, tick_rate={}Hz)",
        args.scene.display(),
        args.script.display(),
        config.max_visible_pois,
        args.tick_rate_hz,
    );

    let scene_json = tokio::fs::read_to_string(&args.scene)
        .await
        .with_context(|| format!("Failed to read scene {}", args.scene.display()))?;
    let built = SceneDescription::from_json(&scene_json)
        .and_then(|desc| desc.build())
        .with_context(|| format!("Failed to build scene {}", args.scene.display()))?;

    let script_json = tokio::fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script = ReplayScript::from_json(&script_json)
        .with_context(|| format!("Failed to parse script {}", args.script.display()))?;

    // Row transport: header first, then one row per event.
    let (sink, receiver) = transport::channel();
    sink.post_row(flatten::header(config.max_visible_pois));
    let writer = match &args.output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            tokio::spawn(receiver.drain_into(tokio::io::BufWriter::new(file)))
        }
        None => tokio::spawn(receiver.drain_into(tokio::io::stdout())),
    };

    let mut session = TelemetrySession::new(
        config,
        built.scene,
        built.world,
        built.checkpoints,
        Box::new(MonospaceLayout::default()),
        Some(Box::new(sink)),
    )
    .context("Failed to start telemetry session")?;

    if let Some(path) = &args.words {
        let csv = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read word list {}", path.display()))?;
        let assigned = session.assign_labels(&parse_word_list(&csv));
        log::info!("Assigned {} label words from {}", assigned, path.display());
    }

    let span = tracing::info_span!("replay", frames = script.frames.len());
    tokio::select! {
        played = replay(&mut session, &script.frames, period).instrument(span) => {
            log::info!("Replay finished after {} frames", played);
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Replay interrupted (SIGINT)");
        }
    }

    let stats = session.stats();
    log::info!(
        "Session stats: {}",
        serde_json::to_string(&stats).context("Failed to serialise stats")?
    );

    // Dropping the session drops the last sender and lets the writer finish.
    drop(session);
    let rows = writer.await.context("Row writer task panicked")??;
    log::info!("Wrote {} rows", rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Defaults ← TOML file ← `POI_*` environment ← CLI flags.
fn load_config(args: &Args) -> Result<TelemetryConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    let mut cfg: TelemetryConfig = builder
        .add_source(config::Environment::with_prefix("POI").try_parsing(true))
        .build()
        .context("Failed to load telemetry config")?
        .try_deserialize()
        .context("Invalid telemetry config")?;

    if let Some(v) = args.max_visible_pois {
        cfg.max_visible_pois = v;
    }
    if let Some(v) = args.bucket_size {
        cfg.bucket_size = v;
    }
    if let Some(v) = args.occlusion_epsilon {
        cfg.occlusion_epsilon = v;
    }
    if let Some(v) = args.box_face_inset {
        cfg.box_face_inset = v;
    }
    Ok(cfg)
}

/// Time between frames for `tick_rate_hz`, `None` when unpaced (0 Hz).
fn frame_period(tick_rate_hz: f32) -> Result<Option<Duration>> {
    anyhow::ensure!(
        tick_rate_hz.is_finite() && tick_rate_hz >= 0.0,
        "tick rate must be finite and non-negative, got {}",
        tick_rate_hz
    );
    if tick_rate_hz == 0.0 {
        return Ok(None);
    }
    let period = Duration::try_from_secs_f32(1.0 / tick_rate_hz)
        .with_context(|| format!("tick rate {}Hz is too low", tick_rate_hz))?;
    Ok(Some(period.max(Duration::from_nanos(1))))
}

/// Feed every frame through the session. Returns the number of frames played.
async fn replay(
    session: &mut TelemetrySession,
    frames: &[ReplayFrame],
    period: Option<Duration>,
) -> usize {
    let mut timer = period.map(tokio::time::interval);

    for (i, frame) in frames.iter().enumerate() {
        if let Some(timer) = &mut timer {
            timer.tick().await;
        } else {
            tokio::task::yield_now().await;
        }

        session.tick(frame.observer, frame.time);
        match frame.event {
            Some(ReplayEvent::Checkpoint { index }) => {
                if let Err(e) = session.reach_checkpoint(index) {
                    log::warn!("Frame {}: {}", i, e);
                }
            }
            Some(ReplayEvent::Attention) => {
                session.attention();
            }
            Some(ReplayEvent::ResetClock) => session.reset_session_time(),
            None => {}
        }
    }
    frames.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_unpaced() {
        assert_eq!(frame_period(0.0).unwrap(), None);
    }

    #[test]
    fn rate_sets_period() {
        let period = frame_period(30.0).unwrap().unwrap();
        assert!((period.as_secs_f64() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn huge_rate_never_yields_zero_period() {
        assert_eq!(frame_period(1e30).unwrap(), Some(Duration::from_nanos(1)));
    }

    #[test]
    fn non_finite_or_negative_rate_is_rejected() {
        for hz in [f32::INFINITY, f32::NAN, -1.0] {
            assert!(frame_period(hz).is_err(), "{hz}");
        }
        assert!(frame_period(f32::MIN_POSITIVE / 4.0).is_err());
    }
}
