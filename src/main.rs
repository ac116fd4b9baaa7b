use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use stride_tracker::{
    DirectorySink, LogListener, RecordedSession, SampleQueue, TrackerConfig, TrackerSession,
};
use tokio::runtime::Handle;
use tokio::time::{sleep, Duration};

#[derive(Parser, Debug)]
#[command(name = "stride_tracker")]
#[command(about = "Replay a recorded walk through step detection and dead reckoning", long_about = None)]
struct Args {
    /// Directory holding <stamp>_acce.txt, _gyro.txt and _magn.txt (optionally .gz)
    #[arg(value_name = "SESSION_DIR")]
    input: PathBuf,

    /// JSON tracker config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Step length in meters
    #[arg(long)]
    step_length: Option<f64>,

    /// Foot marker interval in milliseconds
    #[arg(long)]
    foot_tick_ms: Option<u64>,

    /// Save artifacts, summary.json and live_status.json here
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Wifi scan results to save with the sensor records
    #[arg(long)]
    wifi: Option<PathBuf>,

    /// Pace samples by their recorded timestamps
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Print the session summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(step_length) = args.step_length {
        config.step_length_m = step_length;
    }
    if let Some(tick) = args.foot_tick_ms {
        config.foot_tick_ms = tick;
    }
    if args.wifi.is_some() {
        config.save.wifi = true;
    }
    config.validate()?;

    println!("[{}] Stride Tracker replay", ts_now());
    println!("  Input: {}", args.input.display());
    println!("  Step length: {:.2} m", config.step_length_m);
    println!("  Realtime: {}", args.realtime);

    let recorded = RecordedSession::load_dir(&args.input)?;
    if recorded.accelerometer.is_empty() {
        bail!("{} has no accelerometer samples", args.input.display());
    }
    println!(
        "  Samples: {} acce, {} gyro, {} magn",
        recorded.accelerometer.len(),
        recorded.gyroscope.len(),
        recorded.magnetometer.len()
    );

    let session = Arc::new(
        TrackerSession::new(config)?
            .with_listener(Arc::new(LogListener))
            .with_runtime(Handle::current()),
    );
    session.start()?;

    let queue = SampleQueue::spawn(session.clone());
    let mut previous_ts: Option<i64> = None;
    for sample in recorded.merged() {
        if args.realtime {
            if let Some(prev) = previous_ts {
                let gap = (sample.data.timestamp - prev).max(0) as u64;
                if gap > 0 {
                    sleep(Duration::from_millis(gap)).await;
                }
            }
            previous_ts = Some(sample.data.timestamp);
        }
        queue.send(sample)?;
    }
    let stats = tokio::task::spawn_blocking(move || queue.close()).await??;
    session.stop()?;

    let export = session.export()?;
    let summary = export.summary();
    println!("[{}] Replay complete", ts_now());
    println!("  Samples processed: {}", stats.processed);
    if stats.errors > 0 {
        println!("  Rejected samples: {}", stats.errors);
    }
    println!("  Steps: {}", summary.step_count);
    println!("  Distance: {:.2} m", summary.distance_meters);
    println!(
        "  Final position: ({:.2}, {:.2})",
        summary.final_position.x, summary.final_position.y
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if let Some(dir) = &args.output_dir {
        let wifi = match &args.wifi {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("reading wifi results {}", path.display()))?,
            ),
            None => None,
        };
        let mut sink = DirectorySink::new(dir)?;
        let written = session.save(&mut sink, wifi.as_deref())?;
        fs::write(dir.join("summary.json"), serde_json::to_string_pretty(&summary)?)?;
        session.status()?.save(dir.join("live_status.json"))?;
        println!("[{}] Saved {} artifacts to {}", ts_now(), written, dir.display());
    }

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
