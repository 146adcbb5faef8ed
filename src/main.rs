//! Command-line heart rate estimation from recorded or synthetic fingertip traces.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::select;
use heart_rate_monitor::config::Config;
use heart_rate_monitor::monitor::HeartRateMonitor;
use heart_rate_monitor::scheduler::{ManualScheduler, Scheduler, ThreadScheduler};
use heart_rate_monitor::source::{Pacing, ReplaySource, SyntheticSignal};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file with one `timestamp_ms red green blue` line per frame
    #[arg(short, long, conflicts_with = "synthetic")]
    trace: Option<String>,

    /// Generate a synthetic fingertip signal at this pulse rate
    #[arg(short, long)]
    synthetic: Option<f64>,

    /// Length of the synthetic signal in seconds
    #[arg(long, default_value = "30")]
    duration: u64,

    /// Frame rate of the synthetic signal
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Use the time-domain estimator, averaging every N seconds
    #[arg(short, long)]
    average_after: Option<u32>,

    /// Sample window size of the frequency-domain estimator
    #[arg(short, long)]
    window: Option<usize>,

    /// Finger debounce in milliseconds
    #[arg(long)]
    debounce: Option<u64>,

    /// Play frames at their recorded pace instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Log every frame
    #[arg(long)]
    verbose_frames: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,
}

fn load_config(args: &Args) -> Config {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            Config::from_file(path).unwrap_or_else(|e| {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            })
        }
        None => Config::default(),
    };

    if let Some(seconds) = args.average_after {
        config.averaging_period_seconds = Some(seconds);
    }
    if let Some(window) = args.window {
        config.sample_window_size = window;
    }
    if let Some(debounce) = args.debounce {
        config.debounce_ms = debounce;
    }
    if args.verbose_frames {
        config.logging_enabled = true;
    }
    config
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Heart Rate Monitor");

    let config = load_config(&args);

    // Replays drive the debounce timer from frame timestamps unless played in real time
    let (pacing, scheduler): (Pacing, Arc<dyn Scheduler>) = if args.realtime {
        (Pacing::RealTime, Arc::new(ThreadScheduler))
    } else {
        let clock = Arc::new(ManualScheduler::new());
        (Pacing::Clock(Arc::clone(&clock)), clock)
    };

    let source = if let Some(path) = &args.trace {
        ReplaySource::from_file(path, pacing).with_context(|| format!("Failed to load trace {path}"))?
    } else {
        let signal = SyntheticSignal {
            bpm: args.synthetic.unwrap_or(SyntheticSignal::default().bpm),
            fps: args.fps,
            duration: Duration::from_secs(args.duration),
            ..SyntheticSignal::default()
        };
        info!("Generating {:.0} bpm signal for {} s", signal.bpm, args.duration);
        ReplaySource::new(signal.frames(), pacing)
    };
    let finished = source.completion();

    let stream = HeartRateMonitor::from_config(config)
        .with_scheduler(scheduler)
        .on_finger_presence_changed(|present| {
            info!("Finger {}", if present { "detected" } else { "removed" });
        })
        .bpm_updates(Box::new(source))?;
    let updates = stream.subscribe()?;

    let mut last = None;
    loop {
        select! {
            recv(updates.receiver()) -> bpm => match bpm {
                Ok(bpm) if bpm.is_ready() => {
                    println!("{} bpm ({:?})", bpm.value, bpm.pulse);
                    last = Some(bpm.value);
                }
                Ok(_) => println!("not ready"),
                Err(_) => break,
            },
            recv(finished) -> _ => {
                for bpm in updates.drain().into_iter().filter(|b| b.is_ready()) {
                    println!("{} bpm ({:?})", bpm.value, bpm.pulse);
                    last = Some(bpm.value);
                }
                break;
            },
        }
    }

    let stats = stream.stats();
    info!(
        "Frames: {} processed, {} gated, {} dropped, {} rejected",
        stats.processed, stats.gated, stats.dropped, stats.rejected
    );
    match last {
        Some(bpm) => info!("Final estimate: {} bpm", bpm),
        None => warn!("No heart rate estimate was produced"),
    }

    updates.unsubscribe();
    Ok(())
}
