// src/main.rs
//! Hike Tracker - record hikes from gpsd, a serial GPS or a recorded sample file

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use hike_tracker::{
    config::{SourceKind, TrackerConfig},
    display::{spawn_key_reader, ControlKey, TerminalDisplay},
    export::ExportFormat,
    gps::{nmea, replay::ReplaySource, ConfiguredSource},
    tracking::result::format_duration,
    FileSink, FinalizedHike, HikeTracker, MemorySink, PersistenceSink, SessionMeta, TimeBase,
};
use std::{
    io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "GPS hike tracker", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/hike-tracker/config.json)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Record a hike live from the configured location source
    Record(RecordArgs),
    /// Run a recorded sample file through the tracker and print the summary
    Replay(ReplayArgs),
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List available serial ports
    Ports,
}

#[derive(Args, Debug)]
struct MetaArgs {
    /// User the hike is recorded for
    #[arg(long)]
    user: String,

    /// Existing trail this hike belongs to
    #[arg(long)]
    trail_id: Option<String>,

    /// Free-text trail name
    #[arg(long)]
    trail_name: Option<String>,
}

impl MetaArgs {
    fn into_meta(self) -> SessionMeta {
        SessionMeta {
            user_id: self.user,
            trail_id: self.trail_id,
            trail_name: self.trail_name,
        }
    }
}

#[derive(Args, Debug)]
struct RecordArgs {
    #[command(flatten)]
    meta: MetaArgs,

    /// Location source, overriding the config file
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// gpsd host
    #[arg(long)]
    gpsd_host: Option<String>,

    /// gpsd port
    #[arg(long)]
    gpsd_port: Option<u16>,

    /// Serial port of an NMEA receiver
    #[arg(long)]
    serial_port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baudrate: Option<u32>,

    /// Sample file for the replay source
    #[arg(long, value_hint = ValueHint::FilePath)]
    replay_file: Option<PathBuf>,

    /// Directory finished hikes are written to
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// File format for finished hikes
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// JSON-lines sample file, one sample per line
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,

    #[command(flatten)]
    meta: MetaArgs,

    /// Also write the finished hike to the output directory
    #[arg(long, action = ArgAction::SetTrue)]
    save: bool,

    /// Directory the hike is written to with --save
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// File format used with --save
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "hike_tracker=info",
        1 => "hike_tracker=debug",
        _ => "hike_tracker=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => TrackerConfig::get_config_path()?,
    };

    match cli.command {
        CliCommand::Record(args) => {
            let config = TrackerConfig::load_from(&config_path)?;
            handle_record(config, args).await
        }
        CliCommand::Replay(args) => {
            let config = TrackerConfig::load_from(&config_path)?;
            handle_replay(config, args).await
        }
        CliCommand::Config { action } => handle_config(&config_path, action),
        CliCommand::Ports => handle_ports(),
    }
}

async fn handle_record(mut config: TrackerConfig, args: RecordArgs) -> Result<()> {
    if let Some(source) = args.source {
        config.source_type = source;
    }
    if let Some(host) = args.gpsd_host {
        config.gpsd_host = host;
    }
    if let Some(port) = args.gpsd_port {
        config.gpsd_port = port;
    }
    if let Some(port) = args.serial_port {
        config.serial_port = Some(port);
    }
    if let Some(baudrate) = args.baudrate {
        config.serial_baudrate = baudrate;
    }
    if let Some(file) = args.replay_file {
        config.replay_file = Some(file);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(format) = args.format {
        config.export_format = format;
    }
    config.validate()?;

    let source = ConfiguredSource::from_config(&config)?;
    let sink = FileSink::new(config.output_dir()?, config.export_format);
    info!("Using {} source, saving to {}", config.source_type, sink.dir().display());

    let (handle, task) = HikeTracker::new(source, sink, config.tracker_settings()).spawn();
    let meta = args.meta.into_meta();
    handle
        .start(meta.clone())
        .await
        .context("Could not start tracking")?;

    let running = Arc::new(AtomicBool::new(true));
    let (key_tx, mut keys) = mpsc::channel(8);
    let key_reader = spawn_key_reader(key_tx, Arc::clone(&running));

    let display = {
        let snapshot = handle.snapshot_handle();
        let running = Arc::clone(&running);
        tokio::spawn(async move { TerminalDisplay::new().run(snapshot, running).await })
    };

    let mut stop_result = None;
    while let Some(key) = keys.recv().await {
        let outcome = match key {
            // Only valid from Idle, i.e. after a reset
            ControlKey::Start => handle.start(meta.clone()).await.map(drop),
            ControlKey::Pause => handle.pause().await.map(drop),
            ControlKey::Resume => handle.resume().await.map(drop),
            ControlKey::Reset => handle.reset().await.map(drop),
            ControlKey::Stop => match handle.stop().await {
                Err(e) if e.is_invalid_transition() => Err(e),
                other => {
                    stop_result = Some(other);
                    break;
                }
            },
            ControlKey::Quit => break,
        };
        if let Err(e) = outcome {
            warn!("{}", e);
        }
    }

    running.store(false, Ordering::Relaxed);
    display.await??;
    let _ = key_reader.await;

    let finished = match stop_result {
        Some(result) => result?,
        // Quitting mid-hike still saves it
        None if handle.snapshot().state.is_active() => handle.stop().await?,
        None => None,
    };
    drop(handle);
    let _ = task.await;

    match finished {
        Some(hike) => print_summary(&hike),
        None => println!("No hike recorded."),
    }
    Ok(())
}

async fn handle_replay(config: TrackerConfig, args: ReplayArgs) -> Result<()> {
    let source = ReplaySource::load(&args.file)
        .with_context(|| format!("Failed to load samples from {}", args.file.display()))?;
    let meta = args.meta.into_meta();

    let hike = if args.save {
        let dir = match args.output_dir {
            Some(dir) => dir,
            None => config.output_dir()?,
        };
        let format = args.format.unwrap_or(config.export_format);
        replay_into(&config, source, FileSink::new(dir, format), meta).await?
    } else {
        replay_into(&config, source, MemorySink::new(), meta).await?
    };

    match hike {
        Some(hike) => print_summary(&hike),
        None => println!("Replay produced no movement; nothing recorded."),
    }
    Ok(())
}

async fn replay_into<P: PersistenceSink>(
    config: &TrackerConfig,
    source: ReplaySource,
    sink: P,
    meta: SessionMeta,
) -> Result<Option<FinalizedHike>> {
    let mut settings = config.tracker_settings();
    settings.time_base = TimeBase::SampleTimestamps;

    let mut tracker = HikeTracker::new(source, sink, settings);
    tracker.start(meta).await?;
    let processed = tracker.drain_feed().await;

    let snapshot = tracker.session().snapshot();
    info!(
        "Replayed {} samples: {} accepted, {} rejected",
        processed, snapshot.accepted_samples, snapshot.rejected_samples
    );

    Ok(tracker.stop().await?)
}

fn handle_config(path: &std::path::Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = TrackerConfig::load_from(path)?;
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            TrackerConfig::default().save_to(path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

fn handle_ports() -> Result<()> {
    let ports = nmea::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {}", port);
        }
    }
    Ok(())
}

fn print_summary(hike: &FinalizedHike) {
    println!("Hike for {}", hike.meta.user_id);
    if let Some(name) = &hike.meta.trail_name {
        println!("  Trail:     {}", name);
    }
    println!("  Started:   {}", hike.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Duration:  {}", format_duration(hike.result.elapsed_seconds));
    println!("  Distance:  {:.2} km", hike.result.distance_meters / 1000.0);
    println!("  Ascent:    {:.1} m", hike.result.elevation_gain_meters);
    if let Some(speed) = hike.average_speed_kmh() {
        println!("  Avg speed: {:.1} km/h", speed);
    }
    println!("  Points:    {}", hike.result.path.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "hike-tracker", "record", "--user", "alice", "--source", "serial",
            "--serial-port", "/dev/ttyUSB0", "--format", "geojson",
        ])
        .unwrap();
        match cli.command {
            CliCommand::Record(args) => {
                assert_eq!(args.meta.user, "alice");
                assert_eq!(args.source, Some(SourceKind::Serial));
                assert_eq!(args.format, Some(ExportFormat::GeoJson));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_replay_requires_user() {
        assert!(Cli::try_parse_from(["hike-tracker", "replay", "hike.jsonl"]).is_err());
    }
}
