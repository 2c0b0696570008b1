use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
};

use chrono::Utc;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use log::{error, info, warn};
use pacer::{
    PacerError, RestartPolicy, SessionState, TrackerConfig, TrackerSnapshot, WorkoutRecord,
    live::{SystemClock, spawn_ticker},
    replay::{load_replay_jsonl, replay},
    sensors::{MockSensorProducer, collect_sensors},
    spawn_tracker,
    writer::write_snapshots,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// What starting a workout does while one is already running
    #[arg(long, global = true)]
    restart_policy: Option<RestartPolicy>,

    /// Maximum number of workouts kept in the history
    #[arg(long, global = true)]
    history_capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recorded session offline, at its recorded times
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Feed recorded sensor data in real time and control workouts from stdin
    Live {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value_t = 1.0)]
        speedup: f64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(args: &Args) -> Result<TrackerConfig, PacerError> {
    let mut config = TrackerConfig::from_local_file()?.unwrap_or_default();
    if let Some(restart_policy) = args.restart_policy {
        config.restart_policy = restart_policy;
    }
    if let Some(history_capacity) = args.history_capacity {
        config.history_capacity = Some(history_capacity);
    }
    config.validate()?;
    Ok(config)
}

fn spawn_writer(
    output: Option<PathBuf>,
) -> (
    Option<mpsc::Sender<TrackerSnapshot>>,
    Option<JoinHandle<Result<usize, PacerError>>>,
) {
    match output {
        Some(output_file) => {
            let (tx, rx) = mpsc::channel();
            let writer = thread::spawn(move || write_snapshots(&output_file, rx));
            (Some(tx), Some(writer))
        }
        None => (None, None),
    }
}

fn join_writer(writer: Option<JoinHandle<Result<usize, PacerError>>>) -> Result<(), PacerError> {
    if let Some(writer) = writer {
        let written = writer
            .join()
            .map_err(|_| PacerError::WriterError {
                source: io::Error::other("writer thread panicked"),
            })??;
        info!("Wrote {} snapshot(s)", written);
    }
    Ok(())
}

fn print_history(history: &[WorkoutRecord]) {
    if history.is_empty() {
        println!("No workouts recorded");
        return;
    }
    let lines = history
        .iter()
        .map(|record| {
            let pace = record
                .pace_minutes_per_mile()
                .map(|pace| format!("{:.1} min/mi", pace))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}  {:>7.2} mi  {:>6.0} s  {:>5.2} mph  {}",
                record.date.format("%Y-%m-%d %H:%M:%S"),
                record.distance_miles,
                record.duration_seconds,
                record.average_speed_mph,
                pace
            )
        })
        .join("\n");
    println!("{}", lines);
}

fn print_snapshot(snapshot: &TrackerSnapshot) {
    let metrics = &snapshot.metrics;
    match (&snapshot.state, &snapshot.session) {
        (SessionState::Active, Some(session)) => println!(
            "[active {:>5.0} s] {:.2} mi, {:.2} mph | steps {} | lifetime {:.2} mi",
            session.elapsed_seconds,
            session.distance_miles,
            metrics.current_average_speed_mph,
            metrics.total_steps,
            metrics.total_distance_miles
        ),
        _ => println!(
            "[idle] steps {} | lifetime {:.2} mi | {} workout(s)",
            metrics.total_steps,
            metrics.total_distance_miles,
            snapshot.history.len()
        ),
    }
}

fn run_replay(
    config: &TrackerConfig,
    input: &PathBuf,
    output: Option<PathBuf>,
) -> Result<(), PacerError> {
    let entries = load_replay_jsonl(input)?;
    info!("Loaded {} replay entries from {:?}", entries.len(), input);

    let finished_at = entries.last().map(|entry| entry.at).unwrap_or_else(Utc::now);

    let (snapshot_tx, writer) = spawn_writer(output);
    let state = replay(entries, config, snapshot_tx);
    join_writer(writer)?;

    print_snapshot(&state.snapshot(finished_at));
    print_history(state.tracker().history().records());
    Ok(())
}

fn print_updates(updates: Receiver<TrackerSnapshot>) -> JoinHandle<()> {
    thread::spawn(move || {
        for snapshot in updates {
            print_snapshot(&snapshot);
        }
    })
}

fn run_live(
    config: &TrackerConfig,
    input: &PathBuf,
    speedup: f64,
    output: Option<PathBuf>,
) -> Result<(), PacerError> {
    let producer = MockSensorProducer::from_file(input)?.with_pacing(speedup)?;
    let tracker = spawn_tracker(config, SystemClock);

    let printer = print_updates(tracker.subscribe()?);
    let (snapshot_tx, writer) = spawn_writer(output);
    if let Some(snapshot_tx) = snapshot_tx {
        // forward a dedicated subscription into the writer channel
        let updates = tracker.subscribe()?;
        thread::spawn(move || {
            for snapshot in updates {
                if snapshot_tx.send(snapshot).is_err() {
                    break;
                }
            }
        });
    }

    spawn_ticker(config.tick_interval(), tracker.sender());
    let sensor_sender = tracker.sender();
    thread::spawn(move || {
        if let Err(e) = collect_sensors(producer, sensor_sender) {
            warn!("Sensor collection stopped: {}", e);
        }
    });

    println!("Commands: start, end, clear, status, quit");
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| PacerError::CommandInputError { source: e })?;
        match line.trim() {
            "start" => tracker.start_session()?,
            "end" => tracker.end_session()?,
            "clear" => tracker.clear_history()?,
            "status" => print_snapshot(&tracker.snapshot()?),
            "quit" | "exit" => break,
            "" => {}
            other => println!("Unknown command '{}'", other),
        }
    }

    let state = tracker.shutdown()?;
    let _ = printer.join();
    join_writer(writer)?;
    print_history(state.tracker().history().records());
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .unwrap_or_else(|e| warn!("Could not set Ctrl-C handler: {}", e));

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Commands::Replay { input, output } => run_replay(&config, input, output.clone()),
        Commands::Live {
            input,
            speedup,
            output,
        } => run_live(&config, input, *speedup, output.clone()),
    });

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
