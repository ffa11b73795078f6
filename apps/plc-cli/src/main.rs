use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use plc_project::PlcConfig;
use plc_runtime::{
    ChannelSource, Runner, RuntimeError, RuntimeResult, RuntimeSettings, StopHandle, bootstrap,
    startup_config,
};
use plc_store::HistoryQuery;
use plc_units::UnitRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plc-cli")]
#[command(about = "Soft PLC - cyclic execution of models and control algorithms", long_about = None)]
struct Cli {
    /// Log filter (e.g. info, debug, plc_runtime=trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and its execution order
    Validate {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Print the execution order and circuits of a configuration
    Order {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Run the PLC
    Run {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Directory for config.yaml and snapshot.json
        #[arg(long)]
        local_dir: Option<PathBuf>,
        /// JSON-lines file receiving every cycle's storable parameters
        #[arg(long)]
        store: Option<PathBuf>,
        /// Run cycles back to back instead of pacing to the cycle period
        #[arg(long)]
        no_realtime: bool,
        /// Read JSON command messages from stdin, one per line
        #[arg(long)]
        commands_stdin: bool,
        /// Runtime settings file (YAML)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Query a JSON-lines cycle history
    History {
        /// Path to the history file
        store_path: PathBuf,
        /// Exact parameter address (instance.param)
        #[arg(long)]
        param: Option<String>,
        /// Restrict to one instance
        #[arg(long)]
        instance: Option<String>,
        /// Earliest timestamp (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Latest timestamp (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Keep only the newest N points
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> RuntimeResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Order { config_path } => cmd_order(&config_path),
        Commands::Run {
            config_path,
            cycles,
            local_dir,
            store,
            no_realtime,
            commands_stdin,
            settings,
        } => {
            let mut settings = match settings {
                Some(path) => RuntimeSettings::load(&path)?,
                None => RuntimeSettings::default(),
            };
            if cycles.is_some() {
                settings.max_cycles = cycles;
            }
            if local_dir.is_some() {
                settings.local_dir = local_dir;
            }
            if store.is_some() {
                settings.store_path = store;
            }
            if no_realtime {
                settings.realtime = false;
            }
            cmd_run(&config_path, settings, commands_stdin)
        }
        Commands::History {
            store_path,
            param,
            instance,
            start,
            end,
            limit,
        } => cmd_history(
            &store_path,
            &HistoryQuery {
                param,
                instance,
                start,
                end,
                limit,
            },
        ),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path) -> RuntimeResult<PlcConfig> {
    Ok(plc_project::load(path)?)
}

fn cmd_validate(config_path: &Path) -> RuntimeResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = load_config(config_path)?;
    let order = config.execution_order()?;

    let registry = UnitRegistry::default();
    let unknown: Vec<String> = config
        .instances
        .iter()
        .filter(|(_, def)| !registry.contains(&def.type_tag))
        .map(|(name, def)| format!("{name} ({})", def.type_tag))
        .collect();

    println!(
        "✓ Configuration is valid: {} instances, {} connections",
        config.instances.len(),
        config.connections.len()
    );
    println!("  Execution order: {}", order.join(" -> "));
    if !unknown.is_empty() {
        println!("  Unknown types (will be skipped): {}", unknown.join(", "));
    }
    Ok(())
}

fn cmd_order(config_path: &Path) -> RuntimeResult<()> {
    let config = load_config(config_path)?;
    let order = config.execution_order()?;
    let source = if config.execution_order.is_some() {
        "explicit"
    } else {
        "topological"
    };

    println!("Execution order ({source}):");
    for (i, name) in order.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, name);
    }

    let circuits = config.circuits();
    println!("Circuits:");
    for circuit in circuits {
        println!("  {}: {}", circuit.name, circuit.members.join(", "));
    }
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    settings: RuntimeSettings,
    commands_stdin: bool,
) -> RuntimeResult<()> {
    let file_config = load_config(config_path)?;
    let config = startup_config(settings.local_dir.as_deref(), file_config)?;
    let (engine, publisher) = bootstrap(config, UnitRegistry::default(), &settings)?;
    println!(
        "Running {} instances every {}s",
        engine.instance_names().count(),
        engine.cycle_period()
    );

    let runner = if commands_stdin {
        let (tx, source) = ChannelSource::channel();
        let runner = Runner::start(engine, &settings, Some(Box::new(source)))?;
        // Without a cycle limit, end of input ends the run.
        let on_eof = settings.max_cycles.is_none().then(|| runner.stop_handle());
        thread::Builder::new()
            .name("plc-stdin".to_string())
            .spawn(move || forward_stdin(&tx, on_eof.as_ref()))?;
        runner
    } else {
        Runner::start(engine, &settings, None)?
    };

    let stop = runner.stop_handle();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, stopping");
        stop.request_stop();
    })
    .map_err(|e| RuntimeError::Interrupt {
        message: e.to_string(),
    })?;

    runner.wait()?;
    if let Some(frame) = publisher.current() {
        println!("✓ Completed {} cycles ({:.3}s simulated)", frame.cycle, frame.sim_time);
        print_final_state(&frame.params);
    }
    Ok(())
}

/// Feed stdin lines to the command thread until EOF or until the runner
/// hangs up.
fn forward_stdin(tx: &Sender<String>, on_eof: Option<&StopHandle>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(line).is_err() {
            return;
        }
    }
    tracing::info!("stdin closed");
    if let Some(stop) = on_eof {
        stop.request_stop();
    }
}

fn print_final_state(params: &plc_core::ParamMap) {
    println!("Final state:");
    for (key, value) in params {
        println!("  {key} = {value:.6}");
    }
}

fn cmd_history(store_path: &Path, query: &HistoryQuery) -> RuntimeResult<()> {
    let points = plc_store::history::query_history(store_path, query)?;
    if points.is_empty() {
        println!("No matching history");
        return Ok(());
    }
    for point in points {
        println!(
            "{}  {:<32} {:.6}",
            point.timestamp.to_rfc3339(),
            point.param,
            point.value
        );
    }
    Ok(())
}
