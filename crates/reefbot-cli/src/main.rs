//! `reefbot` – robot program runner.
//!
//! Runs the full robot program against simulated motors:
//!
//! 1. Loads `~/.reefbot/config.toml` (or `--config`), applying `REEFBOT_*`
//!    environment overrides and validating the result.
//! 2. Plays a simulated match: an autonomous period followed by a teleop
//!    period whose controller input comes from a TOML script.
//! 3. Prints mode changes and command faults as they happen and a summary at
//!    the end.  **Ctrl-C** disables the robot and ends the match early.

mod config;
mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use reefbot_hal::SimBank;
use reefbot_middleware::{EventBus, Topic, TopicReceiver};
use reefbot_runtime::{Robot, RobotConfig, RobotMode, telemetry};
use reefbot_types::{Channel, ControllerState, EventPayload};
use tracing::warn;

use crate::script::InputScript;

#[derive(Parser)]
#[command(name = "reefbot", about = "Command-based robot program on simulated hardware", version)]
struct Cli {
    /// Config file (default: ~/.reefbot/config.toml)
    #[arg(long, global = true, env = "REEFBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a simulated match
    Run(RunArgs),

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// TOML input script driving the teleop period
    #[arg(long)]
    script: Option<PathBuf>,

    /// Autonomous routine to run (overrides the configured default)
    #[arg(long)]
    auto: Option<String>,

    /// Length of the autonomous period in ticks
    #[arg(long, default_value_t = 750)]
    auto_ticks: u64,

    /// Length of the teleop period in ticks (default: the script's length)
    #[arg(long)]
    teleop_ticks: Option<u64>,

    /// Pace ticks at the control period instead of running flat out
    #[arg(long)]
    realtime: bool,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing("reefbot");
    let config_path = cli.config.unwrap_or_else(config::config_path);

    match cli.command {
        Commands::Run(args) => run_match(&config_path, args),
        Commands::Config { subcommand } => match subcommand {
            ConfigSubcommand::Show => {
                let cfg = load_config(&config_path)?;
                println!("{}", toml::to_string_pretty(&cfg)?);
                Ok(())
            }
            ConfigSubcommand::Init { force } => {
                if config_path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", config_path.display());
                }
                config::save_to(&RobotConfig::default(), &config_path)?;
                println!("  {} {}", "Wrote".green(), config_path.display().to_string().bold());
                Ok(())
            }
        },
    }
}

fn load_config(path: &Path) -> anyhow::Result<RobotConfig> {
    config::load(path).with_context(|| format!("loading config from {}", path.display()))
}

#[derive(Default)]
struct Report {
    auto_ticks: u64,
    teleop_ticks: u64,
    faults: u64,
}

fn run_match(config_path: &Path, args: RunArgs) -> anyhow::Result<()> {
    let cfg = load_config(config_path)?;
    let script = match &args.script {
        Some(path) => InputScript::load(path)
            .with_context(|| format!("loading input script {}", path.display()))?,
        None => InputScript::default(),
    };

    print_banner();
    if let Some(path) = &args.script {
        println!(
            "  script: {} ({} frames, {} ticks)",
            path.display().to_string().bold(),
            script.frames().len(),
            script.total_ticks()
        );
    }

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disabling robot …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; Ctrl-C will not disable the robot");
    }

    // ── Robot ─────────────────────────────────────────────────────────────
    let bus = EventBus::default();
    let mut faults = bus.subscribe_to(Topic::Faults);
    let mut modes = bus.subscribe_to(Topic::Modes);

    let mut robot = Robot::new(&cfg, SimBank::full(), Box::new(bus.clone()))?;
    if let Some(name) = &args.auto {
        robot.select_auto(name)?;
    }

    let period = cfg.control.period();
    let teleop_ticks = args.teleop_ticks.unwrap_or_else(|| script.total_ticks());
    let mut report = Report::default();

    for (mode, ticks) in [
        (RobotMode::Autonomous, args.auto_ticks),
        (RobotMode::Teleop, teleop_ticks),
    ] {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        robot.set_mode(mode)?;
        print_modes(&mut modes);

        let mut ran = 0;
        for tick in 0..ticks {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let started = Instant::now();
            let input = match mode {
                RobotMode::Teleop => script.state_at(tick),
                _ => ControllerState::default(),
            };
            robot.periodic(input);
            report.faults += print_faults(&mut faults, tick);
            ran += 1;

            if args.realtime {
                std::thread::sleep(period.saturating_sub(started.elapsed()));
            }
        }
        match mode {
            RobotMode::Autonomous => report.auto_ticks = ran,
            _ => report.teleop_ticks = ran,
        }
    }

    robot.set_mode(RobotMode::Disabled)?;
    print_modes(&mut modes);
    print_summary(&robot, &report);
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════╗".cyan());
    println!("{}", "  ║   reefbot · simulated match  ║".cyan().bold());
    println!("{}", "  ╚══════════════════════════════╝".cyan());
    println!();
}

fn print_modes(modes: &mut TopicReceiver) {
    while let Ok(event) = modes.try_recv() {
        match event.payload {
            EventPayload::RobotModeChanged { mode } => {
                println!("  {} {}", "▶".cyan(), mode.bold());
            }
            EventPayload::ModeSelected { mode } => {
                println!("    routine: {}", mode.green());
            }
            _ => {}
        }
    }
}

/// Print every pending fault and return how many there were.
fn print_faults(faults: &mut TopicReceiver, tick: u64) -> u64 {
    let mut count = 0;
    while let Ok(event) = faults.try_recv() {
        if let EventPayload::CommandFault { command, details } = event.payload {
            println!(
                "  {} tick {tick}: {} – {}",
                "✗".red().bold(),
                command.red(),
                details.dimmed()
            );
            count += 1;
        }
    }
    count
}

fn print_summary(robot: &Robot, report: &Report) {
    let scheduler = robot.scheduler();
    println!();
    println!("{}", "  Match summary".bold());
    println!("    autonomous ticks : {}", report.auto_ticks);
    println!("    teleop ticks     : {}", report.teleop_ticks);
    let faults = if report.faults == 0 {
        "0".green()
    } else {
        report.faults.to_string().red()
    };
    println!("    command faults   : {faults}");
    let overruns = scheduler.overruns();
    let overruns = if overruns == 0 {
        "0".green()
    } else {
        overruns.to_string().yellow()
    };
    println!("    loop overruns    : {overruns}");
    println!("    final efforts    :");
    for channel in Channel::ALL {
        let effort = scheduler.bank().effort(channel).unwrap_or_default();
        println!("      {:<12} {effort:+.2}", channel.to_string());
    }
    println!();
}
