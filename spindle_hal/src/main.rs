//! # Spindle HAL Binary
//!
//! Runs the spindle core against a simulated Modbus bus: registers the
//! configured drives, loads the binding table, then replays tool changes,
//! an M104 command and a speed request.
//!
//! # Usage
//!
//! ```bash
//! # Start up and report
//! spindle_hal --config config/spindle.toml
//!
//! # Tool change to T12, then M104 P1 and 12000 rpm, 20 service cycles
//! spindle_hal --config config/spindle.toml --tool 12 --select-p 1 --rpm 12000 --cycles 20
//!
//! # Verbose logging
//! spindle_hal --config config/spindle.toml -v
//! ```

#![deny(warnings)]

use clap::Parser;
use spindle_common::config::LogLevel;
use spindle_common::consts::{DEFAULT_CONFIG_PATH, SPINDLE_SELECT_MCODE};
use spindle_common::spindle::types::{SpindleKind, ToolId};
use spindle_hal::config::SpindleHalConfig;
use spindle_hal::core::SpindleCore;
use spindle_hal::drivers::simulation::{SimulatedBus, SimulatedDrive};
use spindle_select::{FileStore, ParserBlock};
use spindle_vfd::profile::DriveProfile;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Maximum output frequency reported by simulated drives.
const SIM_MAX_FREQUENCY_HZ: u32 = 400;

/// Spindle HAL - spindle selection and VFD control over a simulated bus
#[derive(Parser, Debug)]
#[command(name = "spindle_hal")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Spindle selection and VFD control over a simulated Modbus bus")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Tool change to replay (can be specified multiple times)
    #[arg(short, long = "tool", action = clap::ArgAction::Append)]
    tools: Vec<ToolId>,

    /// M104 P word (0 = default spindle)
    #[arg(long, value_name = "P")]
    select_p: Option<f32>,

    /// M104 Q word (binding slot)
    #[arg(long, value_name = "Q")]
    select_q: Option<f32>,

    /// Start the active spindle clockwise at this speed
    #[arg(long)]
    rpm: Option<f32>,

    /// Service cycles to run after the commands
    #[arg(long, default_value_t = 10)]
    cycles: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match SpindleHalConfig::load_validated(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("Failed to load {:?}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    if let Err(e) = run(&args, &config) {
        error!("Spindle HAL failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Args, config: &SpindleHalConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Spindle HAL v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let store = FileStore::new(&config.select.store_path);
    let mut core = SpindleCore::new(config, Box::new(store), simulated_bus(config))?;
    core.register_all(&config.drives)?;

    let source = core.start()?;
    info!("Binding table from {:?}", source);

    // Simulated time: every cycle is one poll interval apart.
    let step = Duration::from_millis(config.vfd.poll_interval_ms + 1);
    let mut now = Instant::now();
    core.cycle(now);
    now += step;

    for &tool in &args.tools {
        match core.tool_changed(tool)? {
            Some(slot) => info!("T{} selected slot {}", tool, slot),
            None => info!("T{} kept spindle {:?}", tool, core.active()),
        }
    }

    if args.select_p.is_some() || args.select_q.is_some() {
        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE);
        if let Some(p) = args.select_p {
            block = block.with_p(p);
        }
        if let Some(q) = args.select_q {
            block = block.with_q(q);
        }
        core.validate_command(&mut block)?;
        core.execute_command(&block)?;
    }

    if let Some(rpm) = args.rpm {
        if !core.set_spindle(true, false, rpm)? {
            warn!("Spindle {:?} did not take the speed request", core.active());
        }
    }

    for _ in 0..args.cycles {
        if let Some(state) = core.cycle(now) {
            info!(
                "on={} ccw={} at_speed={}",
                state.on, state.ccw, state.at_speed
            );
        }
        now += step;
    }

    println!("Active spindle: {:?}", core.active());
    for slot in 0..core.table().selectable() {
        if let Some(entry) = core.table().get(slot) {
            println!(
                "  slot {}: {:?} from T{}",
                slot, entry.spindle_id, entry.min_tool_id
            );
        }
    }
    for line in core.report_options() {
        println!("{line}");
    }
    for alarm in core.take_alarms() {
        println!("ALARM: {alarm}");
    }

    core.shutdown()?;
    info!("Spindle HAL shutdown complete");
    Ok(())
}

/// Bus with one simulated drive per configured VFD.
fn simulated_bus(config: &SpindleHalConfig) -> SimulatedBus {
    let mut bus = SimulatedBus::new();
    for drive in &config.drives {
        if drive.kind != SpindleKind::Vfd {
            continue;
        }
        if let (Some(model), Some(unit)) = (drive.profile, drive.modbus_address) {
            let profile = DriveProfile::for_model(model);
            let max = SIM_MAX_FREQUENCY_HZ * profile.max_frequency_units_per_hz;
            bus.attach(unit, SimulatedDrive::new(profile, u16::try_from(max).unwrap_or(u16::MAX)));
        }
    }
    bus
}

/// Setup tracing subscriber. `-v` overrides the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.into()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
