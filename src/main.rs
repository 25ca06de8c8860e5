//! pv-charge-sim entry point — CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use pv_charge_sim::config::ScenarioConfig;
use pv_charge_sim::devices::{Battery, BatteryThermal, PvArray, ResistiveLoad};
use pv_charge_sim::io::export::export_csv;
use pv_charge_sim::sim::bms::Bms;
use pv_charge_sim::sim::converter::ModeArbiter;
use pv_charge_sim::sim::engine::{Engine, InitialConditions};
use pv_charge_sim::sim::kpi::RunSummary;
use pv_charge_sim::sim::mppt::MpptController;
use pv_charge_sim::sim::perturb::{NoPerturbation, Perturbation, SeededPerturbation};
use pv_charge_sim::sim::types::{IrradianceProfile, ProfilePoint, RunMode, SimConfig, StateSeries};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    csv_out: Option<String>,
    print_steps: bool,
}

fn print_help() {
    eprintln!("pv-charge-sim — PV/battery charge-controller simulator");
    eprintln!();
    eprintln!("Usage: pv-charge-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset (baseline)");
    eprintln!("  --seed <u64>        Override the perturbation seed");
    eprintln!("  --out <path>        Export the state series to CSV");
    eprintln!("  --print-steps       Print every simulation tick");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        csv_out: None,
        print_steps: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --out requires a path argument");
                    process::exit(1);
                }
                cli.csv_out = Some(args[i].clone());
            }
            "--print-steps" => {
                cli.print_steps = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Builds the engine from a validated scenario configuration.
fn build_engine<P: Perturbation>(cfg: &ScenarioConfig, perturb: P) -> Engine<P> {
    let s = &cfg.simulation;
    let mode = if s.mode == "basic" {
        RunMode::Basic
    } else {
        RunMode::Extended
    };
    let sim_config = SimConfig::new(s.duration_s, s.timestep_s, s.seed, mode);

    let p = &cfg.pv;
    let pv = PvArray::new(
        p.voc,
        p.isc,
        p.vmp,
        p.imp,
        p.series_cells,
        p.parallel_strings,
    );
    let profile = IrradianceProfile::new(
        p.irradiance_wm2,
        p.profile
            .iter()
            .map(|pt| ProfilePoint {
                time_s: pt.time_s,
                irradiance_wm2: pt.irradiance_wm2,
            })
            .collect(),
    );

    let b = &cfg.battery;
    let battery = Battery::new(
        b.nominal_voltage,
        b.capacity_ah,
        b.internal_resistance,
        mode == RunMode::Extended,
    );
    let thermal = BatteryThermal::new(
        b.internal_resistance,
        b.thermal_resistance,
        b.thermal_capacitance,
        b.ambient_c,
    );
    let bms = Bms::new(b.nominal_voltage, b.capacity_ah);

    let c = &cfg.converter;
    let ctl = &cfg.control;
    let arbiter = ModeArbiter::new(
        c.input_min_v,
        c.input_max_v,
        c.output_min_v,
        c.output_max_v,
        ctl.soc_min_pct,
        ctl.soc_max_pct,
    );
    let mppt = MpptController::new(ctl.mppt_step);
    let init = InitialConditions::new(
        b.nominal_voltage,
        b.initial_soc_pct,
        b.initial_temperature_c,
        ctl.initial_duty,
    );
    let load = ResistiveLoad::new(cfg.load.resistance_ohm);

    Engine::new(
        sim_config,
        pv,
        p.temperature_c,
        battery,
        thermal,
        bms,
        load,
        arbiter,
        mppt,
        profile,
        init,
        perturb,
    )
}

/// Runs the simulation with the configured perturbation source.
fn run_simulation(cfg: &ScenarioConfig) -> (StateSeries, RunSummary) {
    if cfg.control.perturbation == "off" {
        let mut engine = build_engine(cfg, NoPerturbation);
        let series = engine.run();
        let summary = RunSummary::from_series(&series, engine.pv(), engine.config().timestep_s);
        (series, summary)
    } else {
        let mut engine = build_engine(cfg, SeededPerturbation::new(cfg.simulation.seed));
        let series = engine.run();
        let summary = RunSummary::from_series(&series, engine.pv(), engine.config().timestep_s);
        (series, summary)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // Apply seed override
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build and run
    let (series, summary) = run_simulation(&scenario);

    // Print per-step records
    if cli.print_steps {
        for k in 0..series.len() {
            println!("{}", series.record(k));
        }
    }

    // Print the summary report
    println!("{summary}");

    // Export CSV if requested
    if let Some(ref path) = cli.csv_out {
        if let Err(e) = export_csv(&series, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("State series written to {path}");
    }
}
