//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::sim::mppt::{DUTY_MAX, DUTY_MIN};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and model-variant parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// PV array ratings and irradiance input.
    #[serde(default)]
    pub pv: PvConfig,
    /// Battery bank parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Converter voltage windows.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Resistive load parameters.
    #[serde(default)]
    pub load: LoadConfig,
    /// Tracking and arbitration parameters.
    #[serde(default)]
    pub control: ControlConfig,
}

/// Simulation timing and model-variant parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated duration (s, must be > 0).
    pub duration_s: f64,
    /// Step duration (s, must be > 0 and <= duration).
    pub timestep_s: f64,
    /// Master random seed for the voltage perturbation.
    pub seed: u64,
    /// Model variant: `"basic"` or `"extended"` (thermal + protection).
    pub mode: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 5.0,
            timestep_s: 0.01,
            seed: 42,
            mode: "extended".to_string(),
        }
    }
}

/// One irradiance breakpoint in the scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePointConfig {
    /// Time the value takes effect (s).
    pub time_s: f64,
    /// Irradiance from that time onward (W/m²).
    pub irradiance_wm2: f64,
}

/// PV array ratings and irradiance input.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Open-circuit voltage at STC (V).
    pub voc: f64,
    /// Short-circuit current per string at STC (A).
    pub isc: f64,
    /// Maximum-power-point voltage at STC (V).
    pub vmp: f64,
    /// Maximum-power-point current per string at STC (A).
    pub imp: f64,
    /// Series-connected cells per string.
    pub series_cells: u32,
    /// Parallel strings.
    pub parallel_strings: u32,
    /// Cell temperature (°C).
    pub temperature_c: f64,
    /// Irradiance before the first profile breakpoint (W/m²).
    pub irradiance_wm2: f64,
    /// Piecewise-constant irradiance breakpoints, strictly increasing in
    /// time. The default steps down to 800 W/m² one second in.
    pub profile: Vec<ProfilePointConfig>,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            voc: 42.0,
            isc: 10.0,
            vmp: 35.0,
            imp: 9.0,
            series_cells: 20,
            parallel_strings: 2,
            temperature_c: 25.0,
            irradiance_wm2: 1000.0,
            profile: vec![ProfilePointConfig {
                time_s: 1.0,
                irradiance_wm2: 800.0,
            }],
        }
    }
}

/// Battery bank parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Nominal bank voltage (V, must be 24 or 48).
    pub nominal_voltage: f64,
    /// Rated capacity (Ah).
    pub capacity_ah: f64,
    /// Internal resistance at 25 °C (Ω).
    pub internal_resistance: f64,
    /// Thermal resistance to ambient (K/W).
    pub thermal_resistance: f64,
    /// Lumped thermal capacitance (J/K).
    pub thermal_capacitance: f64,
    /// Ambient temperature (°C).
    pub ambient_c: f64,
    /// State of charge at tick 0 (%).
    pub initial_soc_pct: f64,
    /// Battery temperature at tick 0 (°C).
    pub initial_temperature_c: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            nominal_voltage: 24.0,
            capacity_ah: 75.0,
            internal_resistance: 0.05,
            thermal_resistance: 2.0,
            thermal_capacitance: 1200.0,
            ambient_c: 25.0,
            initial_soc_pct: 50.0,
            initial_temperature_c: 25.0,
        }
    }
}

/// Converter voltage windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Input-voltage window, PV side (V).
    pub input_min_v: f64,
    pub input_max_v: f64,
    /// Output-voltage window, battery side (V).
    pub output_min_v: f64,
    pub output_max_v: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_min_v: 25.0,
            input_max_v: 50.0,
            output_min_v: 24.0,
            output_max_v: 48.0,
        }
    }
}

/// Resistive load parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Load resistance on the battery bus (Ω).
    pub resistance_ohm: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            resistance_ohm: 10.0,
        }
    }
}

/// Tracking and arbitration parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Duty-cycle perturbation per tick.
    pub mppt_step: f64,
    /// Duty cycle held until the tracker has a previous sample.
    pub initial_duty: f64,
    /// SOC below which discharging is not entered (%).
    pub soc_min_pct: f64,
    /// SOC above which charging is not entered (%).
    pub soc_max_pct: f64,
    /// Voltage perturbation source: `"seeded"` or `"off"`.
    pub perturbation: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            mppt_step: 0.01,
            initial_duty: 0.5,
            soc_min_pct: 20.0,
            soc_max_pct: 95.0,
            perturbation: "seeded".to_string(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.nominal_voltage"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 24 V bank behind a 420 W array with
    /// a step change in irradiance one second in.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            pv: PvConfig::default(),
            battery: BatteryConfig::default(),
            converter: ConverterConfig::default(),
            load: LoadConfig::default(),
            control: ControlConfig::default(),
        }
    }

    /// Returns the 48 V preset: a higher-voltage bank behind a larger
    /// series string, with the converter windows shifted to match.
    pub fn bank_48v() -> Self {
        Self {
            pv: PvConfig {
                voc: 85.0,
                vmp: 70.0,
                series_cells: 40,
                ..PvConfig::default()
            },
            battery: BatteryConfig {
                nominal_voltage: 48.0,
                capacity_ah: 100.0,
                ..BatteryConfig::default()
            },
            converter: ConverterConfig {
                input_min_v: 50.0,
                input_max_v: 100.0,
                output_min_v: 42.0,
                output_max_v: 57.6,
            },
            load: LoadConfig {
                resistance_ohm: 20.0,
            },
            ..Self::baseline()
        }
    }

    /// Returns the cloudy-day preset: irradiance falls in two steps and
    /// partially recovers.
    pub fn cloudy_day() -> Self {
        Self {
            pv: PvConfig {
                profile: vec![
                    ProfilePointConfig {
                        time_s: 0.5,
                        irradiance_wm2: 600.0,
                    },
                    ProfilePointConfig {
                        time_s: 1.5,
                        irradiance_wm2: 300.0,
                    },
                    ProfilePointConfig {
                        time_s: 3.0,
                        irradiance_wm2: 800.0,
                    },
                ],
                ..PvConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "bank_48v", "cloudy_day"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "bank_48v" => Ok(Self::bank_48v()),
            "cloudy_day" => Ok(Self::cloudy_day()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Every check
    /// runs before the simulation loop starts; a non-empty list is the only
    /// unrecoverable failure the core produces.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.duration_s <= 0.0 {
            errors.push(ConfigError {
                field: "simulation.duration_s".into(),
                message: "must be > 0".into(),
            });
        }
        if s.timestep_s <= 0.0 {
            errors.push(ConfigError {
                field: "simulation.timestep_s".into(),
                message: "must be > 0".into(),
            });
        } else if s.timestep_s > s.duration_s {
            errors.push(ConfigError {
                field: "simulation.timestep_s".into(),
                message: "must be <= simulation.duration_s".into(),
            });
        }
        if s.mode != "basic" && s.mode != "extended" {
            errors.push(ConfigError {
                field: "simulation.mode".into(),
                message: format!("must be \"basic\" or \"extended\", got \"{}\"", s.mode),
            });
        }

        let p = &self.pv;
        if p.voc <= 0.0 || p.isc <= 0.0 {
            errors.push(ConfigError {
                field: "pv.voc".into(),
                message: "voc and isc must be > 0".into(),
            });
        }
        if p.vmp <= 0.0 || p.vmp >= p.voc {
            errors.push(ConfigError {
                field: "pv.vmp".into(),
                message: "must be in (0, pv.voc)".into(),
            });
        }
        if p.imp <= 0.0 || p.imp > p.isc {
            errors.push(ConfigError {
                field: "pv.imp".into(),
                message: "must be in (0, pv.isc]".into(),
            });
        }
        if p.series_cells == 0 || p.parallel_strings == 0 {
            errors.push(ConfigError {
                field: "pv.series_cells".into(),
                message: "cell counts must be >= 1".into(),
            });
        }
        if p.temperature_c <= -273.15 {
            errors.push(ConfigError {
                field: "pv.temperature_c".into(),
                message: "must be above absolute zero".into(),
            });
        }
        if p.irradiance_wm2 < 0.0 {
            errors.push(ConfigError {
                field: "pv.irradiance_wm2".into(),
                message: "must be >= 0".into(),
            });
        }
        for (i, point) in p.profile.iter().enumerate() {
            if point.irradiance_wm2 < 0.0 {
                errors.push(ConfigError {
                    field: format!("pv.profile[{i}].irradiance_wm2"),
                    message: "must be >= 0".into(),
                });
            }
            if point.time_s < 0.0 {
                errors.push(ConfigError {
                    field: format!("pv.profile[{i}].time_s"),
                    message: "must be >= 0".into(),
                });
            }
            if i > 0 && p.profile[i - 1].time_s >= point.time_s {
                errors.push(ConfigError {
                    field: format!("pv.profile[{i}].time_s"),
                    message: "breakpoint times must be strictly increasing".into(),
                });
            }
        }

        let b = &self.battery;
        if b.nominal_voltage != 24.0 && b.nominal_voltage != 48.0 {
            errors.push(ConfigError {
                field: "battery.nominal_voltage".into(),
                message: format!("must be 24 or 48, got {}", b.nominal_voltage),
            });
        }
        if b.capacity_ah <= 0.0 {
            errors.push(ConfigError {
                field: "battery.capacity_ah".into(),
                message: "must be > 0".into(),
            });
        }
        if b.internal_resistance < 0.0 {
            errors.push(ConfigError {
                field: "battery.internal_resistance".into(),
                message: "must be >= 0".into(),
            });
        }
        if b.thermal_resistance <= 0.0 || b.thermal_capacitance <= 0.0 {
            errors.push(ConfigError {
                field: "battery.thermal_resistance".into(),
                message: "thermal resistance and capacitance must be > 0".into(),
            });
        }
        if !(0.0..=100.0).contains(&b.initial_soc_pct) {
            errors.push(ConfigError {
                field: "battery.initial_soc_pct".into(),
                message: "must be in [0, 100]".into(),
            });
        }
        if b.ambient_c <= -273.15 || b.initial_temperature_c <= -273.15 {
            errors.push(ConfigError {
                field: "battery.ambient_c".into(),
                message: "temperatures must be above absolute zero".into(),
            });
        }

        let c = &self.converter;
        if c.input_min_v <= 0.0 || c.input_min_v >= c.input_max_v {
            errors.push(ConfigError {
                field: "converter.input_min_v".into(),
                message: "must be > 0 and < converter.input_max_v".into(),
            });
        }
        if c.output_min_v <= 0.0 || c.output_min_v >= c.output_max_v {
            errors.push(ConfigError {
                field: "converter.output_min_v".into(),
                message: "must be > 0 and < converter.output_max_v".into(),
            });
        }

        if self.load.resistance_ohm <= 0.0 {
            errors.push(ConfigError {
                field: "load.resistance_ohm".into(),
                message: "must be > 0".into(),
            });
        }

        let ctl = &self.control;
        if ctl.mppt_step <= 0.0 || ctl.mppt_step >= DUTY_MAX - DUTY_MIN {
            errors.push(ConfigError {
                field: "control.mppt_step".into(),
                message: format!("must be in (0, {})", DUTY_MAX - DUTY_MIN),
            });
        }
        if !(DUTY_MIN..=DUTY_MAX).contains(&ctl.initial_duty) {
            errors.push(ConfigError {
                field: "control.initial_duty".into(),
                message: format!("must be in [{DUTY_MIN}, {DUTY_MAX}]"),
            });
        }
        if !(0.0 <= ctl.soc_min_pct && ctl.soc_min_pct < ctl.soc_max_pct && ctl.soc_max_pct <= 100.0)
        {
            errors.push(ConfigError {
                field: "control.soc_min_pct".into(),
                message: "soc window must be ordered within [0, 100]".into(),
            });
        }
        if ctl.perturbation != "seeded" && ctl.perturbation != "off" {
            errors.push(ConfigError {
                field: "control.perturbation".into(),
                message: format!(
                    "must be \"seeded\" or \"off\", got \"{}\"",
                    ctl.perturbation
                ),
            });
        }

        errors
    }
}
