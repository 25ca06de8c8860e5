//! Core simulation types: timing configuration, irradiance profile, and the
//! per-tick state series.

use std::fmt;

use super::bms::{BmsStatus, ProtectionFlags};
use super::converter::ConverterMode;

/// Which model variant the run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Voltage/SOC integration only; temperature held at ambient, no BMS.
    Basic,
    /// Adds the thermal model and the protection state machine.
    Extended,
}

/// Centralized simulation timing configuration.
///
/// # Examples
///
/// ```
/// use pv_charge_sim::sim::types::{RunMode, SimConfig};
///
/// let cfg = SimConfig::new(5.0, 0.01, 42, RunMode::Extended);
/// assert_eq!(cfg.steps(), 501);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Simulated duration (s).
    pub duration_s: f64,
    /// Step duration (s).
    pub timestep_s: f64,
    /// Master random seed for the voltage perturbation.
    pub seed: u64,
    /// Model variant.
    pub mode: RunMode,
}

impl SimConfig {
    /// Creates a new timing configuration.
    ///
    /// # Panics
    ///
    /// Panics if the duration or timestep is non-positive, or the timestep
    /// exceeds the duration.
    pub fn new(duration_s: f64, timestep_s: f64, seed: u64, mode: RunMode) -> Self {
        assert!(duration_s > 0.0, "duration_s must be > 0");
        assert!(timestep_s > 0.0, "timestep_s must be > 0");
        assert!(timestep_s <= duration_s, "timestep_s must be <= duration_s");
        Self {
            duration_s,
            timestep_s,
            seed,
            mode,
        }
    }

    /// Number of state samples, including the initial conditions at index 0.
    pub fn steps(&self) -> usize {
        (self.duration_s / self.timestep_s).round() as usize + 1
    }
}

/// One irradiance breakpoint: the value in effect from `time_s` onward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub time_s: f64,
    pub irradiance_wm2: f64,
}

/// Piecewise-constant irradiance over time.
///
/// The value at time `t` is the latest breakpoint with `time_s <= t`, or
/// the base irradiance before the first breakpoint.
#[derive(Debug, Clone)]
pub struct IrradianceProfile {
    base_wm2: f64,
    points: Vec<ProfilePoint>,
}

impl IrradianceProfile {
    /// Creates a profile from a base value and ordered breakpoints.
    ///
    /// # Panics
    ///
    /// Panics if breakpoint times are not strictly increasing or any
    /// irradiance is negative. Configuration validation rejects both first.
    pub fn new(base_wm2: f64, points: Vec<ProfilePoint>) -> Self {
        assert!(base_wm2 >= 0.0, "irradiance must be >= 0");
        for pair in points.windows(2) {
            assert!(
                pair[0].time_s < pair[1].time_s,
                "profile breakpoints must be strictly increasing in time"
            );
        }
        assert!(
            points.iter().all(|p| p.irradiance_wm2 >= 0.0),
            "irradiance must be >= 0"
        );
        Self { base_wm2, points }
    }

    /// A constant profile with no breakpoints.
    pub fn constant(base_wm2: f64) -> Self {
        Self::new(base_wm2, Vec::new())
    }

    /// Irradiance in effect at time `t`.
    pub fn at(&self, t: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.time_s <= t);
        if idx == 0 {
            self.base_wm2
        } else {
            self.points[idx - 1].irradiance_wm2
        }
    }
}

/// The complete simulation time series, one entry per tick.
///
/// All vectors share the same length; index 0 holds the initial conditions
/// and index k+1 is derived purely from index k.
#[derive(Debug, Clone)]
pub struct StateSeries {
    pub time_s: Vec<f64>,
    pub irradiance_wm2: Vec<f64>,
    pub pv_voltage: Vec<f64>,
    pub pv_current: Vec<f64>,
    pub pv_power: Vec<f64>,
    pub batt_voltage: Vec<f64>,
    pub batt_current: Vec<f64>,
    pub batt_power: Vec<f64>,
    pub soc_pct: Vec<f64>,
    pub temperature_c: Vec<f64>,
    pub load_voltage: Vec<f64>,
    pub load_current: Vec<f64>,
    pub load_power: Vec<f64>,
    pub duty: Vec<f64>,
    pub mode: Vec<ConverterMode>,
    pub bms_status: Vec<BmsStatus>,
    pub flags: Vec<ProtectionFlags>,
    pub mode_mismatch: Vec<bool>,
}

impl StateSeries {
    /// Allocates a zeroed series of `len` ticks.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero; a run always has its initial conditions.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "state series must hold at least one tick");
        Self {
            time_s: vec![0.0; len],
            irradiance_wm2: vec![0.0; len],
            pv_voltage: vec![0.0; len],
            pv_current: vec![0.0; len],
            pv_power: vec![0.0; len],
            batt_voltage: vec![0.0; len],
            batt_current: vec![0.0; len],
            batt_power: vec![0.0; len],
            soc_pct: vec![0.0; len],
            temperature_c: vec![0.0; len],
            load_voltage: vec![0.0; len],
            load_current: vec![0.0; len],
            load_power: vec![0.0; len],
            duty: vec![0.0; len],
            mode: vec![ConverterMode::Idle; len],
            bms_status: vec![BmsStatus::Normal; len],
            flags: vec![ProtectionFlags::default(); len],
            mode_mismatch: vec![false; len],
        }
    }

    /// Number of ticks in the series.
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    /// Whether the series is empty. Never true for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Copies one tick out as an owned record.
    pub fn record(&self, k: usize) -> StepRecord {
        StepRecord {
            step: k,
            time_s: self.time_s[k],
            irradiance_wm2: self.irradiance_wm2[k],
            pv_voltage: self.pv_voltage[k],
            pv_current: self.pv_current[k],
            pv_power: self.pv_power[k],
            batt_voltage: self.batt_voltage[k],
            batt_current: self.batt_current[k],
            batt_power: self.batt_power[k],
            soc_pct: self.soc_pct[k],
            temperature_c: self.temperature_c[k],
            load_voltage: self.load_voltage[k],
            load_current: self.load_current[k],
            load_power: self.load_power[k],
            duty: self.duty[k],
            mode: self.mode[k],
            bms_status: self.bms_status[k],
            flags: self.flags[k],
            mode_mismatch: self.mode_mismatch[k],
        }
    }
}

/// Owned copy of one simulation tick.
#[derive(Debug, Clone, Copy)]
pub struct StepRecord {
    pub step: usize,
    pub time_s: f64,
    pub irradiance_wm2: f64,
    pub pv_voltage: f64,
    pub pv_current: f64,
    pub pv_power: f64,
    pub batt_voltage: f64,
    pub batt_current: f64,
    pub batt_power: f64,
    pub soc_pct: f64,
    pub temperature_c: f64,
    pub load_voltage: f64,
    pub load_current: f64,
    pub load_power: f64,
    pub duty: f64,
    pub mode: ConverterMode,
    pub bms_status: BmsStatus,
    pub flags: ProtectionFlags,
    pub mode_mismatch: bool,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} ({:>7.2}s) | {:<11} D={:.3} | PV {:>5.1} V {:>5.2} A {:>7.1} W \
             | Batt {:>5.2} V {:>7.2} A (SOC={:.2}%, {:.2}°C) | Load {:>6.1} W | BMS: {}",
            self.step,
            self.time_s,
            self.mode.to_string(),
            self.duty,
            self.pv_voltage,
            self.pv_current,
            self.pv_power,
            self.batt_voltage,
            self.batt_current,
            self.soc_pct,
            self.temperature_c,
            self.load_power,
            self.bms_status,
        )
    }
}
