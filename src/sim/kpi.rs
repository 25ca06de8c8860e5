//! Post-hoc summary metrics computed from a completed run.

use std::fmt;

use crate::devices::PvArray;

use super::converter::ConverterMode;
use super::types::StateSeries;

/// Aggregate metrics derived from a complete state series.
///
/// Computed post-hoc so the reported numbers always agree with the
/// exported per-tick data.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Mean of `pv_power / available_mpp_power` over Charging ticks (%).
    pub avg_mppt_efficiency_pct: f64,
    /// Ticks spent in each converter mode.
    pub charging_steps: usize,
    pub discharging_steps: usize,
    pub idle_steps: usize,
    /// Ticks where a protection check overrode the commanded current.
    pub protection_steps: usize,
    /// Ticks with at least one protection flag raised.
    pub flagged_steps: usize,
    /// Ticks where the arbiter disagreed with the loop's mode choice.
    pub mode_mismatch_steps: usize,
    /// State of charge at the start and end of the run (%).
    pub soc_start_pct: f64,
    pub soc_end_pct: f64,
    /// SOC extremes over the run (%).
    pub soc_min_pct: f64,
    pub soc_max_pct: f64,
    /// Highest battery temperature reached (°C).
    pub peak_temperature_c: f64,
    /// Total charge moved through the battery (Ah).
    pub battery_throughput_ah: f64,
    /// Energy harvested from the array (Wh).
    pub pv_energy_wh: f64,
}

impl RunSummary {
    /// Computes all metrics from a completed series.
    ///
    /// # Arguments
    ///
    /// * `series` - Complete simulation state series
    /// * `pv` - Array model, for the available-MPP-power denominator
    /// * `timestep_s` - Step duration (s)
    pub fn from_series(series: &StateSeries, pv: &PvArray, timestep_s: f64) -> Self {
        let mut efficiency_sum = 0.0_f64;
        let mut efficiency_count = 0_usize;
        let mut charging = 0_usize;
        let mut discharging = 0_usize;
        let mut idle = 0_usize;
        let mut protection = 0_usize;
        let mut flagged = 0_usize;
        let mut mismatches = 0_usize;
        let mut soc_min = f64::INFINITY;
        let mut soc_max = f64::NEG_INFINITY;
        let mut peak_temp = f64::NEG_INFINITY;
        let mut throughput_as = 0.0_f64;
        let mut pv_energy_ws = 0.0_f64;

        for k in 0..series.len() {
            match series.mode[k] {
                ConverterMode::Charging => charging += 1,
                ConverterMode::Discharging => discharging += 1,
                ConverterMode::Idle => idle += 1,
            }
            if series.mode[k] == ConverterMode::Charging {
                let available = pv.available_power(series.irradiance_wm2[k]);
                if available > 0.0 {
                    efficiency_sum += series.pv_power[k] / available * 100.0;
                    efficiency_count += 1;
                }
            }
            if !series.bms_status[k].is_normal() {
                protection += 1;
            }
            if series.flags[k].any() {
                flagged += 1;
            }
            if series.mode_mismatch[k] {
                mismatches += 1;
            }
            soc_min = soc_min.min(series.soc_pct[k]);
            soc_max = soc_max.max(series.soc_pct[k]);
            peak_temp = peak_temp.max(series.temperature_c[k]);
            throughput_as += series.batt_current[k].abs() * timestep_s;
            pv_energy_ws += series.pv_power[k] * timestep_s;
        }

        let avg_efficiency = if efficiency_count > 0 {
            efficiency_sum / efficiency_count as f64
        } else {
            0.0
        };

        Self {
            avg_mppt_efficiency_pct: avg_efficiency,
            charging_steps: charging,
            discharging_steps: discharging,
            idle_steps: idle,
            protection_steps: protection,
            flagged_steps: flagged,
            mode_mismatch_steps: mismatches,
            soc_start_pct: series.soc_pct.first().copied().unwrap_or(0.0),
            soc_end_pct: series.soc_pct.last().copied().unwrap_or(0.0),
            soc_min_pct: if soc_min.is_finite() { soc_min } else { 0.0 },
            soc_max_pct: if soc_max.is_finite() { soc_max } else { 0.0 },
            peak_temperature_c: if peak_temp.is_finite() { peak_temp } else { 0.0 },
            battery_throughput_ah: throughput_as / 3600.0,
            pv_energy_wh: pv_energy_ws / 3600.0,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(
            f,
            "Avg MPPT efficiency:   {:.1}%",
            self.avg_mppt_efficiency_pct
        )?;
        writeln!(
            f,
            "Mode split:            charge={} discharge={} idle={}",
            self.charging_steps, self.discharging_steps, self.idle_steps
        )?;
        writeln!(
            f,
            "Protection overrides:  {} ticks ({} flagged)",
            self.protection_steps, self.flagged_steps
        )?;
        writeln!(f, "Mode disagreements:    {}", self.mode_mismatch_steps)?;
        writeln!(
            f,
            "SOC:                   {:.2}% -> {:.2}% (min {:.2}%, max {:.2}%)",
            self.soc_start_pct, self.soc_end_pct, self.soc_min_pct, self.soc_max_pct
        )?;
        writeln!(f, "Peak temperature:      {:.2} °C", self.peak_temperature_c)?;
        writeln!(
            f,
            "Battery throughput:    {:.4} Ah",
            self.battery_throughput_ah
        )?;
        write!(f, "PV energy harvested:   {:.2} Wh", self.pv_energy_wh)
    }
}
