//! Simulation engine: advances the PV/converter/battery system tick by tick.

use tracing::warn;

use crate::devices::{Battery, BatteryThermal, PvArray, ResistiveLoad};

use super::bms::{Bms, BmsDecision, BmsStatus, ProtectionFlags};
use super::converter::{ConverterMode, ModeArbiter};
use super::mppt::{DUTY_MAX, DUTY_MIN, MpptController};
use super::perturb::Perturbation;
use super::types::{IrradianceProfile, RunMode, SimConfig, StateSeries};

/// Lower clamp on the PV operating voltage after perturbation (V).
const PV_VOLTAGE_FLOOR: f64 = 0.1;

/// Initial operating point of a run.
#[derive(Debug, Clone)]
pub struct InitialConditions {
    /// Battery terminal voltage at tick 0 (V).
    pub batt_voltage: f64,
    /// State of charge at tick 0 (%).
    pub soc_pct: f64,
    /// Battery temperature at tick 0 (°C).
    pub temperature_c: f64,
    /// Converter duty cycle held until the tracker has a previous sample.
    pub duty: f64,
}

impl InitialConditions {
    /// Creates validated initial conditions.
    ///
    /// # Panics
    ///
    /// Panics if the voltage is non-positive, the SOC is outside [0, 100],
    /// or the duty cycle is outside the converter's operating range.
    pub fn new(batt_voltage: f64, soc_pct: f64, temperature_c: f64, duty: f64) -> Self {
        assert!(batt_voltage > 0.0, "batt_voltage must be > 0");
        assert!(
            (0.0..=100.0).contains(&soc_pct),
            "soc_pct must be in [0, 100]"
        );
        assert!(
            (DUTY_MIN..=DUTY_MAX).contains(&duty),
            "duty must be in [{DUTY_MIN}, {DUTY_MAX}]"
        );
        Self {
            batt_voltage,
            soc_pct,
            temperature_c,
            duty,
        }
    }
}

/// Simulation engine owning the component models and configuration.
///
/// Generic over `P: Perturbation` for static dispatch; tests inject a
/// disabled source for fully deterministic trajectories. All per-tick state
/// lives in the [`StateSeries`] the engine fills and returns — the
/// component models are pure functions over explicit state.
pub struct Engine<P: Perturbation> {
    config: SimConfig,
    pv: PvArray,
    pv_temperature_c: f64,
    battery: Battery,
    thermal: BatteryThermal,
    bms: Bms,
    load: ResistiveLoad,
    arbiter: ModeArbiter,
    mppt: MpptController,
    profile: IrradianceProfile,
    init: InitialConditions,
    perturb: P,
}

impl<P: Perturbation> Engine<P> {
    /// Creates a new simulation engine from validated components.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        config: SimConfig,
        pv: PvArray,
        pv_temperature_c: f64,
        battery: Battery,
        thermal: BatteryThermal,
        bms: Bms,
        load: ResistiveLoad,
        arbiter: ModeArbiter,
        mppt: MpptController,
        profile: IrradianceProfile,
        init: InitialConditions,
        perturb: P,
    ) -> Self {
        Self {
            config,
            pv,
            pv_temperature_c,
            battery,
            thermal,
            bms,
            load,
            arbiter,
            mppt,
            profile,
            init,
            perturb,
        }
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns a reference to the PV array model.
    pub fn pv(&self) -> &PvArray {
        &self.pv
    }

    /// Runs every tick and returns the complete state series.
    ///
    /// Per tick: evaluate the PV and load operating points, select the
    /// converter mode, derive the duty cycle (tracker in Charging, direct
    /// boost formula in Discharging, hold in Idle), limit the battery
    /// current (Extended runs), advance battery voltage/SOC/temperature,
    /// and let the arbiter impose the next PV-side voltage. In non-charging
    /// modes a bounded random perturbation keeps the operating point
    /// probing for the maximum power point.
    pub fn run(&mut self) -> StateSeries {
        let n = self.config.steps();
        let ts = self.config.timestep_s;
        let extended = self.config.mode == RunMode::Extended;
        let mut s = StateSeries::new(n);

        s.pv_voltage[0] = self.pv.vmp;
        s.batt_voltage[0] = self.init.batt_voltage;
        s.soc_pct[0] = self.init.soc_pct;
        s.temperature_c[0] = self.init.temperature_c;

        for k in 0..n {
            let t = k as f64 * ts;
            s.time_s[k] = t;
            let irradiance = self.profile.at(t);
            s.irradiance_wm2[k] = irradiance;

            s.pv_current[k] = self
                .pv
                .current(s.pv_voltage[k], irradiance, self.pv_temperature_c);
            s.pv_power[k] = s.pv_voltage[k] * s.pv_current[k];

            let bus_v = s.batt_voltage[k];
            s.load_voltage[k] = bus_v;
            s.load_current[k] = self.load.current(bus_v);
            s.load_power[k] = self.load.power(bus_v);

            let mode = self
                .arbiter
                .select_mode(s.pv_power[k], s.load_power[k], s.soc_pct[k]);
            s.mode[k] = mode;

            let duty_prev = if k == 0 { self.init.duty } else { s.duty[k - 1] };
            let duty = match mode {
                // The first tick has no previous sample to difference against.
                ConverterMode::Charging if k > 0 => self.mppt.next_duty(
                    s.pv_voltage[k],
                    s.pv_current[k],
                    s.pv_voltage[k - 1],
                    s.pv_current[k - 1],
                    duty_prev,
                ),
                ConverterMode::Charging => duty_prev,
                ConverterMode::Discharging => {
                    (1.0 - s.pv_voltage[k] / bus_v).clamp(DUTY_MIN, DUTY_MAX)
                }
                ConverterMode::Idle => duty_prev,
            };

            // Candidate current from the power balance; the sign convention
            // makes a PV surplus charge (negative) and a deficit discharge.
            let candidate = match mode {
                ConverterMode::Idle => 0.0,
                _ => (s.load_power[k] - s.pv_power[k]) / bus_v,
            };

            let decision = if extended {
                self.bms
                    .evaluate(bus_v, candidate, s.soc_pct[k], s.temperature_c[k])
            } else {
                BmsDecision {
                    limited_current: candidate,
                    status: BmsStatus::Normal,
                    flags: ProtectionFlags::default(),
                }
            };
            s.batt_current[k] = decision.limited_current;
            s.batt_power[k] = bus_v * decision.limited_current;
            s.bms_status[k] = decision.status;
            s.flags[k] = decision.flags;

            if k + 1 < n {
                let current = decision.limited_current;
                s.batt_voltage[k + 1] =
                    self.battery.next_voltage(bus_v, current, s.temperature_c[k]);
                s.soc_pct[k + 1] =
                    self.battery
                        .next_soc(s.soc_pct[k], current, s.temperature_c[k], ts);
                s.temperature_c[k + 1] = if extended {
                    self.thermal
                        .next_temperature(s.temperature_c[k], current, ts)
                } else {
                    self.init.temperature_c
                };

                // The arbiter re-evaluates the mode on the advanced operating
                // point; a disagreement is warned about and the loop's mode
                // stands. The divergence is not reconciled within the tick.
                let arb = self.arbiter.step(
                    s.pv_power[k],
                    s.load_power[k],
                    s.batt_voltage[k + 1],
                    s.soc_pct[k + 1],
                    s.pv_voltage[k],
                    duty,
                );
                if arb.mode != mode {
                    s.mode_mismatch[k] = true;
                    warn!(
                        step = k,
                        loop_mode = %mode,
                        arbiter_mode = %arb.mode,
                        "converter mode disagreement; keeping the loop's mode"
                    );
                }
                s.duty[k] = arb.duty;

                let mut next_pv = arb.pv_voltage;
                if mode != ConverterMode::Charging {
                    next_pv = (next_pv + self.perturb.sample(self.mppt.step))
                        .clamp(PV_VOLTAGE_FLOOR, self.pv.voc);
                }
                s.pv_voltage[k + 1] = next_pv;
            } else {
                s.duty[k] = duty;
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::perturb::NoPerturbation;

    fn engine(
        mode: RunMode,
        irradiance: f64,
        soc_pct: f64,
        soc_max_pct: f64,
    ) -> Engine<NoPerturbation> {
        let config = SimConfig::new(0.5, 0.01, 42, mode);
        Engine::new(
            config,
            PvArray::new(42.0, 10.0, 35.0, 9.0, 20, 2),
            25.0,
            Battery::new(24.0, 75.0, 0.05, mode == RunMode::Extended),
            BatteryThermal::new(0.05, 2.0, 1200.0, 25.0),
            Bms::new(24.0, 75.0),
            ResistiveLoad::new(10.0),
            ModeArbiter::new(25.0, 50.0, 24.0, 48.0, 20.0, soc_max_pct),
            MpptController::new(0.01),
            IrradianceProfile::constant(irradiance),
            InitialConditions::new(24.0, soc_pct, 25.0, 0.5),
            NoPerturbation,
        )
    }

    #[test]
    fn run_fills_every_tick() {
        let series = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        assert_eq!(series.len(), 51);
        assert_eq!(series.time_s[0], 0.0);
        assert!((series.time_s[50] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn duty_cycle_stays_in_operating_range() {
        let series = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        for &d in &series.duty {
            assert!((DUTY_MIN..=DUTY_MAX).contains(&d), "duty {d} out of range");
        }
    }

    #[test]
    fn high_irradiance_with_headroom_charges() {
        let series = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        assert_eq!(series.mode[0], ConverterMode::Charging);
        // Charging current is negative until a protection zeroes it.
        assert!(series.batt_current[0] < 0.0);
    }

    #[test]
    fn dark_array_discharges_into_the_load() {
        let series = engine(RunMode::Extended, 0.0, 50.0, 95.0).run();
        assert_eq!(series.mode[0], ConverterMode::Discharging);
        assert!(series.batt_current[0] > 0.0);
        // SOC only falls while discharging.
        assert!(series.soc_pct[50] < 50.0);
    }

    #[test]
    fn basic_run_holds_temperature_and_skips_protection() {
        let series = engine(RunMode::Basic, 1000.0, 50.0, 95.0).run();
        for k in 0..series.len() {
            assert_eq!(series.temperature_c[k], 25.0);
            assert!(series.bms_status[k].is_normal());
            assert!(!series.flags[k].any());
        }
    }

    #[test]
    fn soc_ceiling_crossing_is_flagged_not_corrected() {
        // The SOC crosses the arbitration ceiling mid-run: the loop keeps
        // its Charging choice for the tick, records the disagreement, and
        // moves on.
        let series = engine(RunMode::Extended, 1000.0, 50.0, 50.00005).run();
        let mismatches = series.mode_mismatch.iter().filter(|&&m| m).count();
        assert!(mismatches > 0, "expected at least one mode disagreement");
        let first = series.mode_mismatch.iter().position(|&m| m).unwrap_or(0);
        assert_eq!(series.mode[first], ConverterMode::Charging);
    }

    #[test]
    fn overvoltage_protection_engages_while_charging() {
        // Charging walks the terminal voltage up by |i|*R each tick; the
        // 28.8 V cutoff must zero the current before 30 V.
        let series = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        let tripped = series.flags.iter().any(|f| f.overvoltage);
        assert!(tripped, "expected the overvoltage check to trip");
        for k in 0..series.len() {
            assert!(series.batt_voltage[k] < 30.0);
            if series.flags[k].overvoltage {
                assert_eq!(series.batt_current[k], 0.0);
                assert_eq!(series.bms_status[k], BmsStatus::Overvoltage);
            }
        }
    }

    #[test]
    fn deterministic_without_perturbation() {
        let a = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        let b = engine(RunMode::Extended, 1000.0, 50.0, 95.0).run();
        for k in 0..a.len() {
            assert_eq!(a.pv_voltage[k], b.pv_voltage[k]);
            assert_eq!(a.batt_current[k], b.batt_current[k]);
            assert_eq!(a.soc_pct[k], b.soc_pct[k]);
        }
    }
}
