//! Converter mode arbitration and buck/boost voltage derivation.

use std::fmt;

use super::mppt::{DUTY_MAX, DUTY_MIN};

/// Operating mode of the bidirectional DC-DC converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterMode {
    /// PV surplus flows into the battery (buck, PV side above battery).
    Charging,
    /// The battery covers the load deficit (boost toward the PV bus).
    Discharging,
    /// No net transfer through the converter.
    Idle,
}

impl ConverterMode {
    /// Numeric encoding: +1 charging, -1 discharging, 0 idle.
    pub fn sign(self) -> i8 {
        match self {
            ConverterMode::Charging => 1,
            ConverterMode::Discharging => -1,
            ConverterMode::Idle => 0,
        }
    }
}

impl fmt::Display for ConverterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConverterMode::Charging => "Charging",
            ConverterMode::Discharging => "Discharging",
            ConverterMode::Idle => "Idle",
        };
        f.write_str(label)
    }
}

/// One arbitration result: the PV-side voltage the converter imposes next
/// tick, the (possibly re-derived) duty cycle, and the mode the arbiter
/// computed from its own inputs.
#[derive(Debug, Clone, Copy)]
pub struct Arbitration {
    pub pv_voltage: f64,
    pub duty: f64,
    pub mode: ConverterMode,
}

/// Decides the converter operating mode and derives the PV-side voltage.
///
/// The converter is an ideal lossless voltage-ratio device: buck
/// `pv_v = batt_v / (1 - duty)` when charging, boost
/// `pv_v = batt_v * (1 - duty)` when discharging. Results are clamped to
/// the converter input window, with a single corrective pass against the
/// battery-side output window.
#[derive(Debug, Clone)]
pub struct ModeArbiter {
    /// Converter input-voltage window, PV side (V).
    pub input_min_v: f64,
    pub input_max_v: f64,
    /// Converter output-voltage window, battery side (V).
    pub output_min_v: f64,
    pub output_max_v: f64,
    /// SOC below which discharging is not entered (%).
    pub soc_min_pct: f64,
    /// SOC above which charging is not entered (%).
    pub soc_max_pct: f64,
}

impl ModeArbiter {
    /// Creates a new arbiter.
    ///
    /// # Panics
    ///
    /// Panics if a voltage window is empty or inverted, or the SOC window
    /// is not an ordered sub-range of [0, 100].
    pub fn new(
        input_min_v: f64,
        input_max_v: f64,
        output_min_v: f64,
        output_max_v: f64,
        soc_min_pct: f64,
        soc_max_pct: f64,
    ) -> Self {
        assert!(0.0 < input_min_v && input_min_v < input_max_v);
        assert!(0.0 < output_min_v && output_min_v < output_max_v);
        assert!(
            0.0 <= soc_min_pct && soc_min_pct < soc_max_pct && soc_max_pct <= 100.0,
            "soc window must be ordered within [0, 100]"
        );
        Self {
            input_min_v,
            input_max_v,
            output_min_v,
            output_max_v,
            soc_min_pct,
            soc_max_pct,
        }
    }

    /// Selects the operating mode from the instantaneous power balance.
    ///
    /// Charging requires PV surplus and headroom below the SOC ceiling;
    /// discharging requires a deficit and charge above the SOC floor;
    /// anything else (including exact balance) is idle.
    pub fn select_mode(&self, pv_power: f64, load_power: f64, soc: f64) -> ConverterMode {
        if pv_power > load_power && soc < self.soc_max_pct {
            ConverterMode::Charging
        } else if pv_power < load_power && soc > self.soc_min_pct {
            ConverterMode::Discharging
        } else {
            ConverterMode::Idle
        }
    }

    /// Recomputes the mode and derives the next PV-side voltage.
    ///
    /// The corrective pass checks the battery-side voltage implied by the
    /// window-clamped PV voltage; on violation the duty is re-derived from
    /// the violated bound and the voltage recomputed once. Never iterated.
    ///
    /// # Arguments
    ///
    /// * `pv_power`, `load_power` - Tick power balance (W)
    /// * `batt_voltage` - Battery terminal voltage at the operating point (V)
    /// * `soc` - State of charge at the operating point (%)
    /// * `pv_voltage` - Present PV-side voltage (V)
    /// * `duty` - Present duty cycle
    pub fn step(
        &self,
        pv_power: f64,
        load_power: f64,
        batt_voltage: f64,
        soc: f64,
        pv_voltage: f64,
        duty: f64,
    ) -> Arbitration {
        let mode = self.select_mode(pv_power, load_power, soc);
        match mode {
            ConverterMode::Charging => {
                let mut d = duty;
                let mut v = (batt_voltage / (1.0 - d)).clamp(self.input_min_v, self.input_max_v);
                let implied = v * (1.0 - d);
                if implied > self.output_max_v {
                    d = (1.0 - self.output_max_v / v).clamp(DUTY_MIN, DUTY_MAX);
                    v = (batt_voltage / (1.0 - d)).clamp(self.input_min_v, self.input_max_v);
                }
                Arbitration {
                    pv_voltage: v,
                    duty: d,
                    mode,
                }
            }
            ConverterMode::Discharging => {
                let mut d = duty;
                let mut v = (batt_voltage * (1.0 - d)).clamp(self.input_min_v, self.input_max_v);
                let implied = v / (1.0 - d);
                if implied > self.output_max_v || implied < self.output_min_v {
                    let bound = if implied > self.output_max_v {
                        self.output_max_v
                    } else {
                        self.output_min_v
                    };
                    d = (1.0 - v / bound).clamp(DUTY_MIN, DUTY_MAX);
                    v = (batt_voltage * (1.0 - d)).clamp(self.input_min_v, self.input_max_v);
                }
                Arbitration {
                    pv_voltage: v,
                    duty: d,
                    mode,
                }
            }
            ConverterMode::Idle => Arbitration {
                pv_voltage: pv_voltage.clamp(self.input_min_v, self.input_max_v),
                duty,
                mode,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbiter() -> ModeArbiter {
        ModeArbiter::new(25.0, 50.0, 24.0, 48.0, 20.0, 95.0)
    }

    #[test]
    fn surplus_with_headroom_charges() {
        let a = arbiter();
        assert_eq!(a.select_mode(600.0, 57.6, 50.0), ConverterMode::Charging);
    }

    #[test]
    fn surplus_at_soc_ceiling_idles() {
        let a = arbiter();
        assert_eq!(a.select_mode(600.0, 57.6, 95.0), ConverterMode::Idle);
    }

    #[test]
    fn deficit_with_charge_discharges() {
        let a = arbiter();
        assert_eq!(a.select_mode(0.0, 57.6, 50.0), ConverterMode::Discharging);
    }

    #[test]
    fn deficit_at_soc_floor_idles() {
        let a = arbiter();
        assert_eq!(a.select_mode(0.0, 57.6, 20.0), ConverterMode::Idle);
    }

    #[test]
    fn exact_balance_idles() {
        let a = arbiter();
        assert_eq!(a.select_mode(57.6, 57.6, 50.0), ConverterMode::Idle);
    }

    #[test]
    fn charging_applies_buck_relation() {
        let a = arbiter();
        let r = a.step(600.0, 57.6, 24.0, 50.0, 35.0, 0.5);
        assert_eq!(r.mode, ConverterMode::Charging);
        // 24 / (1 - 0.5) = 48, inside the input window.
        assert!((r.pv_voltage - 48.0).abs() < 1e-12);
        assert_eq!(r.duty, 0.5);
    }

    #[test]
    fn charging_clamps_to_input_window() {
        let a = arbiter();
        // 24 / (1 - 0.9) = 240, clamped to 50.
        let r = a.step(600.0, 57.6, 24.0, 50.0, 35.0, 0.9);
        assert_eq!(r.pv_voltage, 50.0);
    }

    #[test]
    fn discharging_applies_boost_relation() {
        let a = arbiter();
        let r = a.step(0.0, 57.6, 48.0, 50.0, 35.0, 0.2);
        assert_eq!(r.mode, ConverterMode::Discharging);
        // 48 * 0.8 = 38.4; implied battery voltage 48 is inside the window.
        assert!((r.pv_voltage - 38.4).abs() < 1e-12);
        assert_eq!(r.duty, 0.2);
    }

    #[test]
    fn discharging_corrective_pass_rederives_duty() {
        let a = arbiter();
        // 48 * 0.5 = 24, clamped up to 25; implied 25 / 0.5 = 50 > 48, so
        // the duty is re-derived from the ceiling: 1 - 25/48.
        let r = a.step(0.0, 57.6, 48.0, 50.0, 35.0, 0.5);
        let expected_duty = 1.0 - 25.0 / 48.0;
        assert!((r.duty - expected_duty).abs() < 1e-12);
        assert!((r.pv_voltage - 48.0 * (1.0 - expected_duty)).abs() < 1e-12);
    }

    #[test]
    fn idle_holds_voltage_within_window() {
        let a = arbiter();
        let r = a.step(57.6, 57.6, 24.0, 50.0, 35.0, 0.5);
        assert_eq!(r.mode, ConverterMode::Idle);
        assert_eq!(r.pv_voltage, 35.0);
        assert_eq!(r.duty, 0.5);
    }

    #[test]
    fn idle_clamps_out_of_window_voltage() {
        let a = arbiter();
        assert_eq!(a.step(57.6, 57.6, 24.0, 50.0, 10.0, 0.5).pv_voltage, 25.0);
        assert_eq!(a.step(57.6, 57.6, 24.0, 50.0, 80.0, 0.5).pv_voltage, 50.0);
    }

    #[test]
    fn mode_sign_encoding() {
        assert_eq!(ConverterMode::Charging.sign(), 1);
        assert_eq!(ConverterMode::Discharging.sign(), -1);
        assert_eq!(ConverterMode::Idle.sign(), 0);
    }

    #[test]
    #[should_panic]
    fn inverted_soc_window_panics() {
        ModeArbiter::new(25.0, 50.0, 24.0, 48.0, 95.0, 20.0);
    }
}
