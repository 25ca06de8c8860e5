//! Lead-acid style battery model: terminal voltage and Coulomb-counted SOC.

/// Internal-resistance temperature drift coefficient (1/°C).
const RES_TEMP_COEFF: f64 = 0.01;
/// Cold-capacity derate coefficient (1/°C), applied below 25 °C.
const CAP_TEMP_COEFF: f64 = 0.005;
/// Self-discharge base rate at 25 °C (% of SOC per day).
const SELF_DISCHARGE_PCT_PER_DAY: f64 = 2.0;
/// Self-discharge exponential growth coefficient (1/°C), above 25 °C.
const SELF_DISCHARGE_GROWTH: f64 = 0.05;

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// A battery bank advanced one timestep at a time by the simulation loop.
///
/// The struct holds only immutable parameters; terminal voltage, SOC, and
/// temperature live in the simulation state and are passed in explicitly.
///
/// # Sign Convention
/// Positive current discharges the battery, negative current charges it.
#[derive(Debug, Clone)]
pub struct Battery {
    /// Nominal bank voltage (V), 24 or 48 in practice.
    pub nominal_voltage: f64,

    /// Rated capacity (Ah).
    pub capacity_ah: f64,

    /// Internal resistance at 25 °C (Ω).
    pub internal_resistance: f64,

    /// Whether resistance, capacity, and self-discharge track temperature.
    pub temperature_aware: bool,
}

impl Battery {
    /// Creates a new battery bank.
    ///
    /// # Arguments
    ///
    /// * `nominal_voltage` - Nominal bank voltage (V, must be > 0)
    /// * `capacity_ah` - Rated capacity (Ah, must be > 0)
    /// * `internal_resistance` - Internal resistance at 25 °C (Ω, >= 0)
    /// * `temperature_aware` - Enable thermal drift of resistance/capacity
    ///
    /// # Panics
    ///
    /// Panics if voltage or capacity is non-positive, or resistance negative.
    pub fn new(
        nominal_voltage: f64,
        capacity_ah: f64,
        internal_resistance: f64,
        temperature_aware: bool,
    ) -> Self {
        assert!(nominal_voltage > 0.0, "nominal_voltage must be > 0");
        assert!(capacity_ah > 0.0, "capacity_ah must be > 0");
        assert!(
            internal_resistance >= 0.0,
            "internal_resistance must be >= 0"
        );
        Self {
            nominal_voltage,
            capacity_ah,
            internal_resistance,
            temperature_aware,
        }
    }

    /// Internal resistance at the given temperature.
    ///
    /// Grows exponentially as the cell cools below 25 °C and shrinks above.
    pub fn effective_resistance(&self, temperature_c: f64) -> f64 {
        if self.temperature_aware {
            self.internal_resistance * (RES_TEMP_COEFF * (25.0 - temperature_c)).exp()
        } else {
            self.internal_resistance
        }
    }

    /// Usable capacity at the given temperature.
    ///
    /// Derated linearly below 25 °C; the rated capacity applies at or above.
    pub fn effective_capacity(&self, temperature_c: f64) -> f64 {
        if self.temperature_aware && temperature_c < 25.0 {
            self.capacity_ah * (1.0 - CAP_TEMP_COEFF * (25.0 - temperature_c))
        } else {
            self.capacity_ah
        }
    }

    /// Terminal voltage after one timestep at the given current.
    pub fn next_voltage(&self, voltage: f64, current: f64, temperature_c: f64) -> f64 {
        voltage - current * self.effective_resistance(temperature_c)
    }

    /// State of charge after one timestep of Coulomb counting.
    ///
    /// Above 25 °C an exponential self-discharge penalty is applied on top
    /// of the counted charge. The result is clamped to [0, 100].
    ///
    /// # Arguments
    ///
    /// * `soc` - State of charge before the step (%)
    /// * `current` - Battery current (A, positive = discharging)
    /// * `temperature_c` - Battery temperature (°C)
    /// * `timestep_s` - Step duration (s)
    pub fn next_soc(&self, soc: f64, current: f64, temperature_c: f64, timestep_s: f64) -> f64 {
        let capacity = self.effective_capacity(temperature_c);
        let mut next = soc - current * timestep_s / (capacity * SECONDS_PER_HOUR) * 100.0;

        if self.temperature_aware && temperature_c > 25.0 {
            let rate_pct_per_day = SELF_DISCHARGE_PCT_PER_DAY
                * (SELF_DISCHARGE_GROWTH * (temperature_c - 25.0)).exp();
            next -= rate_pct_per_day * timestep_s / SECONDS_PER_DAY;
        }

        next.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Battery {
        Battery::new(24.0, 75.0, 0.05, false)
    }

    fn thermal() -> Battery {
        Battery::new(24.0, 75.0, 0.05, true)
    }

    #[test]
    fn discharge_lowers_terminal_voltage() {
        let b = plain();
        let v = b.next_voltage(24.0, 10.0, 25.0);
        assert!((v - 23.5).abs() < 1e-12);
    }

    #[test]
    fn charge_raises_terminal_voltage() {
        let b = plain();
        let v = b.next_voltage(24.0, -10.0, 25.0);
        assert!((v - 24.5).abs() < 1e-12);
    }

    #[test]
    fn soc_integrates_discharge_current() {
        let b = plain();
        // 7.5 A for one hour out of 75 Ah is exactly 10% of capacity.
        let soc = b.next_soc(50.0, 7.5, 25.0, 3600.0);
        assert!((soc - 40.0).abs() < 1e-9);
    }

    #[test]
    fn soc_integrates_charge_current() {
        let b = plain();
        let soc = b.next_soc(50.0, -7.5, 25.0, 3600.0);
        assert!((soc - 60.0).abs() < 1e-9);
    }

    #[test]
    fn soc_clamps_at_bounds() {
        let b = plain();
        assert_eq!(b.next_soc(99.9, -75.0, 25.0, 3600.0), 100.0);
        assert_eq!(b.next_soc(0.1, 75.0, 25.0, 3600.0), 0.0);
    }

    #[test]
    fn cold_cell_has_higher_resistance() {
        let b = thermal();
        let r_cold = b.effective_resistance(15.0);
        assert!((r_cold - 0.05 * (0.1_f64).exp()).abs() < 1e-12);
        assert!(r_cold > b.effective_resistance(25.0));
    }

    #[test]
    fn cold_cell_has_lower_capacity() {
        let b = thermal();
        let cap = b.effective_capacity(15.0);
        assert!((cap - 75.0 * 0.95).abs() < 1e-9);
        // No derate at or above 25 °C.
        assert_eq!(b.effective_capacity(25.0), 75.0);
        assert_eq!(b.effective_capacity(40.0), 75.0);
    }

    #[test]
    fn hot_cell_self_discharges() {
        let b = thermal();
        // No current, 35 °C: rate = 2 * exp(0.5) %/day over one day.
        let soc = b.next_soc(50.0, 0.0, 35.0, 86400.0);
        let expected = 50.0 - 2.0 * (0.5_f64).exp();
        assert!((soc - expected).abs() < 1e-9);
    }

    #[test]
    fn no_self_discharge_at_or_below_25c() {
        let b = thermal();
        assert_eq!(b.next_soc(50.0, 0.0, 25.0, 86400.0), 50.0);
        assert_eq!(b.next_soc(50.0, 0.0, 10.0, 86400.0), 50.0);
    }

    #[test]
    fn plain_battery_ignores_temperature() {
        let b = plain();
        assert_eq!(b.effective_resistance(-10.0), 0.05);
        assert_eq!(b.effective_capacity(-10.0), 75.0);
        assert_eq!(b.next_soc(50.0, 0.0, 40.0, 86400.0), 50.0);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        Battery::new(24.0, 0.0, 0.05, false);
    }
}
