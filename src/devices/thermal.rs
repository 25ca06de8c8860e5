//! Lumped thermal-capacitance model for the battery bank.

/// Lower clamp on modeled battery temperature (°C).
pub const TEMP_MIN_C: f64 = -20.0;
/// Upper clamp on modeled battery temperature (°C).
pub const TEMP_MAX_C: f64 = 60.0;

/// Forward-Euler thermal model: Joule heating against ambient heat exchange.
///
/// `T' = T + Ts * (I²·R_int - (T - T_ambient)/R_th) / C_th`, clamped to
/// [`TEMP_MIN_C`, `TEMP_MAX_C`].
#[derive(Debug, Clone)]
pub struct BatteryThermal {
    /// Internal resistance used for Joule heating (Ω).
    pub internal_resistance: f64,

    /// Thermal resistance to ambient (K/W).
    pub thermal_resistance: f64,

    /// Lumped thermal capacitance (J/K).
    pub thermal_capacitance: f64,

    /// Ambient temperature (°C).
    pub ambient_c: f64,
}

impl BatteryThermal {
    /// Creates a new lumped thermal model.
    ///
    /// # Panics
    ///
    /// Panics if a resistance or the capacitance is non-positive.
    pub fn new(
        internal_resistance: f64,
        thermal_resistance: f64,
        thermal_capacitance: f64,
        ambient_c: f64,
    ) -> Self {
        assert!(internal_resistance >= 0.0);
        assert!(thermal_resistance > 0.0, "thermal_resistance must be > 0");
        assert!(thermal_capacitance > 0.0, "thermal_capacitance must be > 0");
        Self {
            internal_resistance,
            thermal_resistance,
            thermal_capacitance,
            ambient_c,
        }
    }

    /// Battery temperature after one timestep at the given current.
    pub fn next_temperature(&self, temperature_c: f64, current: f64, timestep_s: f64) -> f64 {
        let heating = current * current * self.internal_resistance;
        let exchange = (temperature_c - self.ambient_c) / self.thermal_resistance;
        let next = temperature_c + timestep_s * (heating - exchange) / self.thermal_capacitance;
        next.clamp(TEMP_MIN_C, TEMP_MAX_C)
    }

    /// Equilibrium temperature for a sustained current, ignoring the clamp.
    pub fn steady_state(&self, current: f64) -> f64 {
        self.ambient_c + current * current * self.internal_resistance * self.thermal_resistance
    }
}
