//! Single-diode photovoltaic array model.

/// Boltzmann constant (J/K).
const BOLTZMANN: f64 = 1.380649e-23;
/// Elementary charge (C).
const ELEMENTARY_CHARGE: f64 = 1.602176634e-19;
/// Diode ideality factor.
const IDEALITY: f64 = 1.2;
/// Short-circuit current temperature coefficient (1/°C).
const ISC_TEMP_COEFF: f64 = 0.0017;
/// Open-circuit voltage temperature coefficient (1/°C).
const VOC_TEMP_COEFF: f64 = 0.0023;
/// Standard test condition irradiance (W/m²).
const STC_IRRADIANCE: f64 = 1000.0;

/// A photovoltaic array modeled as a single-diode current source.
///
/// Voltage/current ratings are array-level: `voc` and `vmp` span the full
/// series string (`series_cells` cells), while `isc` and `imp` are per-string
/// and scale with `parallel_strings`.
///
/// # Sign Convention
/// Output current is the current delivered by the array, clamped to >= 0
/// (no reverse conduction through the array).
#[derive(Debug, Clone)]
pub struct PvArray {
    /// Open-circuit voltage at STC (V).
    pub voc: f64,

    /// Short-circuit current per string at STC (A).
    pub isc: f64,

    /// Maximum-power-point voltage at STC (V).
    pub vmp: f64,

    /// Maximum-power-point current per string at STC (A).
    pub imp: f64,

    /// Number of series-connected cells per string.
    pub series_cells: u32,

    /// Number of parallel strings.
    pub parallel_strings: u32,
}

impl PvArray {
    /// Creates a new PV array with the specified ratings.
    ///
    /// # Panics
    ///
    /// Panics if any rating is non-positive, if the MPP point does not sit
    /// inside the (0, voc) x (0, isc] rectangle, or if a cell count is zero.
    pub fn new(
        voc: f64,
        isc: f64,
        vmp: f64,
        imp: f64,
        series_cells: u32,
        parallel_strings: u32,
    ) -> Self {
        assert!(voc > 0.0 && isc > 0.0, "voc and isc must be > 0");
        assert!(vmp > 0.0 && vmp < voc, "vmp must be in (0, voc)");
        assert!(imp > 0.0 && imp <= isc, "imp must be in (0, isc]");
        assert!(series_cells >= 1 && parallel_strings >= 1);
        Self {
            voc,
            isc,
            vmp,
            imp,
            series_cells,
            parallel_strings,
        }
    }

    /// Computes the array output current at an operating voltage.
    ///
    /// Applies linear temperature corrections to the short-circuit current
    /// and open-circuit voltage, derives the diode saturation current from
    /// the corrected open-circuit point, and evaluates the single-diode
    /// equation scaled by the number of parallel strings.
    ///
    /// # Arguments
    ///
    /// * `voltage` - Array terminal voltage (V)
    /// * `irradiance` - Plane-of-array irradiance (W/m²)
    /// * `temperature_c` - Cell temperature (°C), must be > -273.15
    ///
    /// # Returns
    ///
    /// Output current (A), clamped to >= 0.
    pub fn current(&self, voltage: f64, irradiance: f64, temperature_c: f64) -> f64 {
        assert!(
            temperature_c > -273.15,
            "cell temperature must be above absolute zero"
        );

        let isc_t = self.isc
            * (irradiance / STC_IRRADIANCE)
            * (1.0 + ISC_TEMP_COEFF * (temperature_c - 25.0));
        let voc_t = self.voc * (1.0 - VOC_TEMP_COEFF * (temperature_c - 25.0));

        let thermal_voltage =
            self.series_cells as f64 * BOLTZMANN * (temperature_c + 273.15) / ELEMENTARY_CHARGE;
        let a_vt = IDEALITY * thermal_voltage;

        let saturation = isc_t / ((voc_t / a_vt).exp() - 1.0);
        let current =
            self.parallel_strings as f64 * (isc_t - saturation * ((voltage / a_vt).exp() - 1.0));

        current.max(0.0)
    }

    /// Array power available at the maximum power point for an irradiance.
    ///
    /// Scales the rated MPP power linearly with irradiance. Used as the
    /// denominator of the tracking-efficiency metric.
    pub fn available_power(&self, irradiance: f64) -> f64 {
        self.vmp * self.imp * self.parallel_strings as f64 * (irradiance / STC_IRRADIANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array() -> PvArray {
        PvArray::new(42.0, 10.0, 35.0, 9.0, 20, 2)
    }

    #[test]
    fn short_circuit_current_scales_with_parallel_strings() {
        let pv = array();
        // At V=0 the diode term vanishes exactly: I = Np * Isc_T.
        let i = pv.current(0.0, 1000.0, 25.0);
        assert!((i - 20.0).abs() < 1e-9);
    }

    #[test]
    fn open_circuit_current_is_zero() {
        let pv = array();
        // Voc_T at 25°C equals the rated Voc; the diode term cancels Isc_T.
        let i = pv.current(42.0, 1000.0, 25.0);
        assert!(i.abs() < 1e-6, "expected ~0 at open circuit, got {i}");
    }

    #[test]
    fn short_circuit_current_scales_with_irradiance() {
        let pv = array();
        let full = pv.current(0.0, 1000.0, 25.0);
        let half = pv.current(0.0, 500.0, 25.0);
        assert!((half - full / 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_irradiance_produces_zero_current() {
        let pv = array();
        assert_eq!(pv.current(0.0, 0.0, 25.0), 0.0);
        assert_eq!(pv.current(35.0, 0.0, 25.0), 0.0);
    }

    #[test]
    fn current_is_monotonically_non_increasing_in_voltage() {
        let pv = array();
        let mut prev = f64::INFINITY;
        for step in 0..=42 {
            let v = step as f64;
            let i = pv.current(v, 1000.0, 25.0);
            assert!(i <= prev + 1e-12, "current rose at V={v}");
            prev = i;
        }
    }

    #[test]
    fn warmer_cell_raises_short_circuit_current() {
        let pv = array();
        let cool = pv.current(0.0, 1000.0, 25.0);
        let warm = pv.current(0.0, 1000.0, 50.0);
        assert!(warm > cool);
    }

    #[test]
    fn output_clamped_beyond_open_circuit() {
        let pv = array();
        assert_eq!(pv.current(60.0, 1000.0, 25.0), 0.0);
    }

    #[test]
    fn available_power_scales_with_irradiance() {
        let pv = array();
        assert!((pv.available_power(1000.0) - 35.0 * 9.0 * 2.0).abs() < 1e-9);
        assert!((pv.available_power(500.0) - 35.0 * 9.0).abs() < 1e-9);
        assert_eq!(pv.available_power(0.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn vmp_above_voc_panics() {
        PvArray::new(42.0, 10.0, 43.0, 9.0, 20, 2);
    }

    #[test]
    #[should_panic]
    fn zero_parallel_strings_panics() {
        PvArray::new(42.0, 10.0, 35.0, 9.0, 20, 0);
    }
}
