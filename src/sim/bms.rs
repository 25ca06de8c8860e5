//! Battery management: protection checks that clamp the commanded current.

use std::fmt;

/// Upper battery temperature limit (°C).
const TEMP_MAX_C: f64 = 45.0;
/// Lower battery temperature limit for charging (°C).
const TEMP_MIN_C: f64 = 0.0;
/// SOC above which charge current is tapered (%).
const SOC_HIGH_PCT: f64 = 95.0;
/// SOC below which discharge current is tapered (%).
const SOC_LOW_PCT: f64 = 10.0;
/// Trickle-charge floor as a fraction of the max charge current.
const TRICKLE_FRACTION: f64 = 0.05;
/// Discharge cap at low SOC as a fraction of the max discharge current.
const LOW_SOC_DISCHARGE_FRACTION: f64 = 0.2;
/// Charge-current multiple treated as a reverse-polarity fault.
const REVERSE_CHARGE_FACTOR: f64 = 1.5;

/// Overvoltage threshold scaling on the nominal voltage.
const OVERVOLTAGE_SCALE: f64 = 1.2;
/// Undervoltage threshold scaling on the nominal voltage.
const UNDERVOLTAGE_SCALE: f64 = 0.875;
/// Max charge current as a fraction of capacity (A per Ah).
const CHARGE_C_RATE: f64 = 0.5;
/// Max discharge current as a fraction of capacity (A per Ah).
const DISCHARGE_C_RATE: f64 = 1.0;

/// One independent boolean per protection check.
///
/// Multiple flags can be raised at once; which check determined the final
/// current override is carried separately by [`BmsStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtectionFlags {
    pub overvoltage: bool,
    pub undervoltage: bool,
    pub overcurrent_charge: bool,
    pub overcurrent_discharge: bool,
    pub overtemperature: bool,
    pub undertemperature: bool,
    pub high_soc: bool,
    pub low_soc: bool,
    pub reverse_polarity: bool,
}

impl ProtectionFlags {
    /// Whether any protection condition is raised.
    pub fn any(&self) -> bool {
        self.overvoltage
            || self.undervoltage
            || self.overcurrent_charge
            || self.overcurrent_discharge
            || self.overtemperature
            || self.undertemperature
            || self.high_soc
            || self.low_soc
            || self.reverse_polarity
    }

    /// Packs the nine flags into a bitfield, check 1 in the lowest bit.
    pub fn bits(&self) -> u16 {
        (self.overvoltage as u16)
            | (self.undervoltage as u16) << 1
            | (self.overcurrent_charge as u16) << 2
            | (self.overcurrent_discharge as u16) << 3
            | (self.overtemperature as u16) << 4
            | (self.undertemperature as u16) << 5
            | (self.high_soc as u16) << 6
            | (self.low_soc as u16) << 7
            | (self.reverse_polarity as u16) << 8
    }
}

/// Which protection check produced the final current override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BmsStatus {
    #[default]
    Normal,
    Overvoltage,
    Undervoltage,
    ChargeCurrentLimit,
    DischargeCurrentLimit,
    Overtemperature,
    Undertemperature,
    ReversePolarity,
    HighSocLimit,
    LowSocLimit,
}

impl BmsStatus {
    /// Whether the status indicates an active override.
    pub fn is_normal(&self) -> bool {
        matches!(self, BmsStatus::Normal)
    }
}

impl fmt::Display for BmsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BmsStatus::Normal => "Normal",
            BmsStatus::Overvoltage => "Overvoltage Protection",
            BmsStatus::Undervoltage => "Undervoltage Protection",
            BmsStatus::ChargeCurrentLimit => "Charge Current Limiting",
            BmsStatus::DischargeCurrentLimit => "Discharge Current Limiting",
            BmsStatus::Overtemperature => "Overtemperature Protection",
            BmsStatus::Undertemperature => "Undertemperature Protection",
            BmsStatus::ReversePolarity => "Reverse Polarity Protection",
            BmsStatus::HighSocLimit => "High SOC Current Limiting",
            BmsStatus::LowSocLimit => "Low SOC Current Limiting",
        };
        f.write_str(label)
    }
}

/// Result of one protection evaluation.
#[derive(Debug, Clone, Copy)]
pub struct BmsDecision {
    /// Current after all overrides (A, negative = charging).
    pub limited_current: f64,
    /// The check that wrote the final override, or `Normal`.
    pub status: BmsStatus,
    /// All raised conditions, independent of the final status.
    pub flags: ProtectionFlags,
}

/// Protection state machine over voltage/current/temperature/SOC limits.
///
/// All thresholds derive from the nominal voltage and rated capacity. The
/// evaluation is a pure clamp-and-report function: it always terminates and
/// never fails.
#[derive(Debug, Clone)]
pub struct Bms {
    /// Nominal battery voltage (V), must be 24 or 48.
    pub nominal_voltage: f64,
    /// Rated battery capacity (Ah).
    pub capacity_ah: f64,
}

impl Bms {
    /// Creates a protection evaluator for a battery bank.
    ///
    /// # Panics
    ///
    /// Panics if the nominal voltage is not 24 or 48, or the capacity is
    /// non-positive. Configuration validation rejects both earlier.
    pub fn new(nominal_voltage: f64, capacity_ah: f64) -> Self {
        assert!(
            nominal_voltage == 24.0 || nominal_voltage == 48.0,
            "nominal_voltage must be 24 or 48"
        );
        assert!(capacity_ah > 0.0, "capacity_ah must be > 0");
        Self {
            nominal_voltage,
            capacity_ah,
        }
    }

    /// Overvoltage cutoff (V).
    pub fn overvoltage_threshold(&self) -> f64 {
        OVERVOLTAGE_SCALE * self.nominal_voltage
    }

    /// Undervoltage cutoff (V).
    pub fn undervoltage_threshold(&self) -> f64 {
        UNDERVOLTAGE_SCALE * self.nominal_voltage
    }

    /// Maximum charge current magnitude (A).
    pub fn max_charge_current(&self) -> f64 {
        CHARGE_C_RATE * self.capacity_ah
    }

    /// Maximum discharge current (A).
    pub fn max_discharge_current(&self) -> f64 {
        DISCHARGE_C_RATE * self.capacity_ah
    }

    /// Evaluates all nine protection checks against a commanded current.
    ///
    /// Every check tests its condition against the commanded operating point
    /// and, when raised, overwrites the limited current and status with its
    /// own override. Checks run in a fixed order, so on conflict the last
    /// raised check decides both — a deliberate, reproducible priority. The
    /// flags report every raised condition regardless of which check wrote
    /// last.
    ///
    /// # Arguments
    ///
    /// * `voltage` - Battery terminal voltage (V)
    /// * `current` - Commanded current (A, negative = charging)
    /// * `soc` - State of charge (%)
    /// * `temperature_c` - Battery temperature (°C)
    pub fn evaluate(&self, voltage: f64, current: f64, soc: f64, temperature_c: f64) -> BmsDecision {
        let max_charge = self.max_charge_current();
        let max_discharge = self.max_discharge_current();
        let charging = current < 0.0;
        let discharging = current > 0.0;

        let flags = ProtectionFlags {
            overvoltage: voltage >= self.overvoltage_threshold() && charging,
            undervoltage: voltage <= self.undervoltage_threshold() && discharging,
            overcurrent_charge: current < -max_charge,
            overcurrent_discharge: current > max_discharge,
            overtemperature: temperature_c >= TEMP_MAX_C,
            undertemperature: temperature_c <= TEMP_MIN_C && charging,
            high_soc: soc >= SOC_HIGH_PCT && charging,
            low_soc: soc <= SOC_LOW_PCT && discharging,
            reverse_polarity: voltage < 0.0
                || (voltage > 0.0 && current < -REVERSE_CHARGE_FACTOR * max_charge),
        };

        let mut limited = current;
        let mut status = BmsStatus::Normal;

        if flags.overvoltage {
            limited = 0.0;
            status = BmsStatus::Overvoltage;
        }
        if flags.undervoltage {
            limited = 0.0;
            status = BmsStatus::Undervoltage;
        }
        if flags.overcurrent_charge {
            limited = -max_charge;
            status = BmsStatus::ChargeCurrentLimit;
        }
        if flags.overcurrent_discharge {
            limited = max_discharge;
            status = BmsStatus::DischargeCurrentLimit;
        }
        if flags.overtemperature {
            limited = 0.0;
            status = BmsStatus::Overtemperature;
        }
        if flags.undertemperature {
            limited = 0.0;
            status = BmsStatus::Undertemperature;
        }
        if flags.reverse_polarity {
            limited = 0.0;
            status = BmsStatus::ReversePolarity;
        }
        if flags.high_soc {
            // Taper toward zero as SOC approaches 100%, with a trickle floor.
            let tapered = current * (100.0 - soc) / (100.0 - SOC_HIGH_PCT);
            limited = tapered.min(-TRICKLE_FRACTION * max_charge);
            status = BmsStatus::HighSocLimit;
        }
        if flags.low_soc {
            let tapered = current * soc / SOC_LOW_PCT;
            limited = tapered.min(LOW_SOC_DISCHARGE_FRACTION * max_discharge);
            status = BmsStatus::LowSocLimit;
        }

        BmsDecision {
            limited_current: limited,
            status,
            flags,
        }
    }
}
