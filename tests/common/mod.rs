//! Shared test fixtures for integration tests.

use pv_charge_sim::devices::{Battery, BatteryThermal, PvArray, ResistiveLoad};
use pv_charge_sim::sim::bms::Bms;
use pv_charge_sim::sim::converter::ModeArbiter;
use pv_charge_sim::sim::engine::{Engine, InitialConditions};
use pv_charge_sim::sim::mppt::MpptController;
use pv_charge_sim::sim::perturb::Perturbation;
use pv_charge_sim::sim::types::{IrradianceProfile, RunMode, SimConfig};

/// Default timing: 5 s at 10 ms per tick, seed 42.
pub fn default_config(mode: RunMode) -> SimConfig {
    SimConfig::new(5.0, 0.01, 42, mode)
}

/// The baseline 420 W array: 42 Voc / 10 Isc, two parallel strings.
pub fn default_pv() -> PvArray {
    PvArray::new(42.0, 10.0, 35.0, 9.0, 20, 2)
}

/// The baseline 24 V / 75 Ah bank.
pub fn default_battery(temperature_aware: bool) -> Battery {
    Battery::new(24.0, 75.0, 0.05, temperature_aware)
}

pub fn default_thermal() -> BatteryThermal {
    BatteryThermal::new(0.05, 2.0, 1200.0, 25.0)
}

pub fn default_bms() -> Bms {
    Bms::new(24.0, 75.0)
}

pub fn default_arbiter() -> ModeArbiter {
    ModeArbiter::new(25.0, 50.0, 24.0, 48.0, 20.0, 95.0)
}

/// 24 V at 50% SOC and ambient temperature, duty held at 0.5.
pub fn default_init() -> InitialConditions {
    InitialConditions::new(24.0, 50.0, 25.0, 0.5)
}

/// Builds the default engine around an irradiance profile and perturbation
/// source.
pub fn engine_with<P: Perturbation>(
    mode: RunMode,
    profile: IrradianceProfile,
    perturb: P,
) -> Engine<P> {
    Engine::new(
        default_config(mode),
        default_pv(),
        25.0,
        default_battery(mode == RunMode::Extended),
        default_thermal(),
        default_bms(),
        ResistiveLoad::new(10.0),
        default_arbiter(),
        MpptController::new(0.01),
        profile,
        default_init(),
        perturb,
    )
}
