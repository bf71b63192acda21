//! Per-platform charger configuration.
//!
//! The configuration is an immutable snapshot bound to the wrapper at
//! construction. Detection strategies arrive here already decoded into
//! enums and bitflags, so the event handler never re-interprets raw
//! platform integers.

use bitflags::bitflags;
use embassy_time::Duration;

use charger_service_messages::{CableType, PropertyValue};

use crate::trace;

/// Capacity of the SIOP input-current table.
pub const SIOP_LEVELS_MAX: usize = 8;

/// Charging-current table entry for one cable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargingCurrents {
    /// Input current limit in mA.
    pub input_current_limit_ma: PropertyValue,
    /// Fast charging current in mA.
    pub fast_charging_current_ma: PropertyValue,
    /// Full-charge termination current for the first charge stage in mA.
    pub full_check_current_1st_ma: PropertyValue,
    /// Full-charge termination current for the second charge stage in mA.
    pub full_check_current_2nd_ma: PropertyValue,
}

impl ChargingCurrents {
    /// Entry for sources that must not charge.
    pub const fn none() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub const fn new(
        input_current_limit_ma: PropertyValue,
        fast_charging_current_ma: PropertyValue,
        full_check_current_1st_ma: PropertyValue,
        full_check_current_2nd_ma: PropertyValue,
    ) -> Self {
        Self {
            input_current_limit_ma,
            fast_charging_current_ma,
            full_check_current_1st_ma,
            full_check_current_2nd_ma,
        }
    }
}

bitflags! {
    /// Optional charger behaviors selected per platform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChargerFunctions: u32 {
        /// Never let SIOP throttling push the charging current below the
        /// USB-tier fast-charging current.
        const MINIMUM_SIOP_CHARGING_CURRENT = 1 << 0;
    }
}

bitflags! {
    /// Signal sources that establish cable presence and type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CableCheckSources: u32 {
        /// The host or battery driver reports cable changes itself.
        const EXTERNAL = 1 << 0;
        /// A dedicated detect GPIO raises an interrupt.
        const GPIO_INTERRUPT = 1 << 1;
        /// The charging IC interrupt reports cable changes.
        const CHARGER_INTERRUPT = 1 << 2;
        /// Cable state is polled periodically.
        const POLLING = 1 << 3;
    }
}

/// How charge completion is detected for a charge stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FullCheckMode {
    /// Completion is not detected on this stage.
    #[default]
    None,
    /// Termination-current readings from the fuel gauge.
    FuelGaugeCurrent,
    /// Fuel-gauge state of charge crossing the full threshold.
    StateOfCharge,
    /// The charging IC interrupt reports a Full status.
    ChargerInterrupt,
}

/// How OVP/UVLO faults are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OvpUvloCheckMode {
    /// Faults are not monitored by this controller.
    #[default]
    None,
    /// Charger fault registers are polled periodically.
    ChargerPolling,
    /// Input voltage is sampled through an ADC.
    AdcPolling,
    /// The charging IC interrupt reports fault transitions.
    ChargerInterrupt,
}

/// Static per-platform charger configuration.
#[derive(Clone)]
pub struct ChargerConfig {
    /// Charging-current table indexed by cable type.
    pub charging_current: [ChargingCurrents; CableType::COUNT],
    /// Input-current ceilings indexed by SIOP throttling level, in mA.
    pub siop_input_current_ma: heapless::Vec<PropertyValue, SIOP_LEVELS_MAX>,
    /// Whether SIOP throttling overrides the input current limit for
    /// mains/misc sources.
    pub siop_activated: bool,
    /// Optional charger behaviors.
    pub functions: ChargerFunctions,
    /// Full-charge detection for the first charge stage.
    pub full_check: FullCheckMode,
    /// Full-charge detection for the second charge stage.
    pub full_check_2nd: FullCheckMode,
    /// OVP/UVLO fault detection mode.
    pub ovp_uvlo_check: OvpUvloCheckMode,
    /// Signal sources that establish cable presence.
    pub cable_check: CableCheckSources,
    /// Settling time between the interrupt edge and the handler pass, for
    /// variants whose status registers lag the interrupt.
    pub interrupt_settle_delay: Option<Duration>,
    /// Settling time before the health query in the handler pass.
    pub health_settle_delay: Option<Duration>,
    /// Force a transition back to battery and reprogram the cable state
    /// when the interrupt reports Full.
    pub full_interrupt_auto_stop: bool,
    /// Expose the float-voltage property for swelling protection.
    pub swelling_protection: bool,
    /// Expose the raw fuel-gauge telemetry properties.
    pub fuel_gauge_telemetry: bool,
    /// Receiver for cable-check results when no battery consumer is
    /// registered.
    pub check_cable_result: fn(CableType),
}

impl ChargerConfig {
    /// Charging-current table entry for a cable type.
    pub fn currents(&self, cable: CableType) -> &ChargingCurrents {
        const NONE: ChargingCurrents = ChargingCurrents::none();
        self.charging_current.get(cable as usize).unwrap_or(&NONE)
    }

    /// SIOP input-current ceiling for a throttling level, if the level is
    /// within the platform table.
    pub fn siop_level_current_ma(&self, level: usize) -> Option<PropertyValue> {
        self.siop_input_current_ma.get(level).copied()
    }
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            // Unknown, Battery, Ups, Mains, Usb, Misc, Wireless
            charging_current: [
                ChargingCurrents::none(),
                ChargingCurrents::none(),
                ChargingCurrents::new(460, 460, 200, 100),
                ChargingCurrents::new(1000, 1300, 200, 100),
                ChargingCurrents::new(460, 460, 200, 100),
                ChargingCurrents::new(700, 700, 200, 100),
                ChargingCurrents::new(650, 750, 200, 100),
            ],
            siop_input_current_ma: heapless::Vec::from_slice(&[800, 800, 800]).unwrap_or_default(),
            siop_activated: false,
            functions: ChargerFunctions::empty(),
            full_check: FullCheckMode::ChargerInterrupt,
            full_check_2nd: FullCheckMode::ChargerInterrupt,
            ovp_uvlo_check: OvpUvloCheckMode::ChargerInterrupt,
            cable_check: CableCheckSources::empty(),
            interrupt_settle_delay: None,
            health_settle_delay: None,
            full_interrupt_auto_stop: false,
            swelling_protection: false,
            fuel_gauge_telemetry: false,
            check_cable_result: discard_cable_result,
        }
    }
}

fn discard_cable_result(cable: CableType) {
    trace!("Unhandled cable check result: {:?}", cable);
}
