//! In-memory record of the controller's charging decisions.

use charger_service_messages::{CableType, ChargeStatus, PropertyValue};

use crate::config::ChargerConfig;

/// Authoritative charger state, guarded by the wrapper together with the
/// hardware driver so property callers and the interrupt handler always
/// observe a fully committed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerState {
    /// Source currently attached. Changes only through the cable (ONLINE)
    /// transition and the interrupt auto-stop.
    pub cable_type: CableType,
    /// Derived from `cable_type`; false only when running from battery.
    pub is_charging: bool,
    /// Target fast-charging current in mA.
    pub charging_current_ma: PropertyValue,
    /// Effective input-current ceiling in mA.
    pub charging_current_max_ma: PropertyValue,
    /// Last charge status reported upstream, kept for bookkeeping.
    pub status: ChargeStatus,
    /// SIOP throttling level, an index into the SIOP input-current table.
    pub siop_level: usize,
}

impl ChargerState {
    pub const fn new() -> Self {
        Self {
            cable_type: CableType::Unknown,
            is_charging: false,
            charging_current_ma: 0,
            charging_current_max_ma: 0,
            status: ChargeStatus::Unknown,
            siop_level: 0,
        }
    }

    /// Apply a cable transition.
    ///
    /// Derives `is_charging` and recomputes both current targets from the
    /// configuration in one step, so they are never stale relative to the
    /// cable type. With SIOP throttling active, mains and misc sources take
    /// their input ceiling from the SIOP table instead of the cable entry;
    /// the fast-charging current always comes from the cable entry.
    pub(crate) fn apply_cable_type(&mut self, config: &ChargerConfig, cable: CableType) {
        self.cable_type = cable;
        self.is_charging = cable != CableType::Battery;

        let currents = config.currents(cable);
        self.charging_current_max_ma = if config.siop_activated
            && matches!(cable, CableType::Mains | CableType::Misc)
        {
            // A throttling level beyond the platform table falls back to
            // the unthrottled cable limit.
            config
                .siop_level_current_ma(self.siop_level)
                .unwrap_or(currents.input_current_limit_ma)
        } else {
            currents.input_current_limit_ma
        };
        self.charging_current_ma = currents.fast_charging_current_ma;
    }
}

impl Default for ChargerState {
    fn default() -> Self {
        Self::new()
    }
}
