//! Property interface and interrupt handling for a charging IC.

use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;

use charger_service_messages::{
    BatteryNotification, CableType, ChargeStatus, ChargerHealth, ChargingMode, PropertyId,
    PropertyValue,
};

use crate::GlobalRawMutex;
use crate::battery::BatteryLink;
use crate::config::{CableCheckSources, ChargerConfig, ChargerFunctions, FullCheckMode, OvpUvloCheckMode};
use crate::controller::ChargeController;
use crate::state::ChargerState;
use crate::{debug, error, info, trace};

/// Property interface errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerError {
    /// Property is not recognized by this controller.
    Unsupported,
    /// The hardware access port reported a failure.
    HardwareUnavailable,
}

/// Physical destination of a logical property write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteTarget {
    /// Fast-charge current register, through the standard charger trait.
    FastChargeCurrent,
    /// Float-voltage register, through the standard charger trait.
    FloatVoltage,
    /// Raw property write on the hardware port, under the given tag.
    Port(PropertyId),
}

/// Logical property to physical write translation.
///
/// The SIOP percentage property programs the fast-charge current, exactly
/// like a plain charging-current write. CURRENT_MAX keeps its own tag on
/// the port even though it shares the CURRENT_NOW code path: the input
/// current limit is the only knob used to steer the charge current.
fn write_target(property: PropertyId) -> WriteTarget {
    match property {
        PropertyId::CurrentAvg | PropertyId::ChargeFullDesign => WriteTarget::FastChargeCurrent,
        PropertyId::VoltageMax => WriteTarget::FloatVoltage,
        other => WriteTarget::Port(other),
    }
}

fn register_units(value: PropertyValue) -> u16 {
    value.clamp(0, PropertyValue::from(u16::MAX)) as u16
}

struct Inner<C> {
    controller: C,
    state: ChargerState,
}

/// Charger service wrapper binding a charging IC driver to the property
/// interface and the deferred interrupt handler.
///
/// Property calls and interrupt passes serialize on one mutex, so readers
/// always observe a fully committed state and a cable transition can never
/// interleave with a health or full-charge notification.
pub struct Wrapper<'a, C: ChargeController> {
    inner: Mutex<GlobalRawMutex, Inner<C>>,
    config: ChargerConfig,
    battery: Option<&'a BatteryLink>,
    interrupt: Signal<GlobalRawMutex, ()>,
}

impl<'a, C: ChargeController> Wrapper<'a, C> {
    pub fn new(controller: C, config: ChargerConfig, battery: Option<&'a BatteryLink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                controller,
                state: ChargerState::new(),
            }),
            config,
            battery,
            interrupt: Signal::new(),
        }
    }

    /// Snapshot of the current charger state.
    pub async fn state(&self) -> ChargerState {
        self.inner.lock().await.state
    }

    /// Set the SIOP throttling level applied on the next cable transition.
    pub async fn set_siop_level(&self, level: usize) {
        self.inner.lock().await.state.siop_level = level;
    }

    /// Signal a charging IC interrupt.
    ///
    /// Never blocks and performs no hardware access, so it may be called
    /// straight from the interrupt context. The actual hardware polling
    /// happens later on the [`Wrapper::process`] execution context.
    pub fn notify_interrupt(&self) {
        self.interrupt.signal(());
    }

    /// Run the interrupt side of the service.
    ///
    /// Waits for interrupt signals and runs one handler pass per signal,
    /// after the configured settling delay on hardware variants whose
    /// registers lag the interrupt edge.
    pub async fn process(&self) {
        loop {
            self.interrupt.wait().await;
            if let Some(delay) = self.config.interrupt_settle_delay {
                Timer::after(delay).await;
            }
            self.handle_interrupt().await;
        }
    }

    /// Read a charger property.
    ///
    /// `value` carries the request argument for properties that take one
    /// (the SIOP percentage for [`PropertyId::ChargeFullDesign`]) and is
    /// ignored otherwise.
    pub async fn get_property(
        &self,
        property: PropertyId,
        value: PropertyValue,
    ) -> Result<PropertyValue, ChargerError> {
        trace!("Charger property {:?} read", property);
        let inner = &mut *self.inner.lock().await;
        match property {
            // Input current limit lives in service state, no hardware trip.
            PropertyId::CurrentMax => Ok(inner.state.charging_current_max_ma),
            PropertyId::Online
            | PropertyId::Status
            | PropertyId::ChargeType
            | PropertyId::Health
            | PropertyId::CurrentAvg
            | PropertyId::CurrentNow => inner
                .controller
                .get_property(property)
                .await
                .map_err(|_| ChargerError::HardwareUnavailable),
            PropertyId::PowerStatus | PropertyId::ChargeNow | PropertyId::StatusFg => {
                if self.config.fuel_gauge_telemetry {
                    inner
                        .controller
                        .get_property(property)
                        .await
                        .map_err(|_| ChargerError::HardwareUnavailable)
                } else {
                    Err(ChargerError::Unsupported)
                }
            }
            // SIOP percentage query: charging current at `value` percent.
            PropertyId::ChargeFullDesign => Ok(inner.state.charging_current_ma * value / 100),
            PropertyId::VoltageMax => {
                if !self.config.swelling_protection {
                    return Err(ChargerError::Unsupported);
                }
                match inner.controller.get_property(property).await {
                    Ok(voltage) => Ok(voltage),
                    Err(_) => {
                        error!("Float voltage read failed");
                        Ok(value)
                    }
                }
            }
            PropertyId::ChargingEnabled => Ok(PropertyValue::from(inner.state.is_charging)),
        }
    }

    /// Read a charger property by raw code, for callers speaking the
    /// integer property encoding. Unknown codes fail with
    /// [`ChargerError::Unsupported`].
    pub async fn get_property_raw(
        &self,
        code: PropertyValue,
        value: PropertyValue,
    ) -> Result<PropertyValue, ChargerError> {
        match PropertyId::try_from(code) {
            Ok(property) => self.get_property(property, value).await,
            Err(_) => Err(ChargerError::Unsupported),
        }
    }

    /// Write a charger property.
    pub async fn set_property(
        &self,
        property: PropertyId,
        value: PropertyValue,
    ) -> Result<(), ChargerError> {
        trace!("Charger property {:?} write: {}", property, value);
        let inner = &mut *self.inner.lock().await;
        match property {
            PropertyId::Status => {
                // Stored as-is for bookkeeping; codes outside the known
                // set degrade to Unknown.
                inner.state.status = ChargeStatus::try_from(value).unwrap_or_default();
                Ok(())
            }
            PropertyId::Online => {
                let cable =
                    CableType::try_from(value).map_err(|_| ChargerError::Unsupported)?;
                debug!("Cable transition to {:?}", cable);
                // State commits before the hardware write and is not rolled
                // back if the write fails.
                inner.state.apply_cable_type(&self.config, cable);
                Self::write_hardware(inner, property, value).await
            }
            PropertyId::CurrentMax => {
                inner.state.charging_current_max_ma = value;
                Self::write_hardware(inner, property, value).await
            }
            PropertyId::CurrentNow => Self::write_hardware(inner, property, value).await,
            PropertyId::CurrentAvg => {
                inner.state.charging_current_ma = value;
                Self::write_hardware(inner, property, value).await
            }
            PropertyId::ChargeFullDesign => {
                // SIOP throttling: program the charging current scaled to
                // `value` percent without touching the stored setting.
                let mut scaled = inner.state.charging_current_ma * value / 100;
                if self
                    .config
                    .functions
                    .contains(ChargerFunctions::MINIMUM_SIOP_CHARGING_CURRENT)
                {
                    let usb_fast = self.config.currents(CableType::Usb).fast_charging_current_ma;
                    if scaled > 0 && scaled < usb_fast {
                        scaled = usb_fast;
                    }
                }
                if Self::write_hardware(inner, property, scaled).await.is_err() {
                    error!("SIOP charging current write failed");
                }
                Ok(())
            }
            PropertyId::VoltageMax => {
                if !self.config.swelling_protection {
                    return Err(ChargerError::Unsupported);
                }
                info!("Float voltage: {}", value);
                if Self::write_hardware(inner, property, value).await.is_err() {
                    error!("Float voltage write failed");
                }
                Ok(())
            }
            PropertyId::ChargingEnabled => {
                if Self::write_hardware(inner, property, value).await.is_err() {
                    error!("Charging enable write failed");
                }
                Ok(())
            }
            PropertyId::ChargeType
            | PropertyId::Health
            | PropertyId::StatusFg
            | PropertyId::PowerStatus
            | PropertyId::ChargeNow => Err(ChargerError::Unsupported),
        }
    }

    /// Write a charger property by raw code. Unknown codes fail with
    /// [`ChargerError::Unsupported`].
    pub async fn set_property_raw(
        &self,
        code: PropertyValue,
        value: PropertyValue,
    ) -> Result<(), ChargerError> {
        match PropertyId::try_from(code) {
            Ok(property) => self.set_property(property, value).await,
            Err(_) => Err(ChargerError::Unsupported),
        }
    }

    /// Issue the physical write backing a logical property set.
    async fn write_hardware(
        inner: &mut Inner<C>,
        property: PropertyId,
        value: PropertyValue,
    ) -> Result<(), ChargerError> {
        match write_target(property) {
            WriteTarget::FastChargeCurrent => inner
                .controller
                .charging_current(register_units(value))
                .await
                .map(|_| ())
                .map_err(|_| ChargerError::HardwareUnavailable),
            WriteTarget::FloatVoltage => inner
                .controller
                .charging_voltage(register_units(value))
                .await
                .map(|_| ())
                .map_err(|_| ChargerError::HardwareUnavailable),
            WriteTarget::Port(tag) => inner
                .controller
                .set_property(tag, value)
                .await
                .map_err(|_| ChargerError::HardwareUnavailable),
        }
    }

    fn notify_battery(&self, notification: BatteryNotification) {
        match self.battery {
            Some(battery) => battery.notify(notification),
            None => error!("No battery consumer for {:?}", notification),
        }
    }

    /// One deferred interrupt pass: polls status, health and cable state
    /// and forwards validated transitions to the battery consumer. A
    /// hardware read failure aborts the rest of the pass; the next
    /// interrupt starts a fresh one.
    async fn handle_interrupt(&self) {
        info!("Charger interrupt");
        let inner = &mut *self.inner.lock().await;

        // The battery's charge stage decides which full-charge detection
        // applies. Without a consumer the controller is past first stage.
        let first_stage = match self.battery {
            Some(battery) => battery.charging_mode().await == ChargingMode::First,
            None => false,
        };
        let full_check = if first_stage {
            self.config.full_check
        } else {
            self.config.full_check_2nd
        };

        let status = match inner.controller.get_property(PropertyId::Status).await {
            Ok(raw) => raw,
            Err(_) => {
                error!("Charger status read failed, aborting interrupt handling");
                return;
            }
        };

        if full_check == FullCheckMode::ChargerInterrupt {
            match ChargeStatus::try_from(status) {
                Ok(ChargeStatus::Discharging) => error!("Interrupted but Discharging"),
                Ok(ChargeStatus::NotCharging) => error!("Interrupted but NOT Charging"),
                Ok(ChargeStatus::Charging) => error!("Interrupted but Charging"),
                Ok(ChargeStatus::Full) => {
                    info!("Interrupted by Full");
                    if self.config.full_interrupt_auto_stop {
                        // Defensive stop: this IC keeps sourcing until the
                        // cable state is reprogrammed.
                        inner.state.cable_type = CableType::Battery;
                        inner.state.is_charging = false;
                        if Self::write_hardware(
                            inner,
                            PropertyId::Online,
                            CableType::Battery.into(),
                        )
                        .await
                        .is_err()
                        {
                            error!("Charging disable error");
                        }
                    }
                    self.notify_battery(BatteryNotification::Status(ChargeStatus::Full));
                }
                Ok(ChargeStatus::Unknown) | Err(_) => error!("Invalid charger status"),
            }
        } else {
            info!("Charger status: {}", status);
        }

        if self.config.ovp_uvlo_check == OvpUvloCheckMode::ChargerInterrupt {
            if let Some(delay) = self.config.health_settle_delay {
                Timer::after(delay).await;
            }
            let health = match inner.controller.get_property(PropertyId::Health).await {
                Ok(raw) => raw,
                Err(_) => {
                    error!("Charger health read failed, aborting interrupt handling");
                    return;
                }
            };
            match ChargerHealth::try_from(health) {
                Ok(ChargerHealth::Overheat) | Ok(ChargerHealth::Cold) => {
                    error!("Interrupted but Hot/Cold")
                }
                Ok(ChargerHealth::Dead) => error!("Interrupted but Dead"),
                Ok(fault @ (ChargerHealth::Overvoltage | ChargerHealth::Undervoltage)) => {
                    info!("Interrupted by OVP/UVLO");
                    self.notify_battery(BatteryNotification::Health(fault));
                }
                Ok(ChargerHealth::UnspecifiedFailure) => error!("Interrupted but Unspec"),
                Ok(ChargerHealth::Good) => {
                    // Anomalous as an interrupt cause, but the recovery back
                    // to Good must stay visible upstream.
                    error!("Interrupted but Good");
                    self.notify_battery(BatteryNotification::Health(ChargerHealth::Good));
                }
                Ok(ChargerHealth::Unknown) | Err(_) => error!("Invalid charger health"),
            }
        }

        if self
            .config
            .cable_check
            .contains(CableCheckSources::CHARGER_INTERRUPT)
        {
            let online = match inner.controller.get_property(PropertyId::Online).await {
                Ok(raw) => raw,
                Err(_) => {
                    error!("Charger online read failed, aborting interrupt handling");
                    return;
                }
            };
            let cable = CableType::try_from(online).unwrap_or_default();
            match self.battery {
                Some(battery) => battery.notify(BatteryNotification::Online(cable)),
                None => (self.config.check_cable_result)(cable),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicI32, Ordering};

    use embassy_sync::once_lock::OnceLock;
    use tokio::time::Duration as HostDuration;

    use crate::mock::{MockChargerDriver, SharedMockState, shared_state};

    use super::*;

    fn wrapper<'a>(
        hardware: &'a SharedMockState,
        config: ChargerConfig,
        battery: Option<&'a BatteryLink>,
    ) -> Wrapper<'a, MockChargerDriver<'a>> {
        Wrapper::new(MockChargerDriver::new(hardware), config, battery)
    }

    /// Handler-only configuration: no full-charge, fault or cable
    /// detection unless a test opts in.
    fn quiet_config() -> ChargerConfig {
        ChargerConfig {
            full_check: FullCheckMode::None,
            full_check_2nd: FullCheckMode::None,
            ovp_uvlo_check: OvpUvloCheckMode::None,
            cable_check: CableCheckSources::empty(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn online_transition_updates_state_and_hardware() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::Online, CableType::Mains.into())
            .await
            .unwrap();

        let state = charger.state().await;
        assert_eq!(state.cable_type, CableType::Mains);
        assert!(state.is_charging);
        assert_eq!(state.charging_current_max_ma, 1000);
        assert_eq!(state.charging_current_ma, 1300);
        hardware.lock(|hw| {
            assert_eq!(
                hw.borrow().port_writes.as_slice(),
                [(PropertyId::Online, PropertyValue::from(CableType::Mains))]
            );
        });

        charger
            .set_property(PropertyId::Online, CableType::Battery.into())
            .await
            .unwrap();
        let state = charger.state().await;
        assert_eq!(state.cable_type, CableType::Battery);
        assert!(!state.is_charging);
        assert_eq!(state.charging_current_ma, 0);
    }

    #[tokio::test]
    async fn siop_throttling_overrides_the_input_ceiling() {
        let hardware = shared_state();
        let config = ChargerConfig {
            siop_activated: true,
            siop_input_current_ma: heapless::Vec::from_slice(&[800, 700, 450]).unwrap(),
            ..Default::default()
        };
        let charger = wrapper(&hardware, config, None);

        charger.set_siop_level(1).await;
        charger
            .set_property(PropertyId::Online, CableType::Mains.into())
            .await
            .unwrap();
        let state = charger.state().await;
        assert_eq!(state.charging_current_max_ma, 700);
        assert_eq!(state.charging_current_ma, 1300);

        // USB is never throttled through the SIOP table.
        charger
            .set_property(PropertyId::Online, CableType::Usb.into())
            .await
            .unwrap();
        assert_eq!(charger.state().await.charging_current_max_ma, 460);
    }

    #[tokio::test]
    async fn online_state_survives_hardware_failure() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().fail_set = Some(PropertyId::Online));
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        let result = charger
            .set_property(PropertyId::Online, CableType::Mains.into())
            .await;
        assert_eq!(result, Err(ChargerError::HardwareUnavailable));

        // The transition committed before the failed write.
        let state = charger.state().await;
        assert_eq!(state.cable_type, CableType::Mains);
        assert!(state.is_charging);
        assert_eq!(state.charging_current_max_ma, 1000);
        assert_eq!(state.charging_current_ma, 1300);
    }

    #[tokio::test]
    async fn current_max_write_keeps_its_property_tag() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::CurrentMax, 900)
            .await
            .unwrap();

        assert_eq!(charger.state().await.charging_current_max_ma, 900);
        hardware.lock(|hw| {
            assert_eq!(
                hw.borrow().port_writes.as_slice(),
                [(PropertyId::CurrentMax, 900)]
            );
        });
    }

    #[tokio::test]
    async fn current_now_is_a_passthrough() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::CurrentNow, 950)
            .await
            .unwrap();

        assert_eq!(charger.state().await.charging_current_max_ma, 0);
        hardware.lock(|hw| {
            assert_eq!(
                hw.borrow().port_writes.as_slice(),
                [(PropertyId::CurrentNow, 950)]
            );
        });
    }

    #[tokio::test]
    async fn current_avg_programs_the_charge_current() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::CurrentAvg, 1100)
            .await
            .unwrap();

        assert_eq!(charger.state().await.charging_current_ma, 1100);
        hardware.lock(|hw| {
            let hw = hw.borrow();
            assert_eq!(hw.current_writes.as_slice(), [1100]);
            assert!(hw.port_writes.is_empty());
        });
    }

    #[tokio::test]
    async fn siop_percentage_get_scales_the_charging_current() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::CurrentAvg, 1200)
            .await
            .unwrap();

        assert_eq!(
            charger.get_property(PropertyId::ChargeFullDesign, 60).await,
            Ok(720)
        );
        // Integer arithmetic truncates.
        assert_eq!(
            charger.get_property(PropertyId::ChargeFullDesign, 33).await,
            Ok(396)
        );
    }

    #[tokio::test]
    async fn siop_percentage_set_respects_the_usb_floor() {
        let hardware = shared_state();
        let config = ChargerConfig {
            functions: ChargerFunctions::MINIMUM_SIOP_CHARGING_CURRENT,
            ..Default::default()
        };
        let charger = wrapper(&hardware, config, None);

        charger
            .set_property(PropertyId::CurrentAvg, 1200)
            .await
            .unwrap();
        charger
            .set_property(PropertyId::ChargeFullDesign, 10)
            .await
            .unwrap();

        // 1200 * 10 / 100 = 120, clamped up to the USB fast-charging
        // current before it reaches the hardware.
        hardware.lock(|hw| {
            assert_eq!(hw.borrow().current_writes.as_slice(), [1200, 460]);
        });
        // The stored setting is untouched.
        assert_eq!(charger.state().await.charging_current_ma, 1200);
    }

    #[tokio::test]
    async fn siop_percentage_set_without_the_floor_function() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::CurrentAvg, 1200)
            .await
            .unwrap();
        charger
            .set_property(PropertyId::ChargeFullDesign, 10)
            .await
            .unwrap();

        hardware.lock(|hw| {
            assert_eq!(hw.borrow().current_writes.as_slice(), [1200, 120]);
        });
    }

    #[tokio::test]
    async fn siop_percentage_set_is_best_effort() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().fail_charging_current = true);
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        assert_eq!(
            charger.set_property(PropertyId::ChargeFullDesign, 50).await,
            Ok(())
        );
    }

    #[tokio::test]
    async fn current_max_get_does_not_touch_hardware() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().fail_get = Some(PropertyId::CurrentMax));
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::Online, CableType::Misc.into())
            .await
            .unwrap();
        assert_eq!(charger.get_property(PropertyId::CurrentMax, 0).await, Ok(700));
    }

    #[tokio::test]
    async fn charging_enabled_reflects_the_cable_state() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        assert_eq!(charger.get_property(PropertyId::ChargingEnabled, 0).await, Ok(0));
        charger
            .set_property(PropertyId::Online, CableType::Usb.into())
            .await
            .unwrap();
        assert_eq!(charger.get_property(PropertyId::ChargingEnabled, 0).await, Ok(1));
    }

    #[tokio::test]
    async fn delegated_reads_surface_hardware_failures() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().fail_get = Some(PropertyId::Status));
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        assert_eq!(
            charger.get_property(PropertyId::Status, 0).await,
            Err(ChargerError::HardwareUnavailable)
        );
    }

    #[tokio::test]
    async fn status_set_is_stored_unconditionally() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        charger
            .set_property(PropertyId::Status, ChargeStatus::Full.into())
            .await
            .unwrap();
        assert_eq!(charger.state().await.status, ChargeStatus::Full);

        charger.set_property(PropertyId::Status, 42).await.unwrap();
        assert_eq!(charger.state().await.status, ChargeStatus::Unknown);
    }

    #[tokio::test]
    async fn unknown_and_unhandled_properties_are_unsupported() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);

        assert_eq!(
            charger.get_property_raw(99, 0).await,
            Err(ChargerError::Unsupported)
        );
        assert_eq!(
            charger.set_property_raw(99, 0).await,
            Err(ChargerError::Unsupported)
        );
        assert_eq!(
            charger.set_property(PropertyId::Health, 0).await,
            Err(ChargerError::Unsupported)
        );
        assert_eq!(
            charger.set_property(PropertyId::ChargeType, 0).await,
            Err(ChargerError::Unsupported)
        );
        assert_eq!(
            charger.set_property(PropertyId::Online, 99).await,
            Err(ChargerError::Unsupported)
        );
    }

    #[tokio::test]
    async fn telemetry_properties_follow_their_gate() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().other = 77);
        let charger = wrapper(&hardware, ChargerConfig::default(), None);
        assert_eq!(
            charger.get_property(PropertyId::PowerStatus, 0).await,
            Err(ChargerError::Unsupported)
        );

        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().other = 77);
        let config = ChargerConfig {
            fuel_gauge_telemetry: true,
            ..Default::default()
        };
        let charger = wrapper(&hardware, config, None);
        assert_eq!(charger.get_property(PropertyId::StatusFg, 0).await, Ok(77));
    }

    #[tokio::test]
    async fn float_voltage_follows_the_swelling_gate() {
        let hardware = shared_state();
        let charger = wrapper(&hardware, ChargerConfig::default(), None);
        assert_eq!(
            charger.set_property(PropertyId::VoltageMax, 4100).await,
            Err(ChargerError::Unsupported)
        );

        let hardware = shared_state();
        let config = ChargerConfig {
            swelling_protection: true,
            ..Default::default()
        };
        let charger = wrapper(&hardware, config, None);
        assert_eq!(charger.set_property(PropertyId::VoltageMax, 4100).await, Ok(()));
        hardware.lock(|hw| {
            assert_eq!(hw.borrow().voltage_writes.as_slice(), [4100]);
        });

        // Failures on this path are logged, not surfaced.
        hardware.lock(|hw| hw.borrow_mut().fail_charging_voltage = true);
        assert_eq!(charger.set_property(PropertyId::VoltageMax, 4200).await, Ok(()));

        // A failed read hands the caller's value back unchanged.
        hardware.lock(|hw| hw.borrow_mut().fail_get = Some(PropertyId::VoltageMax));
        assert_eq!(charger.get_property(PropertyId::VoltageMax, 4350).await, Ok(4350));
    }

    #[tokio::test]
    async fn full_interrupt_notifies_the_battery_exactly_once() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().status = ChargeStatus::Full.into());
        let battery = BatteryLink::new();
        battery.set_charging_mode(ChargingMode::First).await;
        let config = ChargerConfig {
            full_check: FullCheckMode::ChargerInterrupt,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Status(ChargeStatus::Full))
        );
        assert_eq!(battery.try_receive(), None);
    }

    #[tokio::test]
    async fn full_interrupt_without_full_status_stays_quiet() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().status = ChargeStatus::Charging.into());
        let battery = BatteryLink::new();
        battery.set_charging_mode(ChargingMode::First).await;
        let config = ChargerConfig {
            full_check: FullCheckMode::ChargerInterrupt,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(battery.try_receive(), None);
    }

    #[tokio::test]
    async fn full_interrupt_auto_stop_reprograms_the_cable() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().status = ChargeStatus::Full.into());
        let battery = BatteryLink::new();
        battery.set_charging_mode(ChargingMode::First).await;
        let config = ChargerConfig {
            full_check: FullCheckMode::ChargerInterrupt,
            full_interrupt_auto_stop: true,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger
            .set_property(PropertyId::Online, CableType::Mains.into())
            .await
            .unwrap();
        charger.handle_interrupt().await;

        let state = charger.state().await;
        assert_eq!(state.cable_type, CableType::Battery);
        assert!(!state.is_charging);
        hardware.lock(|hw| {
            assert_eq!(
                hw.borrow().port_writes.as_slice(),
                [
                    (PropertyId::Online, PropertyValue::from(CableType::Mains)),
                    (PropertyId::Online, PropertyValue::from(CableType::Battery)),
                ]
            );
        });
        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Status(ChargeStatus::Full))
        );
    }

    #[tokio::test]
    async fn second_stage_uses_its_own_full_check_mode() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().status = ChargeStatus::Full.into());
        let battery = BatteryLink::new();
        battery.set_charging_mode(ChargingMode::Second).await;
        let config = ChargerConfig {
            full_check: FullCheckMode::ChargerInterrupt,
            full_check_2nd: FullCheckMode::None,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;
        assert_eq!(battery.try_receive(), None);

        battery.set_charging_mode(ChargingMode::First).await;
        charger.handle_interrupt().await;
        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Status(ChargeStatus::Full))
        );
    }

    #[tokio::test]
    async fn status_read_failure_aborts_the_whole_pass() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().fail_get = Some(PropertyId::Status));
        let battery = BatteryLink::new();
        let config = ChargerConfig {
            full_check_2nd: FullCheckMode::ChargerInterrupt,
            ovp_uvlo_check: OvpUvloCheckMode::ChargerInterrupt,
            cable_check: CableCheckSources::CHARGER_INTERRUPT,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(battery.try_receive(), None);
        hardware.lock(|hw| assert!(hw.borrow().port_writes.is_empty()));
    }

    #[tokio::test]
    async fn health_read_failure_aborts_before_the_cable_check() {
        let hardware = shared_state();
        hardware.lock(|hw| {
            let mut hw = hw.borrow_mut();
            hw.status = ChargeStatus::Charging.into();
            hw.fail_get = Some(PropertyId::Health);
        });
        let battery = BatteryLink::new();
        let config = ChargerConfig {
            ovp_uvlo_check: OvpUvloCheckMode::ChargerInterrupt,
            cable_check: CableCheckSources::CHARGER_INTERRUPT,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(battery.try_receive(), None);
    }

    #[tokio::test]
    async fn ovp_uvlo_faults_and_recovery_are_forwarded() {
        let hardware = shared_state();
        let battery = BatteryLink::new();
        let config = ChargerConfig {
            ovp_uvlo_check: OvpUvloCheckMode::ChargerInterrupt,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        hardware.lock(|hw| hw.borrow_mut().health = ChargerHealth::Overvoltage.into());
        charger.handle_interrupt().await;
        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Health(ChargerHealth::Overvoltage))
        );

        hardware.lock(|hw| hw.borrow_mut().health = ChargerHealth::Good.into());
        charger.handle_interrupt().await;
        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Health(ChargerHealth::Good))
        );

        // Thermal faults are owned elsewhere, only logged here.
        hardware.lock(|hw| hw.borrow_mut().health = ChargerHealth::Overheat.into());
        charger.handle_interrupt().await;
        assert_eq!(battery.try_receive(), None);
    }

    #[tokio::test]
    async fn health_settle_delay_still_reads_health() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().health = ChargerHealth::Undervoltage.into());
        let battery = BatteryLink::new();
        let config = ChargerConfig {
            ovp_uvlo_check: OvpUvloCheckMode::ChargerInterrupt,
            health_settle_delay: Some(embassy_time::Duration::from_millis(10)),
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Health(ChargerHealth::Undervoltage))
        );
    }

    #[tokio::test]
    async fn cable_interrupt_notifies_a_present_battery() {
        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().online = CableType::Usb.into());
        let battery = BatteryLink::new();
        let config = ChargerConfig {
            cable_check: CableCheckSources::CHARGER_INTERRUPT,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, Some(&battery));

        charger.handle_interrupt().await;

        assert_eq!(
            battery.try_receive(),
            Some(BatteryNotification::Online(CableType::Usb))
        );
    }

    #[tokio::test]
    async fn cable_interrupt_falls_back_without_a_battery() {
        static LAST_CABLE: AtomicI32 = AtomicI32::new(-1);
        fn capture_cable(cable: CableType) {
            LAST_CABLE.store(cable.into(), Ordering::Relaxed);
        }

        let hardware = shared_state();
        hardware.lock(|hw| hw.borrow_mut().online = CableType::Misc.into());
        let config = ChargerConfig {
            cable_check: CableCheckSources::CHARGER_INTERRUPT,
            check_cable_result: capture_cable,
            ..quiet_config()
        };
        let charger = wrapper(&hardware, config, None);

        charger.handle_interrupt().await;

        assert_eq!(LAST_CABLE.load(Ordering::Relaxed), CableType::Misc.into());
    }

    #[tokio::test]
    async fn interrupt_signal_drives_the_deferred_handler() {
        static HARDWARE: OnceLock<SharedMockState> = OnceLock::new();
        static BATTERY: OnceLock<BatteryLink> = OnceLock::new();
        static CHARGER: OnceLock<Wrapper<'static, MockChargerDriver<'static>>> = OnceLock::new();

        let hardware = HARDWARE.get_or_init(shared_state);
        hardware.lock(|hw| hw.borrow_mut().status = ChargeStatus::Full.into());
        let battery = BATTERY.get_or_init(BatteryLink::new);
        battery.set_charging_mode(ChargingMode::First).await;
        let charger = CHARGER.get_or_init(|| {
            let config = ChargerConfig {
                full_check: FullCheckMode::ChargerInterrupt,
                interrupt_settle_delay: Some(embassy_time::Duration::from_millis(10)),
                ..quiet_config()
            };
            wrapper(hardware, config, Some(battery))
        });

        let _handler = tokio::spawn(charger.process());
        charger.notify_interrupt();

        let notification = tokio::time::timeout(HostDuration::from_secs(5), battery.receive())
            .await
            .unwrap();
        assert_eq!(notification, BatteryNotification::Status(ChargeStatus::Full));
    }
}
