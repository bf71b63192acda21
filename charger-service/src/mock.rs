//! Mock charging IC driver for tests and host development.
//!
//! The driver records every write it receives and serves reads from a
//! shared state cell, so tests can script hardware behavior (including
//! failures) and assert exactly what reached the registers.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embedded_batteries_async::charger::{self, MilliAmps, MilliVolts};

use charger_service_messages::{CableType, ChargeStatus, ChargerHealth, PropertyId, PropertyValue};

use crate::GlobalRawMutex;
use crate::controller::ChargeController;

/// Observable mock hardware: the raw values reads return and the log of
/// everything written.
pub struct MockChargerState {
    /// Raw value returned for status reads.
    pub status: PropertyValue,
    /// Raw value returned for health reads.
    pub health: PropertyValue,
    /// Raw value returned for cable-state reads.
    pub online: PropertyValue,
    /// Raw value returned for any other property read.
    pub other: PropertyValue,
    /// Property whose reads fail, if any.
    pub fail_get: Option<PropertyId>,
    /// Property whose port writes fail, if any.
    pub fail_set: Option<PropertyId>,
    /// Fail charging-current writes.
    pub fail_charging_current: bool,
    /// Fail float-voltage writes.
    pub fail_charging_voltage: bool,
    /// Port writes, in order.
    pub port_writes: heapless::Vec<(PropertyId, PropertyValue), 16>,
    /// Charging-current writes, in order.
    pub current_writes: heapless::Vec<MilliAmps, 8>,
    /// Float-voltage writes, in order.
    pub voltage_writes: heapless::Vec<MilliVolts, 8>,
}

impl Default for MockChargerState {
    fn default() -> Self {
        Self {
            status: ChargeStatus::Charging.into(),
            health: ChargerHealth::Good.into(),
            online: CableType::Battery.into(),
            other: 0,
            fail_get: None,
            fail_set: None,
            fail_charging_current: false,
            fail_charging_voltage: false,
            port_writes: heapless::Vec::new(),
            current_writes: heapless::Vec::new(),
            voltage_writes: heapless::Vec::new(),
        }
    }
}

/// Shared mock state cell, living next to the wrapper under test.
pub type SharedMockState = BlockingMutex<GlobalRawMutex, RefCell<MockChargerState>>;

/// Fresh mock state with default readings and an empty write log.
pub fn shared_state() -> SharedMockState {
    BlockingMutex::new(RefCell::new(MockChargerState::default()))
}

/// Bus error reported by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockChargerError;

impl charger::Error for MockChargerError {
    fn kind(&self) -> charger::ErrorKind {
        charger::ErrorKind::Other
    }
}

/// Mock driver handle given to the wrapper.
pub struct MockChargerDriver<'a> {
    state: &'a SharedMockState,
}

impl<'a> MockChargerDriver<'a> {
    pub fn new(state: &'a SharedMockState) -> Self {
        Self { state }
    }
}

impl charger::ErrorType for MockChargerDriver<'_> {
    type Error = MockChargerError;
}

impl charger::Charger for MockChargerDriver<'_> {
    async fn charging_current(
        &mut self,
        requested_current: MilliAmps,
    ) -> Result<MilliAmps, Self::Error> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.fail_charging_current {
                return Err(MockChargerError);
            }
            let _ = state.current_writes.push(requested_current);
            Ok(requested_current)
        })
    }

    async fn charging_voltage(
        &mut self,
        requested_voltage: MilliVolts,
    ) -> Result<MilliVolts, Self::Error> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.fail_charging_voltage {
                return Err(MockChargerError);
            }
            let _ = state.voltage_writes.push(requested_voltage);
            Ok(requested_voltage)
        })
    }
}

impl ChargeController for MockChargerDriver<'_> {
    async fn get_property(&mut self, property: PropertyId) -> Result<PropertyValue, Self::Error> {
        self.state.lock(|state| {
            let state = state.borrow();
            if state.fail_get == Some(property) {
                return Err(MockChargerError);
            }
            Ok(match property {
                PropertyId::Status => state.status,
                PropertyId::Health => state.health,
                PropertyId::Online => state.online,
                _ => state.other,
            })
        })
    }

    async fn set_property(
        &mut self,
        property: PropertyId,
        value: PropertyValue,
    ) -> Result<(), Self::Error> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.fail_set == Some(property) {
                return Err(MockChargerError);
            }
            let _ = state.port_writes.push((property, value));
            Ok(())
        })
    }
}
