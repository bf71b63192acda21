use core::future::Future;

use charger_service_messages::{PropertyId, PropertyValue};

/// Charging IC driver contract.
///
/// Fast-charge current and float voltage are programmed through the
/// standard [`embedded_batteries_async::charger::Charger`] supertrait;
/// everything else the controller needs (status, health, cable state,
/// input current limit, charge enable) goes through the raw property port
/// below, keyed by [`PropertyId`]. Both operations are synchronous from
/// the service's point of view and may fail with the driver's bus error.
pub trait ChargeController: embedded_batteries_async::charger::Charger {
    /// Read one raw charger property from the hardware.
    fn get_property(
        &mut self,
        property: PropertyId,
    ) -> impl Future<Output = Result<PropertyValue, Self::Error>>;

    /// Write one raw charger property to the hardware.
    fn set_property(
        &mut self,
        property: PropertyId,
        value: PropertyValue,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}
