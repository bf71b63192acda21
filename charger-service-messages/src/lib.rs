#![no_std]

//! Property and status code definitions shared by the charger service, its
//! hardware drivers and the battery consumer.
//!
//! The codes mirror the integer encoding used on the host-facing property
//! interface, so every enum converts to and from a raw [`PropertyValue`]
//! via `num_enum`.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Raw value carried on the property interface. Currents are in mA,
/// voltages in mV, everything else is an enum code.
pub type PropertyValue = i32;

/// Properties understood by the charger property interface.
///
/// This is a closed enumeration; raw codes outside of it are rejected by
/// the service with an unsupported-property error.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i32)]
pub enum PropertyId {
    /// Charge status as reported by the charging IC.
    Status = 0,
    /// Trickle/fast charge discrimination.
    ChargeType,
    /// Charger fault state (OVP/UVLO, thermal, ...).
    Health,
    /// Attached cable/power-source type.
    Online,
    /// Input current limit in mA.
    CurrentMax,
    /// Fast charging current in mA.
    CurrentAvg,
    /// Calculated input current limit in mA.
    CurrentNow,
    /// Charging current scaled by a SIOP percentage.
    ///
    /// Overloaded by the platform: the value carried with this property is
    /// a percentage, not a design capacity.
    ChargeFullDesign,
    /// Whether charging is currently enabled.
    ChargingEnabled,
    /// Raw fuel-gauge status register.
    StatusFg,
    /// Fuel-gauge power status.
    PowerStatus,
    /// Charging mode indicator (first/second stage).
    ChargeNow,
    /// Float voltage in mV.
    VoltageMax,
}

/// Charge status codes.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeStatus {
    Unknown = 0,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

impl Default for ChargeStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Charger health codes. Overvoltage and undervoltage are the two fault
/// states raised by the OVP/UVLO hardware comparators.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerHealth {
    Unknown = 0,
    Good,
    Overheat,
    Dead,
    Overvoltage,
    UnspecifiedFailure,
    Cold,
    Undervoltage,
}

/// Cable/power-source types distinguished by the charging-current table.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CableType {
    Unknown = 0,
    /// No external source; the system runs from the battery.
    Battery,
    Ups,
    /// AC adapter.
    Mains,
    Usb,
    /// Non-standard chargers (car/dock adapters and the like).
    Misc,
    Wireless,
}

impl CableType {
    /// Number of cable types, for sizing per-cable configuration tables.
    pub const COUNT: usize = 7;
}

impl Default for CableType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Trickle/fast charge discrimination codes.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeType {
    None = 0,
    Trickle,
    Fast,
}

/// Charging mode as tracked by the battery consumer, reported back to the
/// charger through its CHARGE_NOW query.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargingMode {
    None = 0,
    /// First (constant-current) charge stage.
    First,
    /// Second (top-off) charge stage.
    Second,
    Recharging,
}

impl Default for ChargingMode {
    fn default() -> Self {
        Self::None
    }
}

/// Notification pushed from the charger service to the battery consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryNotification {
    /// Charge status transition (currently only Full is forwarded).
    Status(ChargeStatus),
    /// Health transition, including the recovery back to Good.
    Health(ChargerHealth),
    /// Cable presence/type as read back from the charging IC.
    Online(CableType),
}
