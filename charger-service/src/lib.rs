#![no_std]

//! Charger control embedded service.
//!
//! Mediates between a charging-cable event source, the charging IC driver
//! and the battery consumer that owns overall system charge state. The
//! service exposes the host-facing property interface (cable and SIOP
//! throttling events in, charger telemetry out) and the deferred handler
//! that services charging IC interrupts.

pub mod battery;
pub mod config;
pub mod controller;
pub mod fmt;
pub mod state;
pub mod wrapper;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use wrapper::{ChargerError, Wrapper};

/// Global Mutex type, ThreadModeRawMutex is used in a microcontroller context, whereas
/// CriticalSectionRawMutex is used in a standard context for unit testing.
///
/// Used because ThreadModeRawMutex is not unit test friendly
/// but CriticalSectionRawMutex would incur a significant performance impact, since it disables interrupts.
#[cfg(any(test, not(target_os = "none"), target_arch = "riscv32"))]
pub type GlobalRawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
/// Global Mutex type, ThreadModeRawMutex is used in a microcontroller context, whereas
/// CriticalSectionRawMutex is used in a standard context for unit testing.
///
/// Used because ThreadModeRawMutex is not unit test friendly
/// but CriticalSectionRawMutex would incur a significant performance impact, since it disables interrupts.
#[cfg(all(not(test), target_os = "none", not(target_arch = "riscv32")))]
pub type GlobalRawMutex = embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
