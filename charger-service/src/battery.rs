//! Charger-facing endpoint of the battery consumer.

use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;

use charger_service_messages::{BatteryNotification, ChargingMode};

use crate::GlobalRawMutex;
use crate::error;

/// One handler pass can emit a status, a health and a cable notification
/// before the consumer gets to run.
const NOTIFICATION_DEPTH: usize = 4;

/// Connection point between the charger service and the battery consumer.
///
/// The battery owner keeps its charging mode up to date here so the
/// interrupt handler can pick the matching full-charge detection stage,
/// and drains the notification queue the handler fills. Registration is
/// optional; a wrapper constructed without a link routes cable results to
/// the configured fallback callback instead.
pub struct BatteryLink {
    charging_mode: Mutex<GlobalRawMutex, ChargingMode>,
    notifications: Channel<GlobalRawMutex, BatteryNotification, NOTIFICATION_DEPTH>,
}

impl BatteryLink {
    pub const fn new() -> Self {
        Self {
            charging_mode: Mutex::new(ChargingMode::None),
            notifications: Channel::new(),
        }
    }

    /// Record the charge stage the battery is currently driving.
    pub async fn set_charging_mode(&self, mode: ChargingMode) {
        *self.charging_mode.lock().await = mode;
    }

    /// Charge stage last reported by the battery.
    pub async fn charging_mode(&self) -> ChargingMode {
        *self.charging_mode.lock().await
    }

    /// Wait for the next notification from the charger.
    pub async fn receive(&self) -> BatteryNotification {
        self.notifications.receive().await
    }

    /// Take a pending notification without waiting.
    pub fn try_receive(&self) -> Option<BatteryNotification> {
        self.notifications.try_receive().ok()
    }

    /// Queue a notification towards the consumer. The handler must never
    /// block on a slow consumer, so an overflowing notification is dropped.
    pub(crate) fn notify(&self, notification: BatteryNotification) {
        if self.notifications.try_send(notification).is_err() {
            error!("Battery notification queue full, dropping {:?}", notification);
        }
    }
}

impl Default for BatteryLink {
    fn default() -> Self {
        Self::new()
    }
}
