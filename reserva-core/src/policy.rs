use serde::{Deserialize, Serialize};

use crate::booking::BookingStatus;

/// Deployment-level booking policy. Defaults suit a walk-up kiosk where
/// bookings take effect immediately; approval-workflow campuses override
/// them through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Status assigned to a freshly admitted booking.
    #[serde(default = "default_initial_status")]
    pub initial_status: BookingStatus,
    /// Whether a resource with no schedule rules at all is open for
    /// booking.
    #[serde(default = "default_open_when_unscheduled")]
    pub open_when_unscheduled: bool,
}

fn default_initial_status() -> BookingStatus {
    BookingStatus::Approved
}

fn default_open_when_unscheduled() -> bool {
    true
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            initial_status: default_initial_status(),
            open_when_unscheduled: default_open_when_unscheduled(),
        }
    }
}
