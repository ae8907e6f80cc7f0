use uuid::Uuid;

use crate::availability::{self, AvailabilityRule};
use crate::booking::{Booking, BookingStatus};
use crate::conflict;
use crate::error::{CoreError, CoreResult};
use crate::policy::BookingPolicy;
use crate::resource::Resource;
use crate::slot::Slot;

/// The ordered admission pipeline for a booking request:
/// gate -> availability -> conflict -> initial status.
///
/// Pure over its inputs; the store is responsible for loading the
/// resource, its rules and the day's bookings inside one SERIALIZABLE
/// transaction and committing the insert only if this returns Ok.
pub fn admit(
    resource: &Resource,
    rules: &[AvailabilityRule],
    existing: &[Booking],
    slot: &Slot,
    exclude: Option<Uuid>,
    policy: &BookingPolicy,
) -> CoreResult<BookingStatus> {
    availability::evaluate(resource.is_blocked, rules, slot, policy)
        .map_err(CoreError::Unavailable)?;

    if conflict::overlaps_any(existing, slot, exclude) {
        return Err(CoreError::Conflict);
    }

    Ok(policy.initial_status)
}
