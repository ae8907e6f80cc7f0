use uuid::Uuid;

use crate::booking::Booking;
use crate::slot::Slot;

/// Whether the requested slot overlaps any active booking in `existing`.
/// `exclude` omits a booking's own id so an edit never conflicts with
/// itself. Rejected, cancelled and completed bookings never block.
///
/// Pure query. The store runs it against the day's bookings inside the
/// same transaction as the insert/update so that concurrent requests for
/// the same resource/date are serialized.
pub fn overlaps_any(existing: &[Booking], slot: &Slot, exclude: Option<Uuid>) -> bool {
    existing
        .iter()
        .filter(|booking| Some(booking.id) != exclude)
        .filter(|booking| booking.status.is_active())
        .any(|booking| booking.slot().overlaps(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;

    fn slot(date: &str, start: &str, end: &str) -> Slot {
        Slot::parse(date, start, end).unwrap()
    }

    fn booking(resource_id: Uuid, s: Slot, status: BookingStatus) -> Booking {
        Booking::new(Uuid::new_v4(), resource_id, s, None, status)
    }

    #[test]
    fn test_overlapping_active_booking_conflicts() {
        let rid = Uuid::new_v4();
        let existing = vec![booking(
            rid,
            slot("2024-06-10", "09:00", "10:00"),
            BookingStatus::Approved,
        )];
        assert!(overlaps_any(
            &existing,
            &slot("2024-06-10", "09:30", "10:30"),
            None
        ));
    }

    #[test]
    fn test_adjacent_slot_does_not_conflict() {
        let rid = Uuid::new_v4();
        let existing = vec![booking(
            rid,
            slot("2024-06-10", "09:00", "10:00"),
            BookingStatus::Pending,
        )];
        assert!(!overlaps_any(
            &existing,
            &slot("2024-06-10", "10:00", "11:00"),
            None
        ));
    }

    #[test]
    fn test_inactive_statuses_never_block() {
        let rid = Uuid::new_v4();
        let window = slot("2024-06-10", "09:00", "10:00");
        for status in [
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            let existing = vec![booking(rid, window, status)];
            assert!(!overlaps_any(&existing, &window, None));
        }
    }

    #[test]
    fn test_exclude_own_id() {
        let rid = Uuid::new_v4();
        let mine = booking(
            rid,
            slot("2024-06-10", "09:00", "10:00"),
            BookingStatus::Approved,
        );
        let id = mine.id;
        let existing = vec![mine];

        // Shrinking my own booking must not conflict with itself.
        let shrunk = slot("2024-06-10", "09:00", "09:30");
        assert!(overlaps_any(&existing, &shrunk, None));
        assert!(!overlaps_any(&existing, &shrunk, Some(id)));
    }

    #[test]
    fn test_symmetric_under_interval_swap() {
        let rid = Uuid::new_v4();
        let a = slot("2024-06-10", "09:00", "11:00");
        let b = slot("2024-06-10", "10:00", "12:00");

        let holds_a = vec![booking(rid, a, BookingStatus::Approved)];
        let holds_b = vec![booking(rid, b, BookingStatus::Approved)];
        assert_eq!(
            overlaps_any(&holds_a, &b, None),
            overlaps_any(&holds_b, &a, None)
        );
    }
}
