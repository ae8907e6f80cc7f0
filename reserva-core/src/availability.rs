use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DenyReason;
use crate::policy::BookingPolicy;
use crate::slot::Slot;

/// An admin-configured time window within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Whether the requested slot falls entirely inside this window.
    pub fn contains(&self, slot: &Slot) -> bool {
        self.start <= slot.start && slot.end <= self.end
    }
}

/// A schedule rule for one resource: either a recurring weekly template
/// or a date-specific exception. Exceptions override the weekly template
/// for their date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub detail: RuleDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleDetail {
    /// Recurring rule keyed by day of week (0 = Sunday .. 6 = Saturday).
    Weekly {
        day_of_week: u8,
        window: Option<TimeWindow>,
        is_available: bool,
    },
    /// Override for one calendar date. A blackout closes the whole day;
    /// a window restricts it; neither means the day is granted outright.
    Exception {
        date: NaiveDate,
        window: Option<TimeWindow>,
        is_blackout: bool,
    },
}

/// Day-of-week index as stored in schedule rows: 0 = Sunday through
/// 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Decide whether a slot is permissible at all, independent of existing
/// bookings. Precedence: gate, then date exceptions, then the weekly
/// template, then the no-rule default policy.
pub fn evaluate(
    is_blocked: bool,
    rules: &[AvailabilityRule],
    slot: &Slot,
    policy: &BookingPolicy,
) -> Result<(), DenyReason> {
    if is_blocked {
        return Err(DenyReason::ResourceBlocked);
    }

    let exceptions: Vec<_> = rules
        .iter()
        .filter_map(|rule| match &rule.detail {
            RuleDetail::Exception {
                date,
                window,
                is_blackout,
            } if *date == slot.date => Some((*window, *is_blackout)),
            _ => None,
        })
        .collect();

    if !exceptions.is_empty() {
        if exceptions.iter().any(|(_, blackout)| *blackout) {
            return Err(DenyReason::BlackoutDate);
        }
        let windows: Vec<TimeWindow> = exceptions.iter().filter_map(|(w, _)| *w).collect();
        if windows.is_empty() {
            // A windowless non-blackout exception grants the whole day.
            return Ok(());
        }
        if windows.iter().any(|w| w.contains(slot)) {
            return Ok(());
        }
        return Err(DenyReason::OutsideSchedule);
    }

    let dow = day_of_week(slot.date);
    let weekly: Vec<_> = rules
        .iter()
        .filter_map(|rule| match &rule.detail {
            RuleDetail::Weekly {
                day_of_week,
                window,
                is_available,
            } if *day_of_week == dow => Some((*window, *is_available)),
            _ => None,
        })
        .collect();

    if weekly.iter().any(|(_, available)| !available) {
        return Err(DenyReason::OutsideSchedule);
    }

    if weekly.is_empty() {
        return if policy.open_when_unscheduled {
            Ok(())
        } else {
            Err(DenyReason::OutsideSchedule)
        };
    }

    // At least one available rule must cover the requested window. A rule
    // without a window opens the whole day.
    if weekly
        .iter()
        .any(|(window, _)| window.map_or(true, |w| w.contains(slot)))
    {
        Ok(())
    } else {
        Err(DenyReason::OutsideSchedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{parse_date, parse_time};

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow {
            start: parse_time(start).unwrap(),
            end: parse_time(end).unwrap(),
        }
    }

    fn weekly(resource_id: Uuid, dow: u8, window: Option<TimeWindow>, available: bool) -> AvailabilityRule {
        AvailabilityRule {
            id: Uuid::new_v4(),
            resource_id,
            detail: RuleDetail::Weekly {
                day_of_week: dow,
                window,
                is_available: available,
            },
        }
    }

    fn exception(
        resource_id: Uuid,
        date: &str,
        window: Option<TimeWindow>,
        blackout: bool,
    ) -> AvailabilityRule {
        AvailabilityRule {
            id: Uuid::new_v4(),
            resource_id,
            detail: RuleDetail::Exception {
                date: parse_date(date).unwrap(),
                window,
                is_blackout: blackout,
            },
        }
    }

    fn slot(date: &str, start: &str, end: &str) -> Slot {
        Slot::parse(date, start, end).unwrap()
    }

    // 2024-06-10 is a Monday.
    const MONDAY: &str = "2024-06-10";

    #[test]
    fn test_day_of_week_is_sunday_based() {
        assert_eq!(day_of_week(parse_date("2024-06-09").unwrap()), 0); // Sunday
        assert_eq!(day_of_week(parse_date(MONDAY).unwrap()), 1);
        assert_eq!(day_of_week(parse_date("2024-06-15").unwrap()), 6); // Saturday
    }

    #[test]
    fn test_blocked_resource_wins_over_everything() {
        let rid = Uuid::new_v4();
        let rules = vec![weekly(rid, 1, Some(window("09:00", "17:00")), true)];
        let res = evaluate(
            true,
            &rules,
            &slot(MONDAY, "10:00", "11:00"),
            &BookingPolicy::default(),
        );
        assert_eq!(res, Err(DenyReason::ResourceBlocked));
    }

    #[test]
    fn test_weekly_window_allows_inside_and_denies_outside() {
        let rid = Uuid::new_v4();
        let rules = vec![weekly(rid, 1, Some(window("09:00", "17:00")), true)];
        let policy = BookingPolicy::default();

        assert!(evaluate(false, &rules, &slot(MONDAY, "16:00", "16:30"), &policy).is_ok());
        assert_eq!(
            evaluate(false, &rules, &slot(MONDAY, "17:00", "18:00"), &policy),
            Err(DenyReason::OutsideSchedule)
        );
        // Ending exactly at the window edge is still inside.
        assert!(evaluate(false, &rules, &slot(MONDAY, "16:00", "17:00"), &policy).is_ok());
    }

    #[test]
    fn test_weekly_unavailable_day_denies() {
        let rid = Uuid::new_v4();
        let rules = vec![weekly(rid, 1, None, false)];
        assert_eq!(
            evaluate(
                false,
                &rules,
                &slot(MONDAY, "10:00", "11:00"),
                &BookingPolicy::default()
            ),
            Err(DenyReason::OutsideSchedule)
        );
    }

    #[test]
    fn test_blackout_overrides_weekly_grant() {
        let rid = Uuid::new_v4();
        let rules = vec![
            weekly(rid, 1, Some(window("09:00", "17:00")), true),
            exception(rid, MONDAY, None, true),
        ];
        assert_eq!(
            evaluate(
                false,
                &rules,
                &slot(MONDAY, "10:00", "11:00"),
                &BookingPolicy::default()
            ),
            Err(DenyReason::BlackoutDate)
        );
    }

    #[test]
    fn test_windowed_exception_overrides_weekly() {
        let rid = Uuid::new_v4();
        let rules = vec![
            weekly(rid, 1, Some(window("09:00", "17:00")), true),
            exception(rid, MONDAY, Some(window("13:00", "15:00")), false),
        ];
        let policy = BookingPolicy::default();

        assert!(evaluate(false, &rules, &slot(MONDAY, "13:30", "14:00"), &policy).is_ok());
        // Inside the weekly window but outside the exception window.
        assert_eq!(
            evaluate(false, &rules, &slot(MONDAY, "10:00", "11:00"), &policy),
            Err(DenyReason::OutsideSchedule)
        );
    }

    #[test]
    fn test_windowless_exception_grants_whole_day() {
        let rid = Uuid::new_v4();
        // Mondays are normally closed; a bare exception opens this one.
        let rules = vec![
            weekly(rid, 1, None, false),
            exception(rid, MONDAY, None, false),
        ];
        let policy = BookingPolicy::default();

        assert!(evaluate(false, &rules, &slot(MONDAY, "06:00", "07:00"), &policy).is_ok());
        assert!(evaluate(false, &rules, &slot(MONDAY, "22:00", "23:00"), &policy).is_ok());
    }

    #[test]
    fn test_exception_only_applies_to_its_date() {
        let rid = Uuid::new_v4();
        let rules = vec![exception(rid, MONDAY, None, true)];
        let policy = BookingPolicy::default();

        // Tuesday is untouched by Monday's blackout.
        assert!(evaluate(false, &rules, &slot("2024-06-11", "10:00", "11:00"), &policy).is_ok());
    }

    #[test]
    fn test_no_rules_follows_policy() {
        let open = BookingPolicy::default();
        assert!(evaluate(false, &[], &slot(MONDAY, "10:00", "11:00"), &open).is_ok());

        let closed = BookingPolicy {
            open_when_unscheduled: false,
            ..BookingPolicy::default()
        };
        assert_eq!(
            evaluate(false, &[], &slot(MONDAY, "10:00", "11:00"), &closed),
            Err(DenyReason::OutsideSchedule)
        );
    }
}
