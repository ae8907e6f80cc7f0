use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::identity::Actor;
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(CoreError::Validation(format!(
                "unknown booking status: {other}"
            ))),
        }
    }

    /// Active bookings are the only ones that count toward conflicts and
    /// resource-deletion guards.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events an actor can drive against a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Approve,
    Reject,
    Cancel,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub purpose: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        resource_id: Uuid,
        slot: Slot,
        purpose: Option<String>,
        status: BookingStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            resource_id,
            date: slot.date,
            start_time: slot.start,
            end_time: slot.end,
            purpose,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot {
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.user_id == actor.user_id
    }

    /// Apply a lifecycle event, enforcing both the transition guards and
    /// the actor rules for who may drive each event.
    pub fn apply(&mut self, event: LifecycleEvent, actor: &Actor) -> CoreResult<()> {
        match event {
            LifecycleEvent::Approve => self.approve(actor),
            LifecycleEvent::Reject => self.reject(actor),
            LifecycleEvent::Cancel => self.cancel(actor),
            LifecycleEvent::Complete => self.complete(actor),
        }
    }

    /// Admin only; pending is the sole approvable state.
    pub fn approve(&mut self, actor: &Actor) -> CoreResult<()> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        if self.status != BookingStatus::Pending {
            return Err(self.invalid_transition(BookingStatus::Approved));
        }
        self.set_status(BookingStatus::Approved);
        Ok(())
    }

    /// Admin only; rejects a pending or approved booking.
    pub fn reject(&mut self, actor: &Actor) -> CoreResult<()> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        if !self.status.is_active() {
            return Err(self.invalid_transition(BookingStatus::Rejected));
        }
        self.set_status(BookingStatus::Rejected);
        Ok(())
    }

    /// Owner or admin. Cancelling an already-cancelled or completed
    /// booking is refused; a rejected booking may still be cancelled.
    pub fn cancel(&mut self, actor: &Actor) -> CoreResult<()> {
        if !self.is_owned_by(actor) && !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        if self.status.is_terminal() {
            return Err(self.invalid_transition(BookingStatus::Cancelled));
        }
        self.set_status(BookingStatus::Cancelled);
        Ok(())
    }

    /// Admin/system, typically once the booked window has elapsed.
    pub fn complete(&mut self, actor: &Actor) -> CoreResult<()> {
        if !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        if self.status.is_terminal() {
            return Err(self.invalid_transition(BookingStatus::Completed));
        }
        self.set_status(BookingStatus::Completed);
        Ok(())
    }

    /// Edits to date/time/purpose are restricted to the owner and only
    /// while the booking is still pending or approved.
    pub fn ensure_editable(&self, actor: &Actor) -> CoreResult<()> {
        if !self.is_owned_by(actor) {
            return Err(CoreError::Forbidden);
        }
        if !self.status.is_active() {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Replace the booked window. Callers must have re-run admission
    /// (excluding this booking's own id) before committing.
    pub fn reschedule(&mut self, slot: Slot) {
        self.date = slot.date;
        self.start_time = slot.start;
        self.end_time = slot.end;
        self.touch();
    }

    pub fn set_purpose(&mut self, purpose: Option<String>) {
        self.purpose = purpose;
        self.touch();
    }

    fn set_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid_transition(&self, to: BookingStatus) -> CoreError {
        CoreError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn booking(owner: &Actor, status: BookingStatus) -> Booking {
        let slot = Slot::parse("2024-06-10", "09:00", "10:00").unwrap();
        Booking::new(owner.user_id, Uuid::new_v4(), slot, None, status)
    }

    #[test]
    fn test_approve_pending() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Pending);
        b.approve(&admin()).unwrap();
        assert_eq!(b.status, BookingStatus::Approved);
    }

    #[test]
    fn test_approve_rejected_fails() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Rejected);
        let err = b.approve(&admin()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_approve_already_approved_fails() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Approved);
        let err = b.approve(&admin()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_approve_requires_admin() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Pending);
        let err = b.approve(&owner).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));
    }

    #[test]
    fn test_reject_approved() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Approved);
        b.reject(&admin()).unwrap();
        assert_eq!(b.status, BookingStatus::Rejected);
    }

    #[test]
    fn test_reject_already_rejected_fails() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Rejected);
        assert!(b.reject(&admin()).is_err());
    }

    #[test]
    fn test_cancel_by_owner() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Approved);
        b.cancel(&owner).unwrap();
        assert_eq!(b.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_cancel_completed_fails() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Completed);
        let err = b.cancel(&owner).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_by_stranger_forbidden() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let stranger = Actor::new(Uuid::new_v4(), Role::Staff);
        let mut b = booking(&owner, BookingStatus::Approved);
        assert!(matches!(b.cancel(&stranger), Err(CoreError::Forbidden)));
    }

    #[test]
    fn test_cancel_loses_race_against_complete() {
        // Whichever transition lands second must see the committed
        // terminal status and be refused, never overwrite it.
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Pending);
        b.apply(LifecycleEvent::Complete, &admin()).unwrap();
        let err = b.apply(LifecycleEvent::Cancel, &owner).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(b.status, BookingStatus::Completed);
    }

    #[test]
    fn test_complete_from_terminal_fails() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let mut b = booking(&owner, BookingStatus::Cancelled);
        assert!(b.complete(&admin()).is_err());
    }

    #[test]
    fn test_edit_guard() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let b = booking(&owner, BookingStatus::Approved);
        assert!(b.ensure_editable(&owner).is_ok());

        let done = booking(&owner, BookingStatus::Completed);
        assert!(done.ensure_editable(&owner).is_err());

        let other = Actor::new(Uuid::new_v4(), Role::Student);
        assert!(matches!(
            b.ensure_editable(&other),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Approved,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::parse("held").is_err());
    }
}
