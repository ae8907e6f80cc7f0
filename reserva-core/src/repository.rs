use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::availability::AvailabilityRule;
use crate::booking::{Booking, LifecycleEvent};
use crate::error::CoreResult;
use crate::identity::Actor;
use crate::policy::BookingPolicy;
use crate::resource::{Resource, ResourceKind};
use crate::slot::Slot;

#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub kind: Option<ResourceKind>,
    pub location: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<crate::booking::BookingStatus>,
    pub upcoming: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdminBookingFilter {
    pub status: Option<crate::booking::BookingStatus>,
    pub resource_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// A booking request after wire-format validation, before admission.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub slot: Slot,
    pub purpose: Option<String>,
}

/// Partial update to an existing booking. `None` leaves a field alone;
/// `purpose: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub purpose: Option<Option<String>>,
}

impl BookingPatch {
    pub fn changes_schedule(&self) -> bool {
        self.date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.changes_schedule() && self.purpose.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_emptiness() {
        assert!(BookingPatch::default().is_empty());

        // Clearing the purpose is still an update.
        let clear = BookingPatch {
            purpose: Some(None),
            ..Default::default()
        };
        assert!(!clear.is_empty());
        assert!(!clear.changes_schedule());

        let reschedule = BookingPatch {
            start_time: crate::slot::parse_time("10:00").ok(),
            ..Default::default()
        };
        assert!(reschedule.changes_schedule());
    }
}

/// Resource data access. `delete` must refuse to remove a resource that
/// still has pending or approved bookings.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn create(&self, resource: &Resource) -> CoreResult<()>;
    async fn find(&self, id: Uuid) -> CoreResult<Option<Resource>>;
    async fn list(&self, filter: &ResourceFilter) -> CoreResult<Vec<Resource>>;
    async fn update(&self, resource: &Resource) -> CoreResult<()>;
    async fn set_blocked(&self, id: Uuid, is_blocked: bool) -> CoreResult<Resource>;
    async fn delete(&self, id: Uuid) -> CoreResult<()>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn add_rule(&self, rule: &AvailabilityRule) -> CoreResult<()>;
    async fn rules_for_resource(&self, resource_id: Uuid) -> CoreResult<Vec<AvailabilityRule>>;
}

/// Booking data access. `create` and `update` compose the admission
/// pipeline with the write in a single atomically-isolated operation so
/// that at most one of two concurrent requests for the same resource and
/// date can observe an empty conflict set.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, request: NewBooking, policy: &BookingPolicy) -> CoreResult<Booking>;
    async fn find(&self, id: Uuid) -> CoreResult<Option<Booking>>;
    async fn list_for_user(&self, user_id: Uuid, filter: &BookingFilter)
        -> CoreResult<Vec<Booking>>;
    async fn list_all(&self, filter: &AdminBookingFilter) -> CoreResult<Vec<Booking>>;
    async fn active_for_day(&self, resource_id: Uuid, date: NaiveDate)
        -> CoreResult<Vec<Booking>>;
    async fn update(
        &self,
        id: Uuid,
        actor: &Actor,
        patch: BookingPatch,
        policy: &BookingPolicy,
    ) -> CoreResult<Booking>;
    async fn transition(
        &self,
        id: Uuid,
        actor: &Actor,
        event: LifecycleEvent,
    ) -> CoreResult<Booking>;
}
