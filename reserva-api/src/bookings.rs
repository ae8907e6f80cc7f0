use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use reserva_core::booking::{Booking, BookingStatus, LifecycleEvent};
use reserva_core::repository::{BookingFilter, BookingPatch, NewBooking};
use reserva_core::slot::{parse_date, parse_time, Slot};
use reserva_core::CoreError;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/mine", get(my_bookings))
        .route(
            "/v1/bookings/{id}",
            get(get_booking).put(update_booking).delete(cancel_booking),
        )
        .route("/v1/resources/{id}/day", get(day_schedule))
}

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    resource_id: Uuid,
    booking_date: String,
    start_time: String,
    end_time: String,
    purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateBookingRequest {
    booking_date: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    purpose: Option<Option<String>>,
}

/// Distinguishes an absent `purpose` from an explicit null: absent
/// leaves it alone, null clears it.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct MyBookingsQuery {
    status: Option<String>,
    upcoming: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DayQuery {
    date: String,
}

#[derive(Debug, Serialize)]
struct DayScheduleResponse {
    date: String,
    bookings: Vec<BookingWindow>,
}

/// The public projection of a booking: just the occupied window. Who
/// booked it and why stays private.
#[derive(Debug, Serialize)]
struct BookingWindow {
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: BookingStatus,
}

impl From<Booking> for BookingWindow {
    fn from(booking: Booking) -> Self {
        Self {
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
        }
    }
}

async fn create_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;

    let slot = Slot::parse(&req.booking_date, &req.start_time, &req.end_time)?;
    if slot.date < Utc::now().date_naive() {
        return Err(CoreError::Validation("cannot book resources in the past".to_string()).into());
    }

    let booking = state
        .bookings
        .create(
            NewBooking {
                user_id: actor.user_id,
                resource_id: req.resource_id,
                slot,
                purpose: req.purpose,
            },
            &state.policy,
        )
        .await?;

    info!("Booking {} created by {}", booking.id, actor.user_id);
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;

    let filter = BookingFilter {
        status: query.status.as_deref().map(BookingStatus::parse).transpose()?,
        upcoming: query.upcoming.unwrap_or(false),
    };

    let bookings = state.bookings.list_for_user(actor.user_id, &filter).await?;
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;

    let booking = state
        .bookings
        .find(id)
        .await?
        .ok_or_else(|| CoreError::NotFound("booking".to_string()))?;

    if !booking.is_owned_by(&actor) && !actor.is_admin() {
        return Err(CoreError::Forbidden.into());
    }

    Ok(Json(booking))
}

async fn update_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;

    let patch = BookingPatch {
        date: req.booking_date.as_deref().map(parse_date).transpose()?,
        start_time: req.start_time.as_deref().map(parse_time).transpose()?,
        end_time: req.end_time.as_deref().map(parse_time).transpose()?,
        purpose: req.purpose,
    };

    let booking = state
        .bookings
        .update(id, &actor, patch, &state.policy)
        .await?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;

    let booking = state
        .bookings
        .transition(id, &actor, LifecycleEvent::Cancel)
        .await?;
    Ok(Json(booking))
}

/// Active bookings for one resource on one date, for rendering a day view.
async fn day_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayScheduleResponse>, AppError> {
    let date = parse_date(&query.date)?;
    let bookings = state.bookings.active_for_day(id, date).await?;
    Ok(Json(DayScheduleResponse {
        date: query.date,
        bookings: bookings.into_iter().map(BookingWindow::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reserva_core::identity::{Actor, Role};

    #[test]
    fn test_day_view_omits_booker_details() {
        let owner = Actor::new(Uuid::new_v4(), Role::Student);
        let booking = Booking::new(
            owner.user_id,
            Uuid::new_v4(),
            Slot::parse("2024-06-10", "09:00", "10:00").unwrap(),
            Some("thesis defense prep".to_string()),
            BookingStatus::Approved,
        );

        let window = BookingWindow::from(booking);
        let json = serde_json::to_value(&window).unwrap();

        assert!(json.get("start_time").is_some());
        assert!(json.get("end_time").is_some());
        assert_eq!(json.get("status").unwrap(), "approved");
        assert!(json.get("user_id").is_none());
        assert!(json.get("purpose").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_update_request_distinguishes_absent_and_null_purpose() {
        let absent: UpdateBookingRequest =
            serde_json::from_str(r#"{"start_time": "10:00"}"#).unwrap();
        assert_eq!(absent.purpose, None);

        let cleared: UpdateBookingRequest = serde_json::from_str(r#"{"purpose": null}"#).unwrap();
        assert_eq!(cleared.purpose, Some(None));

        let set: UpdateBookingRequest =
            serde_json::from_str(r#"{"purpose": "group study"}"#).unwrap();
        assert_eq!(set.purpose, Some(Some("group study".to_string())));
    }
}
