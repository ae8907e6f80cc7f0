use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use uuid::Uuid;

use reserva_core::booking::{Booking, BookingStatus, LifecycleEvent};
use reserva_core::repository::AdminBookingFilter;
use reserva_core::resource::Resource;
use reserva_core::slot::parse_date;

use crate::auth::{authenticate, require_admin};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/bookings", get(list_bookings))
        .route("/v1/admin/bookings/{id}/approve", put(approve_booking))
        .route("/v1/admin/bookings/{id}/reject", put(reject_booking))
        .route("/v1/admin/bookings/{id}/complete", put(complete_booking))
        .route("/v1/admin/resources/{id}/block", put(block_resource))
}

#[derive(Debug, Deserialize)]
struct ListBookingsQuery {
    status: Option<String>,
    resource_id: Option<Uuid>,
    user_id: Option<Uuid>,
    date_from: Option<String>,
    date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockResourceRequest {
    is_blocked: bool,
}

async fn list_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    let filter = AdminBookingFilter {
        status: query.status.as_deref().map(BookingStatus::parse).transpose()?,
        resource_id: query.resource_id,
        user_id: query.user_id,
        date_from: query.date_from.as_deref().map(parse_date).transpose()?,
        date_to: query.date_to.as_deref().map(parse_date).transpose()?,
    };

    let bookings = state.bookings.list_all(&filter).await?;
    Ok(Json(bookings))
}

async fn approve_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    let booking = state
        .bookings
        .transition(id, &actor, LifecycleEvent::Approve)
        .await?;
    Ok(Json(booking))
}

async fn reject_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    let booking = state
        .bookings
        .transition(id, &actor, LifecycleEvent::Reject)
        .await?;
    Ok(Json(booking))
}

async fn complete_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    let booking = state
        .bookings
        .transition(id, &actor, LifecycleEvent::Complete)
        .await?;
    Ok(Json(booking))
}

async fn block_resource(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<BlockResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    let resource = state.resources.set_blocked(id, req.is_blocked).await?;
    Ok(Json(resource))
}
