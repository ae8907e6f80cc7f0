use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use uuid::Uuid;

use reserva_core::availability::{AvailabilityRule, RuleDetail, TimeWindow};
use reserva_core::repository::ResourceFilter;
use reserva_core::resource::{Resource, ResourceKind};
use reserva_core::slot::{parse_date, parse_time};
use reserva_core::CoreError;

use crate::auth::{authenticate, require_admin};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/resources", get(list_resources).post(create_resource))
        .route(
            "/v1/resources/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route(
            "/v1/resources/{id}/schedule",
            get(list_schedule).post(add_schedule_rule),
        )
}

#[derive(Debug, Deserialize)]
struct ListResourcesQuery {
    kind: Option<String>,
    location: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateResourceRequest {
    name: String,
    kind: String,
    location: String,
    capacity: Option<i32>,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateResourceRequest {
    name: Option<String>,
    kind: Option<String>,
    location: Option<String>,
    capacity: Option<i32>,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateRuleRequest {
    day_of_week: Option<u8>,
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: Option<bool>,
    exception_date: Option<String>,
    is_blackout: Option<bool>,
}

async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ListResourcesQuery>,
) -> Result<Json<Vec<Resource>>, AppError> {
    let filter = ResourceFilter {
        kind: query.kind.as_deref().map(ResourceKind::parse).transpose()?,
        location: query.location,
        search: query.search,
    };
    let resources = state.resources.list(&filter).await?;
    Ok(Json(resources))
}

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, AppError> {
    let resource = state
        .resources
        .find(id)
        .await?
        .ok_or_else(|| CoreError::NotFound("resource".to_string()))?;
    Ok(Json(resource))
}

async fn create_resource(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    let mut resource = Resource::new(req.name, ResourceKind::parse(&req.kind)?, req.location);
    resource.capacity = req.capacity;
    resource.description = req.description;
    resource.image_url = req.image_url;

    state.resources.create(&resource).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateResourceRequest>,
) -> Result<Json<Resource>, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    let mut resource = state
        .resources
        .find(id)
        .await?
        .ok_or_else(|| CoreError::NotFound("resource".to_string()))?;

    if let Some(name) = req.name {
        resource.name = name;
    }
    if let Some(kind) = req.kind {
        resource.kind = ResourceKind::parse(&kind)?;
    }
    if let Some(location) = req.location {
        resource.location = location;
    }
    if let Some(capacity) = req.capacity {
        resource.capacity = Some(capacity);
    }
    if let Some(description) = req.description {
        resource.description = Some(description);
    }
    if let Some(image_url) = req.image_url {
        resource.image_url = Some(image_url);
    }

    state.resources.update(&resource).await?;
    Ok(Json(resource))
}

/// Refused while the resource still has pending or approved bookings;
/// the store enforces the guard inside the delete transaction.
async fn delete_resource(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    state.resources.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    let rules = state.schedules.rules_for_resource(id).await?;
    Ok(Json(rules))
}

async fn add_schedule_rule(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<AvailabilityRule>), AppError> {
    let actor = authenticate(&bearer, &state.auth.secret)?;
    require_admin(&actor)?;

    state
        .resources
        .find(id)
        .await?
        .ok_or_else(|| CoreError::NotFound("resource".to_string()))?;

    let window = match (req.start_time.as_deref(), req.end_time.as_deref()) {
        (Some(start), Some(end)) => {
            let window = TimeWindow {
                start: parse_time(start)?,
                end: parse_time(end)?,
            };
            if window.end <= window.start {
                return Err(
                    CoreError::Validation("end time must be after start time".to_string()).into(),
                );
            }
            Some(window)
        }
        (None, None) => None,
        _ => {
            return Err(CoreError::Validation(
                "start_time and end_time must be given together".to_string(),
            )
            .into())
        }
    };

    let detail = match req.exception_date.as_deref() {
        Some(date) => RuleDetail::Exception {
            date: parse_date(date)?,
            window,
            is_blackout: req.is_blackout.unwrap_or(false),
        },
        None => {
            let day_of_week = req.day_of_week.ok_or_else(|| {
                CoreError::Validation(
                    "either day_of_week or exception_date is required".to_string(),
                )
            })?;
            if day_of_week > 6 {
                return Err(
                    CoreError::Validation("day_of_week must be between 0 and 6".to_string())
                        .into(),
                );
            }
            RuleDetail::Weekly {
                day_of_week,
                window,
                is_available: req.is_available.unwrap_or(true),
            }
        }
    };

    let rule = AvailabilityRule {
        id: Uuid::new_v4(),
        resource_id: id,
        detail,
    };
    state.schedules.add_rule(&rule).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}
