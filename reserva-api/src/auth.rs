use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reserva_core::identity::{Actor, Role};
use reserva_core::CoreError;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Decode the bearer token into the acting principal. Token issuance is
/// an external concern; only the shared secret lives here.
pub fn authenticate(bearer: &Bearer, secret: &str) -> Result<Actor, AppError> {
    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    let claims = token_data.claims;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("invalid subject claim".to_string()))?;
    let role = Role::parse(&claims.role)
        .map_err(|_| AppError::AuthenticationError("invalid role claim".to_string()))?;

    Ok(Actor::new(user_id, role))
}

pub fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden))
    }
}
