//! Device token registration for push reminders.

use api_types::push::{PushTokenNew, PushTokenRemove};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::EngineError;

use crate::{ServerError, server::ServerState, user};

pub async fn register(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PushTokenNew>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .register_push_token(&user.username, &payload.token, payload.platform.as_deref())
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PushTokenRemove>,
) -> Result<StatusCode, ServerError> {
    let removed = state
        .engine
        .remove_push_token(&user.username, &payload.token)
        .await?;
    if !removed {
        return Err(EngineError::KeyNotFound("push token not registered".to_string()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
