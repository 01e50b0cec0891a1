//! Transfers API endpoints.

use api_types::{Created, transfer::TransferNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub async fn transfer_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let transfer = state
        .engine
        .new_transfer(engine::TransferCmd {
            user_id: user.username,
            from_account_id: payload.from_account_id,
            to_account_id: payload.to_account_id,
            amount_minor: payload.amount_minor,
            occurred_at: payload.occurred_at.with_timezone(&Utc),
            description: payload.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: transfer.id })))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transfer(&user.username, transfer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
