//! Faturas (credit card statements) API endpoints.

use api_types::fatura::{Backfilled, FaturaList, FaturaPay, FaturaStatus, FaturaView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn fatura_view(fatura: engine::Fatura, today: NaiveDate) -> FaturaView {
    let status = match fatura.status(today) {
        engine::FaturaStatus::Pending => FaturaStatus::Pending,
        engine::FaturaStatus::Overdue => FaturaStatus::Overdue,
        engine::FaturaStatus::Paid { .. } => FaturaStatus::Paid,
    };
    FaturaView {
        id: fatura.id,
        account_id: fatura.account_id,
        year_month: fatura.year_month.to_string(),
        total_amount_minor: fatura.total_amount.cents(),
        due_date: fatura.due_date,
        status,
        paid_at: fatura.payment.map(|payment| payment.at),
        paid_from_account_id: fatura.payment.and_then(|payment| payment.from_account_id),
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<FaturaList>,
) -> Result<Json<Vec<FaturaView>>, ServerError> {
    let today = state.today();
    let faturas = state
        .engine
        .list_faturas(&user.username, query.account_id)
        .await?;
    Ok(Json(
        faturas
            .into_iter()
            .map(|fatura| fatura_view(fatura, today))
            .collect(),
    ))
}

pub async fn pay(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(fatura_id): Path<Uuid>,
    Json(payload): Json<FaturaPay>,
) -> Result<Json<FaturaView>, ServerError> {
    let paid_at = payload
        .paid_at
        .map_or_else(Utc::now, |at| at.with_timezone(&Utc));
    let fatura = state
        .engine
        .pay_fatura(engine::PayFaturaCmd {
            user_id: user.username,
            fatura_id,
            from_account_id: payload.from_account_id,
            paid_at,
            create_transfer: payload.create_transfer.unwrap_or(true),
        })
        .await?;
    Ok(Json(fatura_view(fatura, state.today())))
}

pub async fn unpay(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(fatura_id): Path<Uuid>,
) -> Result<Json<FaturaView>, ServerError> {
    let fatura = state
        .engine
        .unpay_fatura(&user.username, fatura_id)
        .await?;
    Ok(Json(fatura_view(fatura, state.today())))
}

/// Create the missing faturas of the caller's card entries.
pub async fn backfill(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Backfilled>, ServerError> {
    let created = state
        .engine
        .backfill_faturas(Some(&user.username))
        .await?;
    Ok(Json(Backfilled { created }))
}
