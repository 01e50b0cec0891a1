//! Entries and incomes API endpoints, plus the monthly CSV export.

use std::collections::HashMap;

use api_types::{
    Created, MonthQuery,
    entry::{EntryNew, EntryPay, EntryUpdate, EntryView},
    income::{IncomeNew, IncomeReceive, IncomeView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, FixedOffset, Utc};
use engine::{EntryCmd, IncomeCmd, YearMonth};
use serde::Serialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn entry_view(entry: engine::Entry) -> EntryView {
    EntryView {
        id: entry.id,
        account_id: entry.account_id,
        category_id: entry.category_id,
        description: entry.description,
        amount_minor: entry.amount.cents(),
        due_date: entry.due_date,
        paid_at: entry.payment.paid_at(),
        ignored: entry.ignored,
        fatura_id: entry.fatura_id,
    }
}

fn income_view(income: engine::Income) -> IncomeView {
    IncomeView {
        id: income.id,
        account_id: income.account_id,
        category_id: income.category_id,
        description: income.description,
        amount_minor: income.amount.cents(),
        expected_date: income.expected_date,
        received_at: income.receipt.received_at(),
    }
}

fn utc_or_now(at: Option<DateTime<FixedOffset>>) -> DateTime<Utc> {
    at.map_or_else(Utc::now, |at| at.with_timezone(&Utc))
}

pub async fn entry_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EntryNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = EntryCmd::new(
        user.username,
        payload.account_id,
        payload.category_id,
        payload.amount_minor,
        payload.due_date,
    )
    .ignored(payload.ignored.unwrap_or(false));
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(paid_at) = payload.paid_at {
        cmd = cmd.paid_at(paid_at.with_timezone(&Utc));
    }

    let entry = state.engine.new_entry(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: entry.id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<EntryView>>, ServerError> {
    let year_month: YearMonth = query.month.parse()?;
    let entries = state
        .engine
        .list_entries(&user.username, year_month, query.account_id)
        .await?;
    Ok(Json(entries.into_iter().map(entry_view).collect()))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<EntryUpdate>,
) -> Result<Json<EntryView>, ServerError> {
    let entry = state
        .engine
        .update_entry(
            &user.username,
            entry_id,
            engine::EntryUpdate {
                category_id: payload.category_id,
                description: payload.description,
                amount_minor: payload.amount_minor,
                due_date: payload.due_date,
                ignored: payload.ignored,
            },
        )
        .await?;
    Ok(Json(entry_view(entry)))
}

pub async fn pay(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(entry_id): Path<Uuid>,
    payload: Option<Json<EntryPay>>,
) -> Result<Json<EntryView>, ServerError> {
    let paid_at = utc_or_now(payload.and_then(|Json(payload)| payload.paid_at));
    let entry = state
        .engine
        .pay_entry(&user.username, entry_id, paid_at)
        .await?;
    Ok(Json(entry_view(entry)))
}

pub async fn unpay(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<EntryView>, ServerError> {
    let entry = state.engine.unpay_entry(&user.username, entry_id).await?;
    Ok(Json(entry_view(entry)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_entry(&user.username, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct CsvRow<'a> {
    due_date: String,
    account: &'a str,
    category: &'a str,
    description: &'a str,
    amount: String,
    paid_at: String,
    ignored: bool,
}

/// Entries of a month as CSV, amounts in units with two decimals.
pub async fn export_csv(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let year_month: YearMonth = query.month.parse()?;
    let entries = state
        .engine
        .list_entries(&user.username, year_month, query.account_id)
        .await?;
    let accounts: HashMap<Uuid, String> = state
        .engine
        .list_accounts(&user.username, true)
        .await?
        .into_iter()
        .map(|account| (account.id, account.name))
        .collect();
    let categories: HashMap<Uuid, String> = state
        .engine
        .list_categories(&user.username, None)
        .await?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in &entries {
        writer
            .serialize(CsvRow {
                due_date: entry.due_date.format("%Y-%m-%d").to_string(),
                account: accounts.get(&entry.account_id).map_or("", String::as_str),
                category: categories.get(&entry.category_id).map_or("", String::as_str),
                description: &entry.description,
                amount: entry.amount.to_string(),
                paid_at: entry
                    .payment
                    .paid_at()
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default(),
                ignored: entry.ignored,
            })
            .map_err(|err| ServerError::Generic(err.to_string()))?;
    }
    let body = writer
        .into_inner()
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    let disposition = format!("attachment; filename=\"entries-{year_month}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn income_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<IncomeNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = IncomeCmd::new(
        user.username,
        payload.account_id,
        payload.category_id,
        payload.amount_minor,
        payload.expected_date,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(received_at) = payload.received_at {
        cmd = cmd.received_at(received_at.with_timezone(&Utc));
    }

    let income = state.engine.new_income(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: income.id })))
}

pub async fn incomes(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<IncomeView>>, ServerError> {
    let year_month: YearMonth = query.month.parse()?;
    let incomes = state
        .engine
        .list_incomes(&user.username, year_month)
        .await?;
    Ok(Json(
        incomes
            .into_iter()
            .filter(|income| query.account_id.is_none_or(|id| income.account_id == id))
            .map(income_view)
            .collect(),
    ))
}

pub async fn receive(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(income_id): Path<Uuid>,
    payload: Option<Json<IncomeReceive>>,
) -> Result<Json<IncomeView>, ServerError> {
    let received_at = utc_or_now(payload.and_then(|Json(payload)| payload.received_at));
    let income = state
        .engine
        .receive_income(&user.username, income_id, received_at)
        .await?;
    Ok(Json(income_view(income)))
}

pub async fn income_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(income_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_income(&user.username, income_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
