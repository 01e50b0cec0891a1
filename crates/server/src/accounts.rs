//! Accounts API endpoints.

use api_types::{
    Created,
    account::{
        AccountKind, AccountList, AccountNew, AccountUpdate, AccountView, BalanceView, Reconciled,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn kind_to_engine(kind: AccountKind) -> engine::AccountKind {
    match kind {
        AccountKind::Checking => engine::AccountKind::Checking,
        AccountKind::Savings => engine::AccountKind::Savings,
        AccountKind::CreditCard => engine::AccountKind::CreditCard,
    }
}

fn kind_from_engine(kind: engine::AccountKind) -> AccountKind {
    match kind {
        engine::AccountKind::Checking => AccountKind::Checking,
        engine::AccountKind::Savings => AccountKind::Savings,
        engine::AccountKind::CreditCard => AccountKind::CreditCard,
    }
}

fn account_view(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        kind: kind_from_engine(account.kind),
        current_balance_minor: account.current_balance.cents(),
        due_day: account.due_day,
        archived: account.archived,
    }
}

pub async fn account_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let account = state
        .engine
        .new_account(engine::AccountCmd {
            user_id: user.username,
            name: payload.name,
            kind: kind_to_engine(payload.kind),
            due_day: payload.due_day,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: account.id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<AccountList>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state
        .engine
        .list_accounts(&user.username, query.include_archived.unwrap_or(false))
        .await?;
    Ok(Json(accounts.into_iter().map(account_view).collect()))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    if payload.due_day.is_none() && payload.archived.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of due_day or archived".to_string(),
        ));
    }

    let mut account = None;
    if let Some(due_day) = payload.due_day {
        account = Some(
            state
                .engine
                .set_account_due_day(&user.username, account_id, due_day)
                .await?,
        );
    }
    if let Some(archived) = payload.archived {
        account = Some(
            state
                .engine
                .set_account_archived(&user.username, account_id, archived)
                .await?,
        );
    }

    let account = match account {
        Some(account) => account,
        None => state.engine.account(&user.username, account_id).await?,
    };
    Ok(Json(account_view(account)))
}

/// Balance recomputed from the ledger, regardless of the cached value.
pub async fn balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    let breakdown = state
        .engine
        .account_balance(&user.username, account_id)
        .await?;

    Ok(Json(BalanceView {
        account_id,
        received_income_minor: breakdown.received_income.cents(),
        paid_expenses_minor: breakdown.paid_expenses.cents(),
        transfers_in_minor: breakdown.transfers_in.cents(),
        transfers_out_minor: breakdown.transfers_out.cents(),
        balance_minor: breakdown.balance().cents(),
    }))
}

pub async fn reconcile(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Reconciled>, ServerError> {
    let updated = state
        .engine
        .reconcile_account(&user.username, account_id)
        .await?;
    Ok(Json(Reconciled {
        accounts_updated: usize::from(updated),
    }))
}

pub async fn reconcile_all(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Reconciled>, ServerError> {
    let accounts_updated = state.engine.reconcile_user(&user.username).await?;
    Ok(Json(Reconciled { accounts_updated }))
}
