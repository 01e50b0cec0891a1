//! Budgets API endpoints.

use api_types::budget::{
    BudgetCopied, BudgetCopy, BudgetLineView, BudgetSet, BudgetSummaryView, BudgetView,
    UnbudgetedView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::YearMonth;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

/// Create or replace the budget of a category for a month.
pub async fn set(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetSet>,
) -> Result<Json<BudgetView>, ServerError> {
    let year_month: YearMonth = payload.year_month.parse()?;
    let budget = state
        .engine
        .set_budget(
            &user.username,
            payload.category_id,
            year_month,
            payload.amount_minor,
        )
        .await?;

    Ok(Json(BudgetView {
        id: budget.id,
        category_id: budget.category_id,
        year_month: budget.year_month.to_string(),
        amount_minor: budget.amount.cents(),
    }))
}

pub async fn summary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(year_month): Path<String>,
) -> Result<Json<BudgetSummaryView>, ServerError> {
    let year_month: YearMonth = year_month.parse()?;
    let summary = state
        .engine
        .budget_summary(&user.username, year_month)
        .await?;

    Ok(Json(BudgetSummaryView {
        year_month: summary.year_month.to_string(),
        lines: summary
            .lines
            .iter()
            .map(|line| BudgetLineView {
                category_id: line.category.id,
                category_name: line.category.name.clone(),
                budget_minor: line.budget.cents(),
                spent_minor: line.spent.cents(),
                remaining_minor: line.remaining().cents(),
            })
            .collect(),
        unbudgeted: summary
            .unbudgeted
            .into_iter()
            .map(|line| UnbudgetedView {
                category_id: line.category.id,
                category_name: line.category.name,
                spent_minor: line.spent.cents(),
            })
            .collect(),
        total_budget_minor: summary.total_budget.cents(),
        total_spent_minor: summary.total_spent.cents(),
    }))
}

pub async fn copy(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetCopy>,
) -> Result<Json<BudgetCopied>, ServerError> {
    let from: YearMonth = payload.from.parse()?;
    let to: YearMonth = payload.to.parse()?;
    let created = state.engine.copy_budgets(&user.username, from, to).await?;
    Ok(Json(BudgetCopied { created }))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((year_month, category_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    let year_month: YearMonth = year_month.parse()?;
    state
        .engine
        .delete_budget(&user.username, category_id, year_month)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
