//! Monthly budgets per expense category and the budget vs. spend summary.

use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Budget, Category, CategoryKind, EngineError, MoneyCents, ResultEngine, YearMonth, budgets,
    categories, entries,
};

use super::{Engine, balances::SUM_AMOUNT, with_tx};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetLine {
    pub category: Category,
    pub budget: MoneyCents,
    pub spent: MoneyCents,
}

impl BudgetLine {
    /// Negative when the category is over budget.
    #[must_use]
    pub fn remaining(&self) -> MoneyCents {
        self.budget - self.spent
    }
}

/// Spend in a category that has no budget for the month.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnbudgetedLine {
    pub category: Category,
    pub spent: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetSummary {
    pub year_month: YearMonth,
    pub lines: Vec<BudgetLine>,
    pub unbudgeted: Vec<UnbudgetedLine>,
    pub total_budget: MoneyCents,
    /// Spend of budgeted and unbudgeted categories.
    pub total_spent: MoneyCents,
}

fn by_name(a: &Category, b: &Category) -> std::cmp::Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

impl Engine {
    /// Join the budgets of a month with the actual spend.
    ///
    /// Spend is every non ignored entry due in the month, paid or not.
    pub async fn budget_summary(
        &self,
        user_id: &str,
        year_month: YearMonth,
    ) -> ResultEngine<BudgetSummary> {
        let db = &self.database;
        let budget_rows = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::YearMonth.eq(year_month.to_string()))
            .all(db)
            .await?;

        let spent_rows: Vec<(Uuid, i64)> = entries::Entity::find()
            .select_only()
            .column(entries::Column::CategoryId)
            .column_as(Expr::cust(SUM_AMOUNT), "spent")
            .filter(entries::Column::UserId.eq(user_id))
            .filter(entries::Column::Ignored.eq(false))
            .filter(entries::Column::DueDate.between(year_month.first_day(), year_month.last_day()))
            .group_by(entries::Column::CategoryId)
            .into_tuple()
            .all(db)
            .await?;
        let mut spent: HashMap<Uuid, i64> = spent_rows.into_iter().collect();

        let category_ids: HashSet<Uuid> = budget_rows
            .iter()
            .map(|row| row.category_id)
            .chain(spent.keys().copied())
            .collect();
        let mut categories: HashMap<Uuid, Category> = HashMap::new();
        for model in categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::Id.is_in(category_ids))
            .all(db)
            .await?
        {
            categories.insert(model.id, Category::try_from(model)?);
        }

        let mut lines = Vec::with_capacity(budget_rows.len());
        for row in budget_rows {
            let category = categories.remove(&row.category_id).ok_or_else(|| {
                EngineError::KeyNotFound("category not exists".to_string())
            })?;
            lines.push(BudgetLine {
                category,
                budget: MoneyCents::new(row.amount),
                spent: MoneyCents::new(spent.remove(&row.category_id).unwrap_or(0)),
            });
        }
        lines.sort_by(|a, b| by_name(&a.category, &b.category));

        // What is left in `spent` has no budget this month.
        let mut unbudgeted = Vec::new();
        for (category_id, cents) in spent {
            if cents == 0 {
                continue;
            }
            let category = categories.remove(&category_id).ok_or_else(|| {
                EngineError::KeyNotFound("category not exists".to_string())
            })?;
            unbudgeted.push(UnbudgetedLine {
                category,
                spent: MoneyCents::new(cents),
            });
        }
        unbudgeted.sort_by(|a, b| by_name(&a.category, &b.category));

        let total_budget = lines.iter().map(|line| line.budget).sum();
        let total_spent = lines
            .iter()
            .map(|line| line.spent)
            .chain(unbudgeted.iter().map(|line| line.spent))
            .sum();

        Ok(BudgetSummary {
            year_month,
            lines,
            unbudgeted,
            total_budget,
            total_spent,
        })
    }

    /// Set the budget of a category for a month, replacing any previous amount.
    pub async fn set_budget(
        &self,
        user_id: &str,
        category_id: Uuid,
        year_month: YearMonth,
        amount_minor: i64,
    ) -> ResultEngine<Budget> {
        if amount_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "budget amount must not be negative".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, user_id, category_id, CategoryKind::Expense)
                .await?;

            let existing = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .filter(budgets::Column::CategoryId.eq(category_id))
                .filter(budgets::Column::YearMonth.eq(year_month.to_string()))
                .one(&db_tx)
                .await?;

            let model = match existing {
                Some(existing) => {
                    budgets::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        amount: ActiveValue::Set(amount_minor),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?
                }
                None => {
                    budgets::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        user_id: ActiveValue::Set(user_id.to_string()),
                        category_id: ActiveValue::Set(category_id),
                        year_month: ActiveValue::Set(year_month.to_string()),
                        amount: ActiveValue::Set(amount_minor),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            Budget::try_from(model)
        })
    }

    pub async fn delete_budget(
        &self,
        user_id: &str,
        category_id: Uuid,
        year_month: YearMonth,
    ) -> ResultEngine<()> {
        let result = budgets::Entity::delete_many()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::CategoryId.eq(category_id))
            .filter(budgets::Column::YearMonth.eq(year_month.to_string()))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("budget not exists".to_string()));
        }
        Ok(())
    }

    pub async fn list_budgets(
        &self,
        user_id: &str,
        year_month: YearMonth,
    ) -> ResultEngine<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::YearMonth.eq(year_month.to_string()))
            .order_by_asc(budgets::Column::CategoryId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }

    /// Copy the budgets of `from` into `to`, keeping lines `to` already has.
    ///
    /// Returns the number of budgets created.
    pub async fn copy_budgets(
        &self,
        user_id: &str,
        from: YearMonth,
        to: YearMonth,
    ) -> ResultEngine<usize> {
        if from == to {
            return Err(EngineError::InvalidDate(
                "source and target month must differ".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let source = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .filter(budgets::Column::YearMonth.eq(from.to_string()))
                .all(&db_tx)
                .await?;
            let present: HashSet<Uuid> = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .filter(budgets::Column::YearMonth.eq(to.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|row| row.category_id)
                .collect();

            let mut created = 0;
            for row in source {
                if present.contains(&row.category_id) {
                    continue;
                }
                budgets::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    category_id: ActiveValue::Set(row.category_id),
                    year_month: ActiveValue::Set(to.to_string()),
                    amount: ActiveValue::Set(row.amount),
                }
                .insert(&db_tx)
                .await?;
                created += 1;
            }
            Ok(created)
        })
    }
}
