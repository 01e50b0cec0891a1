use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{EventStatus, ResultEngine, TaskStatus, events, tasks};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusUpdateReport {
    pub events_completed: u64,
    pub tasks_overdue: u64,
}

impl Engine {
    /// Move elapsed items forward: scheduled events that ended before `now`
    /// become completed and open tasks due before `now` become overdue.
    ///
    /// Running it again with the same `now` changes nothing.
    pub async fn update_statuses(&self, now: DateTime<Utc>) -> ResultEngine<StatusUpdateReport> {
        let report = with_tx!(self, |db_tx| {
            let events_completed = events::Entity::update_many()
                .col_expr(
                    events::Column::Status,
                    Expr::value(EventStatus::Completed.as_str()),
                )
                .filter(events::Column::Status.eq(EventStatus::Scheduled.as_str()))
                .filter(events::Column::EndAt.lt(now))
                .exec(&db_tx)
                .await?
                .rows_affected;

            let tasks_overdue = tasks::Entity::update_many()
                .col_expr(tasks::Column::Status, Expr::value(TaskStatus::Overdue.as_str()))
                .filter(tasks::Column::Status.is_in([
                    TaskStatus::Pending.as_str(),
                    TaskStatus::InProgress.as_str(),
                ]))
                .filter(tasks::Column::DueAt.is_not_null())
                .filter(tasks::Column::DueAt.lt(now))
                .exec(&db_tx)
                .await?
                .rows_affected;

            Ok::<_, crate::EngineError>(StatusUpdateReport {
                events_completed,
                tasks_overdue,
            })
        })?;

        tracing::info!(
            events_completed = report.events_completed,
            tasks_overdue = report.tasks_overdue,
            "statuses updated"
        );
        Ok(report)
    }
}
