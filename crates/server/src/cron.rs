//! Scheduled job endpoints, called by an external scheduler.
//!
//! Both endpoints authenticate with `Authorization: Bearer <cron secret>`
//! and accept an optional `job` query parameter with a comma separated
//! subset of jobs to run.

use api_types::cron::{
    BalancesResult, CronQuery, CronResponse, FaturasResult, JobResponse, RemindersResult,
    StatusesResult,
};
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use chrono::Utc;
use engine::{CronJob, CronReport, JobOutcome, JobResult};

use crate::{ServerError, server::ServerState};

const NOTIFICATION_JOBS: [CronJob; 1] = [CronJob::Reminders];

/// Balances, statuses, fatura backfill and reminders.
pub async fn daily(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<CronQuery>,
) -> Result<Json<CronResponse>, ServerError> {
    run(&state, &headers, query, &CronJob::ALL).await
}

/// Reminders only, meant to be called more often than the daily run.
pub async fn notifications(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<CronQuery>,
) -> Result<Json<CronResponse>, ServerError> {
    run(&state, &headers, query, &NOTIFICATION_JOBS).await
}

async fn run(
    state: &ServerState,
    headers: &HeaderMap,
    query: CronQuery,
    defaults: &[CronJob],
) -> Result<Json<CronResponse>, ServerError> {
    authorize(state, headers)?;

    let jobs = match query.job.as_deref() {
        Some(job) => {
            CronJob::parse_list(job).map_err(|err| ServerError::Generic(err.to_string()))?
        }
        None => Vec::new(),
    };
    let jobs = if jobs.is_empty() {
        defaults.to_vec()
    } else {
        jobs
    };

    let report = state
        .engine
        .run_jobs(&jobs, Utc::now(), state.today(), &state.push)
        .await;
    tracing::info!(
        jobs = jobs.len(),
        success = report.success(),
        "cron run finished"
    );
    Ok(Json(cron_response(report)))
}

fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), ServerError> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Err(ServerError::Misconfigured(
            "cron secret is not configured".to_string(),
        ));
    };

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if secrets_match(token, secret) => Ok(()),
        _ => Err(ServerError::Unauthorized),
    }
}

/// Byte comparison without an early exit.
fn secrets_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

fn job_response<T>(
    outcome: &JobOutcome,
    done: impl FnOnce(JobResult) -> Option<T>,
) -> Option<JobResponse<T>> {
    match outcome {
        JobOutcome::Ok(result) => done(*result).map(JobResponse::Done),
        JobOutcome::Failed(error) => Some(JobResponse::Failed {
            error: error.clone(),
        }),
    }
}

fn cron_response(report: CronReport) -> CronResponse {
    let mut response = CronResponse {
        success: report.success(),
        ..Default::default()
    };

    for (job, outcome) in &report.outcomes {
        match job {
            CronJob::Balances => {
                response.balances = job_response(outcome, |result| match result {
                    JobResult::Balances(report) => Some(BalancesResult {
                        users: report.users,
                        accounts_updated: report.accounts_updated,
                        failed_users: report.failed_users,
                    }),
                    _ => None,
                });
            }
            CronJob::Statuses => {
                response.statuses = job_response(outcome, |result| match result {
                    JobResult::Statuses(report) => Some(StatusesResult {
                        events_completed: report.events_completed,
                        tasks_overdue: report.tasks_overdue,
                    }),
                    _ => None,
                });
            }
            CronJob::Faturas => {
                response.faturas = job_response(outcome, |result| match result {
                    JobResult::Faturas { created } => Some(FaturasResult { created }),
                    _ => None,
                });
            }
            CronJob::Reminders => {
                response.reminders = job_response(outcome, |result| match result {
                    JobResult::Reminders(report) => Some(RemindersResult {
                        sent: report.sent,
                        failed: report.failed,
                        pruned: report.pruned,
                    }),
                    _ => None,
                });
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use engine::{DeliveryReport, ReconcileReport};

    use super::*;

    #[test]
    fn secrets_match_whole_value_only() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3creT", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("s3crets", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }

    #[test]
    fn failed_job_turns_response_unsuccessful() {
        let report = CronReport {
            outcomes: vec![
                (
                    CronJob::Balances,
                    JobOutcome::Ok(JobResult::Balances(ReconcileReport {
                        users: 2,
                        accounts_updated: 1,
                        failed_users: 0,
                    })),
                ),
                (
                    CronJob::Reminders,
                    JobOutcome::Failed("database is locked".to_string()),
                ),
            ],
        };

        let response = cron_response(report);
        assert!(!response.success);
        assert_eq!(
            response.balances,
            Some(JobResponse::Done(BalancesResult {
                users: 2,
                accounts_updated: 1,
                failed_users: 0,
            }))
        );
        assert_eq!(
            response.reminders,
            Some(JobResponse::Failed {
                error: "database is locked".to_string()
            })
        );
        assert_eq!(response.statuses, None);
        assert_eq!(response.faturas, None);
    }

    #[test]
    fn reminders_only_report() {
        let report = CronReport {
            outcomes: vec![(
                CronJob::Reminders,
                JobOutcome::Ok(JobResult::Reminders(DeliveryReport {
                    sent: 3,
                    failed: 0,
                    pruned: 1,
                })),
            )],
        };

        let response = cron_response(report);
        assert!(response.success);
        assert_eq!(
            response.reminders,
            Some(JobResponse::Done(RemindersResult {
                sent: 3,
                failed: 0,
                pruned: 1,
            }))
        );
        assert_eq!(response.balances, None);
    }
}
