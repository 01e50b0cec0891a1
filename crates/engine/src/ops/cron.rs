//! Scheduled batch jobs.
//!
//! The HTTP cron endpoints and the admin CLI select jobs by name and run them
//! through [`Engine::run_jobs`]. Selected jobs run concurrently and one job
//! failing never stops the others.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};

use crate::{EngineError, PushSender};

use super::{DeliveryReport, Engine, ReconcileReport, StatusUpdateReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CronJob {
    /// Reconcile every cached account balance.
    Balances,
    /// Complete elapsed events and flag overdue tasks.
    Statuses,
    /// Backfill missing faturas.
    Faturas,
    /// Push due-soon reminders.
    Reminders,
}

impl CronJob {
    pub const ALL: [CronJob; 4] = [
        CronJob::Balances,
        CronJob::Statuses,
        CronJob::Faturas,
        CronJob::Reminders,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balances => "balances",
            Self::Statuses => "statuses",
            Self::Faturas => "faturas",
            Self::Reminders => "reminders",
        }
    }

    /// Parse a comma separated job list such as `"balances,statuses"`.
    ///
    /// Blank input selects nothing; duplicates collapse.
    pub fn parse_list(value: &str) -> Result<Vec<CronJob>, EngineError> {
        let mut jobs = Vec::new();
        for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let job = name.parse()?;
            if !jobs.contains(&job) {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

impl fmt::Display for CronJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CronJob {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balances" => Ok(Self::Balances),
            "statuses" => Ok(Self::Statuses),
            "faturas" => Ok(Self::Faturas),
            "reminders" => Ok(Self::Reminders),
            other => Err(EngineError::InvalidName(format!("unknown job: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobResult {
    Balances(ReconcileReport),
    Statuses(StatusUpdateReport),
    Faturas { created: usize },
    Reminders(DeliveryReport),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Ok(JobResult),
    Failed(String),
}

impl JobOutcome {
    fn from_result(job: CronJob, result: Result<JobResult, EngineError>) -> Self {
        match result {
            Ok(result) => Self::Ok(result),
            Err(err) => {
                tracing::error!(job = %job, "cron job failed: {err}");
                Self::Failed(err.to_string())
            }
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Outcome of every job that ran, in [`CronJob::ALL`] order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CronReport {
    pub outcomes: Vec<(CronJob, JobOutcome)>,
}

impl CronReport {
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    #[must_use]
    pub fn outcome(&self, job: CronJob) -> Option<&JobOutcome> {
        self.outcomes
            .iter()
            .find(|(ran, _)| *ran == job)
            .map(|(_, outcome)| outcome)
    }
}

impl Engine {
    /// Run the selected jobs concurrently.
    ///
    /// `now` drives the status updater and `today` the reminders, so callers
    /// decide which calendar day "today" is.
    pub async fn run_jobs<S: PushSender>(
        &self,
        jobs: &[CronJob],
        now: DateTime<Utc>,
        today: NaiveDate,
        sender: &S,
    ) -> CronReport {
        let wants = |job: CronJob| jobs.contains(&job);

        let (balances, statuses, faturas, reminders) = tokio::join!(
            async {
                if wants(CronJob::Balances) {
                    Some(self.reconcile_all().await.map(JobResult::Balances))
                } else {
                    None
                }
            },
            async {
                if wants(CronJob::Statuses) {
                    Some(self.update_statuses(now).await.map(JobResult::Statuses))
                } else {
                    None
                }
            },
            async {
                if wants(CronJob::Faturas) {
                    Some(
                        self.backfill_faturas(None)
                            .await
                            .map(|created| JobResult::Faturas { created }),
                    )
                } else {
                    None
                }
            },
            async {
                if wants(CronJob::Reminders) {
                    Some(
                        self.send_due_reminders(today, sender)
                            .await
                            .map(JobResult::Reminders),
                    )
                } else {
                    None
                }
            },
        );

        let mut report = CronReport::default();
        for (job, result) in [
            (CronJob::Balances, balances),
            (CronJob::Statuses, statuses),
            (CronJob::Faturas, faturas),
            (CronJob::Reminders, reminders),
        ] {
            if let Some(result) = result {
                report
                    .outcomes
                    .push((job, JobOutcome::from_result(job, result)));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_list_parses_and_dedups() {
        assert_eq!(
            CronJob::parse_list("balances, Statuses,balances").unwrap(),
            vec![CronJob::Balances, CronJob::Statuses]
        );
        assert!(CronJob::parse_list("").unwrap().is_empty());
        assert!(matches!(
            CronJob::parse_list("balances,laundry"),
            Err(EngineError::InvalidName(_))
        ));
    }

    #[test]
    fn report_fails_when_any_job_failed() {
        let report = CronReport {
            outcomes: vec![
                (
                    CronJob::Faturas,
                    JobOutcome::Ok(JobResult::Faturas { created: 2 }),
                ),
                (CronJob::Reminders, JobOutcome::Failed("boom".to_string())),
            ],
        };
        assert!(!report.success());
        assert!(report.outcome(CronJob::Faturas).unwrap().is_ok());
        assert!(report.outcome(CronJob::Balances).is_none());
    }
}
