mod common;

use common::{account, at, card, category, corrupt_balance, day, engine_with_db};
use engine::{
    AccountKind, CategoryKind, CronJob, EntryCmd, EventCmd, JobOutcome, JobResult, LogPushSender,
};
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn daily_jobs_run_together() {
    let (engine, db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let visa = card(&engine, "alice", "Visa", 10).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;

    engine
        .new_entry(EntryCmd::new("alice", visa.id, food.id, 2_000, day(2026, 1, 4)))
        .await
        .unwrap();
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DELETE FROM faturas",
    ))
    .await
    .unwrap();
    corrupt_balance(&db, &checking, 777).await;
    engine
        .new_event(EventCmd {
            user_id: "alice".to_string(),
            title: "Dentist".to_string(),
            start_at: at(2026, 1, 5, 9, 0),
            end_at: at(2026, 1, 5, 10, 0),
            recurrence_rule: None,
        })
        .await
        .unwrap();

    let report = engine
        .run_jobs(
            &CronJob::ALL,
            at(2026, 1, 6, 3, 0),
            day(2026, 1, 6),
            &LogPushSender,
        )
        .await;

    assert!(report.success());
    assert_eq!(report.outcomes.len(), 4);
    match report.outcome(CronJob::Balances) {
        Some(JobOutcome::Ok(JobResult::Balances(balances))) => {
            assert_eq!(balances.users, 1);
            assert_eq!(balances.accounts_updated, 1);
        }
        other => panic!("unexpected balances outcome: {other:?}"),
    }
    assert_eq!(
        report.outcome(CronJob::Faturas),
        Some(&JobOutcome::Ok(JobResult::Faturas { created: 1 }))
    );
    match report.outcome(CronJob::Statuses) {
        Some(JobOutcome::Ok(JobResult::Statuses(statuses))) => {
            assert_eq!(statuses.events_completed, 1);
        }
        other => panic!("unexpected statuses outcome: {other:?}"),
    }
    assert!(report.outcome(CronJob::Reminders).is_some_and(JobOutcome::is_ok));
}

#[tokio::test]
async fn only_selected_jobs_run() {
    let (engine, _db) = engine_with_db().await;
    let jobs = CronJob::parse_list("reminders").unwrap();

    let report = engine
        .run_jobs(&jobs, at(2026, 1, 6, 3, 0), day(2026, 1, 6), &LogPushSender)
        .await;

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcome(CronJob::Balances).is_none());
    assert!(report.outcome(CronJob::Reminders).is_some());
}
