mod common;

use common::{account, at, category, corrupt_balance, day, engine_with_db};
use engine::{
    AccountKind, CategoryKind, EngineError, EntryCmd, IncomeCmd, MoneyCents, ReceiptStatus,
    TransferCmd,
};
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn balance_is_received_income_plus_transfers_in_minus_paid_and_out() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let savings = account(&engine, "alice", "Savings", AccountKind::Savings).await;
    let salary = category(&engine, "alice", "Salary", CategoryKind::Income).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;

    engine
        .new_income(
            IncomeCmd::new("alice", checking.id, salary.id, 500_000, day(2026, 1, 5))
                .received_at(at(2026, 1, 5, 9, 0)),
        )
        .await
        .unwrap();
    engine
        .new_income(IncomeCmd::new(
            "alice",
            checking.id,
            salary.id,
            100_000,
            day(2026, 1, 20),
        ))
        .await
        .unwrap();
    engine
        .new_entry(
            EntryCmd::new("alice", checking.id, food.id, 30_000, day(2026, 1, 7))
                .paid_at(at(2026, 1, 7, 12, 0)),
        )
        .await
        .unwrap();
    engine
        .new_entry(EntryCmd::new(
            "alice",
            checking.id,
            food.id,
            20_000,
            day(2026, 1, 25),
        ))
        .await
        .unwrap();
    engine
        .new_transfer(TransferCmd {
            user_id: "alice".to_string(),
            from_account_id: checking.id,
            to_account_id: savings.id,
            amount_minor: 50_000,
            occurred_at: at(2026, 1, 8, 10, 0),
            description: Some("monthly saving".to_string()),
        })
        .await
        .unwrap();
    engine
        .new_transfer(TransferCmd {
            user_id: "alice".to_string(),
            from_account_id: savings.id,
            to_account_id: checking.id,
            amount_minor: 10_000,
            occurred_at: at(2026, 1, 9, 10, 0),
            description: None,
        })
        .await
        .unwrap();

    let breakdown = engine.account_balance("alice", checking.id).await.unwrap();
    assert_eq!(breakdown.received_income, MoneyCents::new(500_000));
    assert_eq!(breakdown.paid_expenses, MoneyCents::new(30_000));
    assert_eq!(breakdown.transfers_in, MoneyCents::new(10_000));
    assert_eq!(breakdown.transfers_out, MoneyCents::new(50_000));
    assert_eq!(breakdown.balance(), MoneyCents::new(430_000));

    // Every write keeps the cache in line with the ledger.
    let checking = engine.account("alice", checking.id).await.unwrap();
    assert_eq!(checking.current_balance, MoneyCents::new(430_000));
    let savings = engine.account("alice", savings.id).await.unwrap();
    assert_eq!(savings.current_balance, MoneyCents::new(40_000));
}

#[tokio::test]
async fn reconcile_account_repairs_a_drifted_cache() {
    let (engine, db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let salary = category(&engine, "alice", "Salary", CategoryKind::Income).await;
    engine
        .new_income(
            IncomeCmd::new("alice", checking.id, salary.id, 120_000, day(2026, 1, 5))
                .received_at(at(2026, 1, 5, 9, 0)),
        )
        .await
        .unwrap();

    corrupt_balance(&db, &checking, 1).await;
    assert_eq!(
        engine
            .account("alice", checking.id)
            .await
            .unwrap()
            .current_balance,
        MoneyCents::new(1)
    );

    assert!(engine.reconcile_account("alice", checking.id).await.unwrap());
    assert!(!engine.reconcile_account("alice", checking.id).await.unwrap());
    assert_eq!(
        engine
            .account("alice", checking.id)
            .await
            .unwrap()
            .current_balance,
        MoneyCents::new(120_000)
    );
}

#[tokio::test]
async fn income_counts_only_once_received() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let salary = category(&engine, "alice", "Salary", CategoryKind::Income).await;

    let income = engine
        .new_income(IncomeCmd::new(
            "alice",
            checking.id,
            salary.id,
            75_050,
            day(2026, 2, 1),
        ))
        .await
        .unwrap();
    assert_eq!(income.receipt, ReceiptStatus::Pending);
    let before = engine.account_balance("alice", checking.id).await.unwrap();
    assert_eq!(before.balance(), MoneyCents::ZERO);

    let received = engine
        .receive_income("alice", income.id, at(2026, 2, 1, 8, 0))
        .await
        .unwrap();
    assert_eq!(
        received.receipt,
        ReceiptStatus::Received {
            at: at(2026, 2, 1, 8, 0)
        }
    );
    let after = engine.account_balance("alice", checking.id).await.unwrap();
    assert_eq!(after.balance() - before.balance(), MoneyCents::new(75_050));

    let err = engine
        .receive_income("alice", income.id, at(2026, 2, 2, 8, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn ignored_entries_still_move_the_balance_when_paid() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let misc = category(&engine, "alice", "Misc", CategoryKind::Expense).await;

    engine
        .new_entry(
            EntryCmd::new("alice", checking.id, misc.id, 4_500, day(2026, 3, 2))
                .paid_at(at(2026, 3, 2, 18, 0))
                .ignored(true),
        )
        .await
        .unwrap();

    let breakdown = engine.account_balance("alice", checking.id).await.unwrap();
    assert_eq!(breakdown.paid_expenses, MoneyCents::new(4_500));
    assert_eq!(breakdown.balance(), MoneyCents::new(-4_500));
}

#[tokio::test]
async fn paying_and_unpaying_an_entry_resyncs_the_cache() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let rent = category(&engine, "alice", "Rent", CategoryKind::Expense).await;

    let entry = engine
        .new_entry(
            EntryCmd::new("alice", checking.id, rent.id, 150_000, day(2026, 3, 5))
                .description("March rent"),
        )
        .await
        .unwrap();
    assert!(!entry.payment.is_paid());

    engine
        .pay_entry("alice", entry.id, at(2026, 3, 5, 9, 0))
        .await
        .unwrap();
    assert_eq!(
        engine
            .account("alice", checking.id)
            .await
            .unwrap()
            .current_balance,
        MoneyCents::new(-150_000)
    );

    engine.unpay_entry("alice", entry.id).await.unwrap();
    assert_eq!(
        engine
            .account("alice", checking.id)
            .await
            .unwrap()
            .current_balance,
        MoneyCents::ZERO
    );

    engine.delete_entry("alice", entry.id).await.unwrap();
    let err = engine.entry("alice", entry.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn reconcile_all_covers_every_user() {
    let (engine, db) = engine_with_db().await;
    common::add_user(&db, "bruno").await;
    let alice = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let bruno = account(&engine, "bruno", "Checking", AccountKind::Checking).await;
    let untouched = account(&engine, "bruno", "Savings", AccountKind::Savings).await;

    corrupt_balance(&db, &alice, 10).await;
    corrupt_balance(&db, &bruno, -20).await;

    let report = engine.reconcile_all().await.unwrap();
    assert_eq!(report.users, 2);
    assert_eq!(report.accounts_updated, 2);
    assert_eq!(report.failed_users, 0);

    for (user, id) in [("alice", alice.id), ("bruno", bruno.id), ("bruno", untouched.id)] {
        let account = engine.account(user, id).await.unwrap();
        assert_eq!(account.current_balance, MoneyCents::ZERO);
    }
    assert_eq!(engine.reconcile_user("bruno").await.unwrap(), 0);
}

#[tokio::test]
async fn reconcile_all_skips_a_failing_user() {
    let (engine, db) = engine_with_db().await;
    common::add_user(&db, "bruno").await;
    let alice = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let bruno = account(&engine, "bruno", "Checking", AccountKind::Checking).await;
    let savings = account(&engine, "bruno", "Savings", AccountKind::Savings).await;
    let salary = category(&engine, "bruno", "Salary", CategoryKind::Income).await;

    // Two maximal incomes overflow the SQL sum once both are received.
    for day_of_month in [5, 20] {
        engine
            .new_income(IncomeCmd::new(
                "bruno",
                bruno.id,
                salary.id,
                i64::MAX,
                day(2026, 1, day_of_month),
            ))
            .await
            .unwrap();
    }
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE incomes SET received_at = ? WHERE account_id = ?",
        vec![at(2026, 1, 5, 9, 0).into(), bruno.id.into()],
    ))
    .await
    .unwrap();

    corrupt_balance(&db, &alice, 10).await;
    corrupt_balance(&db, &savings, -20).await;

    let report = engine.reconcile_all().await.unwrap();
    assert_eq!(report.users, 2);
    assert_eq!(report.accounts_updated, 1);
    assert_eq!(report.failed_users, 1);

    let alice = engine.account("alice", alice.id).await.unwrap();
    assert_eq!(alice.current_balance, MoneyCents::ZERO);
    // Bruno's transaction rolled back as a whole.
    let savings = engine.account("bruno", savings.id).await.unwrap();
    assert_eq!(savings.current_balance, MoneyCents::new(-20));
    assert!(matches!(
        engine.reconcile_user("bruno").await,
        Err(EngineError::Database(_))
    ));
}

#[tokio::test]
async fn accounts_of_other_users_are_not_found() {
    let (engine, db) = engine_with_db().await;
    common::add_user(&db, "bruno").await;
    let bruno = account(&engine, "bruno", "Checking", AccountKind::Checking).await;

    let err = engine.account_balance("alice", bruno.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.reconcile_account("alice", bruno.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn transfers_reject_same_account_and_non_positive_amounts() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let savings = account(&engine, "alice", "Savings", AccountKind::Savings).await;

    let cmd = TransferCmd {
        user_id: "alice".to_string(),
        from_account_id: checking.id,
        to_account_id: checking.id,
        amount_minor: 1_000,
        occurred_at: at(2026, 1, 1, 0, 0),
        description: None,
    };
    let err = engine.new_transfer(cmd.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    let err = engine
        .new_transfer(TransferCmd {
            to_account_id: savings.id,
            amount_minor: 0,
            ..cmd
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn account_names_are_unique_ignoring_case_and_accents() {
    let (engine, _db) = engine_with_db().await;
    account(&engine, "alice", "Poupança", AccountKind::Savings).await;

    let err = engine
        .new_account(engine::AccountCmd {
            user_id: "alice".to_string(),
            name: "  POUPANCA ".to_string(),
            kind: AccountKind::Savings,
            due_day: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}
