mod common;

use common::{account, at, category, day, engine_with_db};
use engine::{AccountKind, CategoryCmd, CategoryKind, EngineError, EntryCmd, MoneyCents, YearMonth};

#[tokio::test]
async fn summary_joins_budgets_with_spend_of_the_month() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let groceries = category(&engine, "alice", "Groceries", CategoryKind::Expense).await;
    let leisure = category(&engine, "alice", "Leisure", CategoryKind::Expense).await;
    let health = category(&engine, "alice", "Health", CategoryKind::Expense).await;
    let march = YearMonth::new(2026, 3).unwrap();

    engine
        .set_budget("alice", groceries.id, march, 50_000)
        .await
        .unwrap();
    engine
        .set_budget("alice", health.id, march, 0)
        .await
        .unwrap();

    for (category_id, cents, date) in [
        (groceries.id, 20_000, day(2026, 3, 1)),
        (groceries.id, 10_000, day(2026, 3, 31)),
        (leisure.id, 10_000, day(2026, 3, 15)),
        // Outside of the month.
        (groceries.id, 99_900, day(2026, 4, 1)),
        (leisure.id, 99_900, day(2026, 2, 28)),
    ] {
        engine
            .new_entry(EntryCmd::new("alice", checking.id, category_id, cents, date))
            .await
            .unwrap();
    }
    // Paid or not, spend counts; ignored entries never do.
    engine
        .new_entry(
            EntryCmd::new("alice", checking.id, leisure.id, 5_000, day(2026, 3, 20))
                .paid_at(at(2026, 3, 20, 12, 0))
                .ignored(true),
        )
        .await
        .unwrap();

    let summary = engine.budget_summary("alice", march).await.unwrap();
    assert_eq!(summary.year_month, march);
    assert_eq!(summary.lines.len(), 2);

    let first = &summary.lines[0];
    assert_eq!(first.category.id, groceries.id);
    assert_eq!(first.budget, MoneyCents::new(50_000));
    assert_eq!(first.spent, MoneyCents::new(30_000));
    assert_eq!(first.remaining(), MoneyCents::new(20_000));

    let second = &summary.lines[1];
    assert_eq!(second.category.id, health.id);
    assert_eq!(second.spent, MoneyCents::ZERO);

    assert_eq!(summary.unbudgeted.len(), 1);
    assert_eq!(summary.unbudgeted[0].category.id, leisure.id);
    assert_eq!(summary.unbudgeted[0].spent, MoneyCents::new(10_000));

    assert_eq!(summary.total_budget, MoneyCents::new(50_000));
    assert_eq!(summary.total_spent, MoneyCents::new(40_000));
}

#[tokio::test]
async fn summary_of_an_empty_month_is_empty() {
    let (engine, _db) = engine_with_db().await;
    let summary = engine
        .budget_summary("alice", YearMonth::new(2026, 1).unwrap())
        .await
        .unwrap();
    assert!(summary.lines.is_empty());
    assert!(summary.unbudgeted.is_empty());
    assert_eq!(summary.total_budget, MoneyCents::ZERO);
    assert_eq!(summary.total_spent, MoneyCents::ZERO);
}

#[tokio::test]
async fn over_budget_lines_have_negative_remaining() {
    let (engine, _db) = engine_with_db().await;
    let checking = account(&engine, "alice", "Checking", AccountKind::Checking).await;
    let fuel = category(&engine, "alice", "Fuel", CategoryKind::Expense).await;
    let may = YearMonth::new(2026, 5).unwrap();

    engine.set_budget("alice", fuel.id, may, 10_000).await.unwrap();
    engine
        .new_entry(EntryCmd::new(
            "alice",
            checking.id,
            fuel.id,
            12_550,
            day(2026, 5, 3),
        ))
        .await
        .unwrap();

    let summary = engine.budget_summary("alice", may).await.unwrap();
    assert_eq!(summary.lines[0].remaining(), MoneyCents::new(-2_550));
}

#[tokio::test]
async fn set_budget_replaces_the_previous_amount() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    let june = YearMonth::new(2026, 6).unwrap();

    let first = engine.set_budget("alice", food.id, june, 30_000).await.unwrap();
    let second = engine.set_budget("alice", food.id, june, 45_000).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.amount, MoneyCents::new(45_000));

    let budgets = engine.list_budgets("alice", june).await.unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].amount, MoneyCents::new(45_000));

    engine.delete_budget("alice", food.id, june).await.unwrap();
    assert!(engine.list_budgets("alice", june).await.unwrap().is_empty());
    let err = engine.delete_budget("alice", food.id, june).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn budgets_need_an_expense_category_and_a_non_negative_amount() {
    let (engine, _db) = engine_with_db().await;
    let salary = category(&engine, "alice", "Salary", CategoryKind::Income).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    let july = YearMonth::new(2026, 7).unwrap();

    let err = engine
        .set_budget("alice", salary.id, july, 1_000)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    let err = engine
        .set_budget("alice", food.id, july, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn copy_budgets_keeps_existing_lines_and_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    let rent = category(&engine, "alice", "Rent", CategoryKind::Expense).await;
    let aug = YearMonth::new(2026, 8).unwrap();
    let sep = aug.next();

    engine.set_budget("alice", food.id, aug, 40_000).await.unwrap();
    engine.set_budget("alice", rent.id, aug, 150_000).await.unwrap();
    engine.set_budget("alice", rent.id, sep, 160_000).await.unwrap();

    assert_eq!(engine.copy_budgets("alice", aug, sep).await.unwrap(), 1);
    assert_eq!(engine.copy_budgets("alice", aug, sep).await.unwrap(), 0);

    let copied = engine.list_budgets("alice", sep).await.unwrap();
    assert_eq!(copied.len(), 2);
    let rent_line = copied.iter().find(|b| b.category_id == rent.id).unwrap();
    assert_eq!(rent_line.amount, MoneyCents::new(160_000));
    let food_line = copied.iter().find(|b| b.category_id == food.id).unwrap();
    assert_eq!(food_line.amount, MoneyCents::new(40_000));

    let err = engine.copy_budgets("alice", aug, aug).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));
}

#[tokio::test]
async fn category_names_are_unique_per_user() {
    let (engine, db) = engine_with_db().await;
    common::add_user(&db, "bruno").await;
    category(&engine, "alice", "Alimentação", CategoryKind::Expense).await;

    let cmd = CategoryCmd {
        user_id: "alice".to_string(),
        name: "alimentacao".to_string(),
        kind: CategoryKind::Expense,
        color: Some("#ff0000".to_string()),
        icon: None,
    };
    let err = engine.new_category(cmd.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let other = engine
        .new_category(CategoryCmd {
            user_id: "bruno".to_string(),
            ..cmd
        })
        .await
        .unwrap();
    assert_eq!(other.name, "alimentacao");

    let expenses = engine
        .list_categories("alice", Some(CategoryKind::Expense))
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert!(
        engine
            .list_categories("alice", Some(CategoryKind::Income))
            .await
            .unwrap()
            .is_empty()
    );
}
