#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Account, AccountCmd, AccountKind, Category, CategoryCmd, CategoryKind, Engine};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    add_user(&db, "alice").await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn add_user(db: &DatabaseConnection, username: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec![username.into(), "password".into()],
    ))
    .await
    .unwrap();
}

/// Overwrite the cached balance behind the engine's back.
pub async fn corrupt_balance(db: &DatabaseConnection, account: &Account, cents: i64) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE accounts SET current_balance = ? WHERE id = ?",
        vec![cents.into(), account.id.into()],
    ))
    .await
    .unwrap();
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
}

pub async fn account(engine: &Engine, user: &str, name: &str, kind: AccountKind) -> Account {
    engine
        .new_account(AccountCmd {
            user_id: user.to_string(),
            name: name.to_string(),
            kind,
            due_day: None,
        })
        .await
        .unwrap()
}

pub async fn card(engine: &Engine, user: &str, name: &str, due_day: u32) -> Account {
    engine
        .new_account(AccountCmd {
            user_id: user.to_string(),
            name: name.to_string(),
            kind: AccountKind::CreditCard,
            due_day: Some(due_day),
        })
        .await
        .unwrap()
}

pub async fn category(engine: &Engine, user: &str, name: &str, kind: CategoryKind) -> Category {
    engine
        .new_category(CategoryCmd {
            user_id: user.to_string(),
            name: name.to_string(),
            kind,
            color: None,
            icon: None,
        })
        .await
        .unwrap()
}
