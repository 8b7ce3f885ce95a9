//! Database fixtures shared by the compute tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::{alert, category, expense, income, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, Set};

pub type DbResult<T> = std::result::Result<T, DbErr>;

pub async fn setup_db() -> DbResult<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
    Migrator::up(&db, None).await.expect("Migrations failed.");
    Ok(db)
}

pub async fn new_user(db: &DatabaseConnection) -> DbResult<user::Model> {
    static USER_ID: AtomicU64 = AtomicU64::new(0);
    let n = USER_ID.fetch_add(1, Ordering::SeqCst);

    user::ActiveModel {
        name: Set(format!("User {}", n)),
        email: Set(format!("user{}@example.com", n)),
        cpf: Set(format!("{:011}", n)),
        password_hash: Set("not-a-hash".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn new_category(
    db: &DatabaseConnection,
    user: &user::Model,
    kind: category::CategoryType,
) -> DbResult<category::Model> {
    category::ActiveModel {
        user_id: Set(user.id),
        name: Set(format!("{} category", kind)),
        kind: Set(kind),
        spending_limit: Set(None),
        monthly_budget: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn new_income(
    db: &DatabaseConnection,
    category: &category::Model,
    date: NaiveDate,
    amount: i64,
) -> DbResult<income::Model> {
    income::ActiveModel {
        user_id: Set(category.user_id),
        category_id: Set(category.id),
        amount: Set(Decimal::new(amount * 100, 2)),
        date: Set(date),
        description: Set(format!("Income of {}", amount)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn new_expense(
    db: &DatabaseConnection,
    category: &category::Model,
    date: NaiveDate,
    amount: i64,
) -> DbResult<expense::Model> {
    expense::ActiveModel {
        user_id: Set(category.user_id),
        category_id: Set(category.id),
        amount: Set(Decimal::new(amount * 100, 2)),
        date: Set(date),
        description: Set(format!("Expense of {}", amount)),
        image: Set(Some("receipt.png".to_string())),
        latitude: Set(Some(-15.79)),
        longitude: Set(Some(-47.88)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn new_alert(
    db: &DatabaseConnection,
    user: &user::Model,
    title: &str,
    alert_date: NaiveDate,
) -> DbResult<alert::Model> {
    alert::ActiveModel {
        user_id: Set(user.id),
        title: Set(title.to_string()),
        description: Set(format!("{} reminder", title)),
        alert_date: Set(alert_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}
