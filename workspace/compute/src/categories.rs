//! Category lifecycle: creation, updates with kind migration, and deletion.
//!
//! Changing a category's kind moves every linked entry to the opposite
//! entity. The move and the category update share one database transaction,
//! so either every entry converts and the category changes, or nothing does.

use chrono::Utc;
use common::round_money;
use model::entities::{
    budget,
    category::{self, CategoryType},
    expense, financial_goal, income,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace};

use crate::error::{ComputeError, Result};

/// Fields of a category to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub kind: CategoryType,
    pub spending_limit: Option<Decimal>,
    pub monthly_budget: Option<Decimal>,
}

/// Partial update of a category. `None` leaves a field untouched, and
/// `Some(None)` clears an optional ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub kind: Option<CategoryType>,
    pub spending_limit: Option<Option<Decimal>>,
    pub monthly_budget: Option<Option<Decimal>>,
}

/// Outcome of [`update_category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub category: category::Model,
    /// Entries moved to the opposite entity by a kind change.
    pub converted_entries: usize,
}

/// Rows removed by [`delete_category`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryDeletion {
    pub incomes: u64,
    pub expenses: u64,
    pub budgets: u64,
    pub goals: u64,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComputeError::Validation("nome must not be blank".to_string()));
    }
    Ok(name.to_string())
}

fn reject_income_ceiling(kind: CategoryType, ceilings: &[Option<Decimal>]) -> Result<()> {
    if kind == CategoryType::Income && ceilings.iter().any(Option::is_some) {
        return Err(ComputeError::Validation(
            "Spending limits only apply to expense categories".to_string(),
        ));
    }
    Ok(())
}

async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    category_id: i32,
) -> Result<category::Model> {
    category::Entity::find_by_id(category_id)
        .filter(category::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ComputeError::not_found("Category", category_id))
}

#[instrument(skip(db))]
pub async fn create_category(
    db: &DatabaseConnection,
    user_id: i32,
    new: NewCategory,
) -> Result<category::Model> {
    let name = validate_name(&new.name)?;
    reject_income_ceiling(new.kind, &[new.spending_limit, new.monthly_budget])?;

    let category = category::ActiveModel {
        user_id: Set(user_id),
        name: Set(name),
        kind: Set(new.kind),
        spending_limit: Set(new.spending_limit.map(round_money)),
        monthly_budget: Set(new.monthly_budget.map(round_money)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created {} category {} for user {}", category.kind, category.id, user_id);
    Ok(category)
}

/// Applies `changes` to the user's category, migrating its entries when the
/// kind changes.
#[instrument(skip(db))]
pub async fn update_category(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: i32,
    changes: CategoryChanges,
) -> Result<CategoryUpdate> {
    let txn = db.begin().await?;
    let current = find_owned(&txn, user_id, category_id).await?;

    let new_kind = changes.kind.unwrap_or(current.kind);
    reject_income_ceiling(
        new_kind,
        &[
            changes.spending_limit.flatten(),
            changes.monthly_budget.flatten(),
        ],
    )?;

    let converted_entries = if new_kind != current.kind {
        convert_entries(&txn, &current, new_kind).await?
    } else {
        0
    };

    let mut active = current.clone().into_active_model();
    if let Some(name) = &changes.name {
        active.name = Set(validate_name(name)?);
    }
    active.kind = Set(new_kind);
    if new_kind == CategoryType::Income {
        active.spending_limit = Set(None);
        active.monthly_budget = Set(None);
    } else {
        if let Some(limit) = changes.spending_limit {
            active.spending_limit = Set(limit.map(round_money));
        }
        if let Some(budget) = changes.monthly_budget {
            active.monthly_budget = Set(budget.map(round_money));
        }
    }
    let category = active.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Updated category {} ({} -> {}, {} entries converted)",
        category.id, current.kind, category.kind, converted_entries
    );
    Ok(CategoryUpdate {
        category,
        converted_entries,
    })
}

/// Recreates every entry of `category` as the entity matching `to` and
/// removes the originals. Expense-only fields are dropped when converting to
/// income. Monthly budgets go away with the expense kind.
async fn convert_entries(
    txn: &DatabaseTransaction,
    category: &category::Model,
    to: CategoryType,
) -> Result<usize> {
    match to {
        CategoryType::Income => {
            let expenses = expense::Entity::find()
                .filter(expense::Column::CategoryId.eq(category.id))
                .order_by_asc(expense::Column::Id)
                .all(txn)
                .await?;
            debug!("Converting {} expenses of category {} to incomes", expenses.len(), category.id);

            for entry in &expenses {
                trace!("Converting expense {}", entry.id);
                income::ActiveModel {
                    user_id: Set(entry.user_id),
                    category_id: Set(entry.category_id),
                    amount: Set(entry.amount),
                    date: Set(entry.date),
                    description: Set(entry.description.clone()),
                    created_at: Set(entry.created_at),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
            }

            expense::Entity::delete_many()
                .filter(expense::Column::CategoryId.eq(category.id))
                .exec(txn)
                .await?;
            budget::Entity::delete_many()
                .filter(budget::Column::CategoryId.eq(category.id))
                .exec(txn)
                .await?;

            Ok(expenses.len())
        }
        CategoryType::Expense => {
            let incomes = income::Entity::find()
                .filter(income::Column::CategoryId.eq(category.id))
                .order_by_asc(income::Column::Id)
                .all(txn)
                .await?;
            debug!("Converting {} incomes of category {} to expenses", incomes.len(), category.id);

            for entry in &incomes {
                trace!("Converting income {}", entry.id);
                expense::ActiveModel {
                    user_id: Set(entry.user_id),
                    category_id: Set(entry.category_id),
                    amount: Set(entry.amount),
                    date: Set(entry.date),
                    description: Set(entry.description.clone()),
                    image: Set(None),
                    latitude: Set(None),
                    longitude: Set(None),
                    created_at: Set(entry.created_at),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
            }

            income::Entity::delete_many()
                .filter(income::Column::CategoryId.eq(category.id))
                .exec(txn)
                .await?;

            Ok(incomes.len())
        }
    }
}

/// Deletes the user's category with its entries, budgets and bound goals.
#[instrument(skip(db))]
pub async fn delete_category(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: i32,
) -> Result<CategoryDeletion> {
    let txn = db.begin().await?;
    let category = find_owned(&txn, user_id, category_id).await?;

    let incomes = income::Entity::delete_many()
        .filter(income::Column::CategoryId.eq(category.id))
        .exec(&txn)
        .await?
        .rows_affected;
    let expenses = expense::Entity::delete_many()
        .filter(expense::Column::CategoryId.eq(category.id))
        .exec(&txn)
        .await?
        .rows_affected;
    let budgets = budget::Entity::delete_many()
        .filter(budget::Column::CategoryId.eq(category.id))
        .exec(&txn)
        .await?
        .rows_affected;
    let goals = financial_goal::Entity::delete_many()
        .filter(financial_goal::Column::CategoryId.eq(category.id))
        .exec(&txn)
        .await?
        .rows_affected;

    category::Entity::delete_by_id(category.id).exec(&txn).await?;
    txn.commit().await?;

    let deletion = CategoryDeletion {
        incomes,
        expenses,
        budgets,
        goals,
    };
    info!("Deleted category {}: {:?}", category_id, deletion);
    Ok(deletion)
}
