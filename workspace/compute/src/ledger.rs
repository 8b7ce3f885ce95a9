//! Totals over a user's income and expense rows.
//!
//! Every total is a plain sum over a filtered row set and is zero when the
//! set is empty. Sums are computed in Rust on `Decimal` so the result does not
//! depend on how the database backend aggregates numeric columns.

use async_trait::async_trait;
use common::{DateRange, round_money};
use model::entities::{
    category::{self, CategoryType},
    expense, income,
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{debug, instrument, trace};

use crate::error::Result;

/// Which rows of a user's ledger a total covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerFilter {
    pub user_id: i32,
    pub category_id: Option<i32>,
    /// Inclusive date range; `None` covers all dates.
    pub range: Option<DateRange>,
}

impl LedgerFilter {
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id,
            category_id: None,
            range: None,
        }
    }

    pub fn category(mut self, category_id: i32) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn within(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    fn income_condition(&self) -> Condition {
        Condition::all()
            .add(income::Column::UserId.eq(self.user_id))
            .add_option(self.category_id.map(|id| income::Column::CategoryId.eq(id)))
            .add_option(
                self.range
                    .map(|r| income::Column::Date.between(r.start, r.end)),
            )
    }

    fn expense_condition(&self) -> Condition {
        Condition::all()
            .add(expense::Column::UserId.eq(self.user_id))
            .add_option(self.category_id.map(|id| expense::Column::CategoryId.eq(id)))
            .add_option(
                self.range
                    .map(|r| expense::Column::Date.between(r.start, r.end)),
            )
    }
}

#[instrument(skip(db))]
pub async fn income_total<C: ConnectionTrait>(db: &C, filter: &LedgerFilter) -> Result<Decimal> {
    let amounts: Vec<Decimal> = income::Entity::find()
        .select_only()
        .column(income::Column::Amount)
        .filter(filter.income_condition())
        .into_tuple()
        .all(db)
        .await?;

    trace!("Summing {} income rows", amounts.len());
    Ok(round_money(amounts.into_iter().sum()))
}

#[instrument(skip(db))]
pub async fn expense_total<C: ConnectionTrait>(db: &C, filter: &LedgerFilter) -> Result<Decimal> {
    let amounts: Vec<Decimal> = expense::Entity::find()
        .select_only()
        .column(expense::Column::Amount)
        .filter(filter.expense_condition())
        .into_tuple()
        .all(db)
        .await?;

    trace!("Summing {} expense rows", amounts.len());
    Ok(round_money(amounts.into_iter().sum()))
}

/// Total of a category's entries of its own kind.
pub async fn category_total<C: ConnectionTrait>(
    db: &C,
    category: &category::Model,
    range: Option<DateRange>,
) -> Result<Decimal> {
    let filter = LedgerFilter::user(category.user_id)
        .category(category.id)
        .within(range);
    match category.kind {
        CategoryType::Income => income_total(db, &filter).await,
        CategoryType::Expense => expense_total(db, &filter).await,
    }
}

/// A category together with the all-time total of its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: category::Model,
    pub total: Decimal,
}

/// Every category of `kind` owned by the user, with its total, ordered by id.
#[instrument(skip(db))]
pub async fn category_totals<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    kind: CategoryType,
) -> Result<Vec<CategoryTotal>> {
    let categories = category::Entity::find()
        .filter(category::Column::UserId.eq(user_id))
        .filter(category::Column::Kind.eq(kind))
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?;

    debug!("Computing totals for {} {} categories", categories.len(), kind);

    let mut totals = Vec::with_capacity(categories.len());
    for category in categories {
        let total = category_total(db, &category, None).await?;
        totals.push(CategoryTotal { category, total });
    }
    Ok(totals)
}

/// Read access to ledger totals.
///
/// Implemented by every SeaORM connection and transaction. Tests can supply
/// an in-memory implementation instead.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn income_total(&self, filter: &LedgerFilter) -> Result<Decimal>;

    async fn expense_total(&self, filter: &LedgerFilter) -> Result<Decimal>;

    /// Category `category_id` if it exists and belongs to `user_id`.
    async fn category(&self, user_id: i32, category_id: i32) -> Result<Option<category::Model>>;
}

#[async_trait]
impl<C> LedgerSource for C
where
    C: ConnectionTrait + Send,
{
    async fn income_total(&self, filter: &LedgerFilter) -> Result<Decimal> {
        income_total(self, filter).await
    }

    async fn expense_total(&self, filter: &LedgerFilter) -> Result<Decimal> {
        expense_total(self, filter).await
    }

    async fn category(&self, user_id: i32, category_id: i32) -> Result<Option<category::Model>> {
        Ok(category::Entity::find_by_id(category_id)
            .filter(category::Column::UserId.eq(user_id))
            .one(self)
            .await?)
    }
}
