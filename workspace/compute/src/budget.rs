//! Spending ceilings of expense categories.
//!
//! An expense category can carry two ceilings: `spending_limit` over its
//! all-time total and a monthly ceiling over the total of one calendar month.
//! The monthly ceiling comes from the `budgets` row for that month when one
//! exists, otherwise from the category's `monthly_budget`. Ceilings that are
//! not positive are ignored.

use chrono::NaiveDate;
use common::{Month, round_money};
use model::entities::{budget, category};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::fmt;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::ledger::{LedgerFilter, expense_total};

/// 0.9
pub const DEFAULT_NEAR_LIMIT_RATIO: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

/// Where a total stands relative to a ceiling. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LimitSignal {
    WithinLimit,
    NearLimit,
    LimitExceeded,
}

impl LimitSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitSignal::WithinLimit => "within_limit",
            LimitSignal::NearLimit => "near_limit",
            LimitSignal::LimitExceeded => "limit_exceeded",
        }
    }
}

impl fmt::Display for LimitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which period a ceiling covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    AllTime,
    Month(Month),
}

/// One ceiling compared against the matching total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCheck {
    pub scope: LimitScope,
    pub total: Decimal,
    pub ceiling: Decimal,
    pub signal: LimitSignal,
}

/// Most severe signal among `checks`, `WithinLimit` when there are none.
pub fn most_severe(checks: &[LimitCheck]) -> LimitSignal {
    checks
        .iter()
        .map(|check| check.signal)
        .max()
        .unwrap_or(LimitSignal::WithinLimit)
}

fn positive(ceiling: Option<Decimal>) -> Option<Decimal> {
    ceiling.filter(|c| *c > Decimal::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetChecker {
    near_limit_ratio: Decimal,
}

impl Default for BudgetChecker {
    fn default() -> Self {
        Self::new(DEFAULT_NEAR_LIMIT_RATIO)
    }
}

impl BudgetChecker {
    pub fn new(near_limit_ratio: Decimal) -> Self {
        Self { near_limit_ratio }
    }

    pub fn near_limit_ratio(&self) -> Decimal {
        self.near_limit_ratio
    }

    pub fn classify(&self, total: Decimal, ceiling: Decimal) -> LimitSignal {
        if total >= ceiling {
            LimitSignal::LimitExceeded
        } else if total >= round_money(ceiling * self.near_limit_ratio) {
            LimitSignal::NearLimit
        } else {
            LimitSignal::WithinLimit
        }
    }

    fn check(&self, scope: LimitScope, total: Decimal, ceiling: Decimal) -> LimitCheck {
        LimitCheck {
            scope,
            total,
            ceiling,
            signal: self.classify(total, ceiling),
        }
    }

    /// Ceiling for `month`: its budget row if any, else the category default.
    pub async fn month_ceiling<C: ConnectionTrait>(
        &self,
        db: &C,
        category: &category::Model,
        month: Month,
    ) -> Result<Option<Decimal>> {
        let budget = budget::Entity::find()
            .filter(budget::Column::CategoryId.eq(category.id))
            .filter(budget::Column::Month.eq(month.to_string()))
            .one(db)
            .await?;

        Ok(positive(
            budget
                .map(|b| b.limit_amount)
                .or(category.monthly_budget),
        ))
    }

    /// Checks every ceiling of `category` for an entry dated `on_date`.
    ///
    /// Income categories have no ceilings and yield no checks.
    #[instrument(skip(self, db, category), fields(category_id = category.id))]
    pub async fn check_category<C: ConnectionTrait>(
        &self,
        db: &C,
        category: &category::Model,
        on_date: NaiveDate,
    ) -> Result<Vec<LimitCheck>> {
        if !category.is_expense() {
            return Ok(Vec::new());
        }

        let filter = LedgerFilter::user(category.user_id).category(category.id);
        let mut checks = Vec::new();

        if let Some(ceiling) = positive(category.spending_limit) {
            let total = expense_total(db, &filter).await?;
            checks.push(self.check(LimitScope::AllTime, total, ceiling));
        }

        let month = Month::of(on_date);
        if let Some(ceiling) = self.month_ceiling(db, category, month).await? {
            let total = expense_total(db, &filter.within(Some(month.range()))).await?;
            checks.push(self.check(LimitScope::Month(month), total, ceiling));
        }

        let worst = most_severe(&checks);
        if worst == LimitSignal::WithinLimit {
            debug!("Category {} within its {} ceiling(s)", category.id, checks.len());
        } else {
            info!("Category {} signals {}", category.id, worst);
        }
        Ok(checks)
    }

    /// Spending of the budget's month compared with the budget's limit.
    pub async fn budget_status<C: ConnectionTrait>(
        &self,
        db: &C,
        budget: &budget::Model,
    ) -> Result<LimitCheck> {
        let month = Month::parse(&budget.month)?;
        let filter = LedgerFilter::user(budget.user_id)
            .category(budget.category_id)
            .within(Some(month.range()));
        let total = expense_total(db, &filter).await?;
        Ok(self.check(LimitScope::Month(month), total, budget.limit_amount))
    }
}
