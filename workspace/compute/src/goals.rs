//! Goal valuation engine.
//!
//! A goal is valued by summing the owner's ledger over the goal's inclusive
//! date range. Which rows are summed and whether the target is a floor or a
//! ceiling depends on the goal kind:
//!
//! | kind        | current value                     | reached when       |
//! |-------------|-----------------------------------|--------------------|
//! | `geral`     | income - expense                  | current >= target  |
//! | `receita`   | income                            | current >= target  |
//! | `despesa`   | expense                           | current <= target  |
//! | `categoria` | entries of the category's kind    | follows that kind  |
//!
//! A zero target is never reached.

use chrono::Utc;
use common::{DateRange, percentage, round_money};
use model::entities::{
    category::CategoryType,
    financial_goal::{self, GoalKind},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, Set};
use tracing::{debug, instrument, trace, warn};

use crate::error::{ComputeError, Result};
use crate::ledger::{LedgerFilter, LedgerSource};

/// Everything needed to value a goal, persisted or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalSpec {
    pub user_id: i32,
    pub kind: GoalKind,
    pub category_id: Option<i32>,
    pub range: DateRange,
    pub target_amount: Decimal,
}

impl GoalSpec {
    /// Builds a goal definition from user input, enforcing the goal invariants.
    pub fn new(
        user_id: i32,
        kind: GoalKind,
        category_id: Option<i32>,
        range: DateRange,
        target_amount: Decimal,
    ) -> Result<Self> {
        if target_amount < Decimal::ZERO {
            return Err(ComputeError::Validation(
                "Goal target must not be negative".to_string(),
            ));
        }

        let category_id = match (kind, category_id) {
            (GoalKind::Category, None) => {
                return Err(ComputeError::Validation(
                    "categoria_id is required for goals of type 'categoria'".to_string(),
                ));
            }
            (GoalKind::Category, Some(id)) => Some(id),
            // Only category goals reference a category
            (_, _) => None,
        };

        Ok(Self {
            user_id,
            kind,
            category_id,
            range,
            target_amount: round_money(target_amount),
        })
    }
}

impl From<&financial_goal::Model> for GoalSpec {
    fn from(goal: &financial_goal::Model) -> Self {
        Self {
            user_id: goal.user_id,
            kind: goal.kind,
            category_id: goal.category_id,
            range: DateRange {
                start: goal.start_date,
                end: goal.end_date,
            },
            target_amount: goal.target_amount,
        }
    }
}

/// Result of valuing a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub current_amount: Decimal,
    pub target_amount: Decimal,
    pub reached: bool,
    /// `current / target * 100`, two places; zero when the target is zero.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Target is a floor to reach.
    AtLeast,
    /// Target is a ceiling not to exceed.
    AtMost,
}

impl Direction {
    fn for_category(kind: CategoryType) -> Self {
        match kind {
            CategoryType::Income => Direction::AtLeast,
            CategoryType::Expense => Direction::AtMost,
        }
    }

    fn reached(self, current: Decimal, target: Decimal) -> bool {
        if target.is_zero() {
            return false;
        }
        match self {
            Direction::AtLeast => current >= target,
            Direction::AtMost => current <= target,
        }
    }
}

/// Values goals against a ledger.
#[derive(Debug, Clone, Default)]
pub struct GoalValuator;

impl GoalValuator {
    pub fn new() -> Self {
        Self
    }

    /// Values the goal definition without touching any stored goal.
    #[instrument(skip(self, source))]
    pub async fn evaluate<S>(&self, source: &S, spec: &GoalSpec) -> Result<GoalProgress>
    where
        S: LedgerSource + ?Sized,
    {
        let filter = LedgerFilter::user(spec.user_id).within(Some(spec.range));

        let (current_amount, direction) = match spec.kind {
            GoalKind::General => {
                let income = source.income_total(&filter).await?;
                let expense = source.expense_total(&filter).await?;
                trace!("General goal: income={}, expense={}", income, expense);
                (income - expense, Direction::AtLeast)
            }
            GoalKind::Income => (source.income_total(&filter).await?, Direction::AtLeast),
            GoalKind::Expense => (source.expense_total(&filter).await?, Direction::AtMost),
            GoalKind::Category => {
                let category_id = spec.category_id.ok_or_else(|| {
                    ComputeError::Validation(
                        "categoria_id is required for goals of type 'categoria'".to_string(),
                    )
                })?;
                let category = source
                    .category(spec.user_id, category_id)
                    .await?
                    .ok_or_else(|| {
                        warn!("Goal references missing category {}", category_id);
                        ComputeError::not_found("Category", category_id)
                    })?;

                let filter = filter.category(category.id);
                let total = match category.kind {
                    CategoryType::Income => source.income_total(&filter).await?,
                    CategoryType::Expense => source.expense_total(&filter).await?,
                };
                (total, Direction::for_category(category.kind))
            }
        };

        let current_amount = round_money(current_amount);
        let progress = GoalProgress {
            current_amount,
            target_amount: spec.target_amount,
            reached: direction.reached(current_amount, spec.target_amount),
            percentage: percentage(current_amount, spec.target_amount),
        };

        debug!(
            "Goal {} valued at {} of {} (reached: {})",
            spec.kind, progress.current_amount, progress.target_amount, progress.reached
        );
        Ok(progress)
    }

    /// Values a stored goal and persists the new `current_amount`.
    #[instrument(skip(self, db, goal), fields(goal_id = goal.id))]
    pub async fn refresh<C>(
        &self,
        db: &C,
        goal: financial_goal::Model,
    ) -> Result<(financial_goal::Model, GoalProgress)>
    where
        C: ConnectionTrait + Send,
    {
        let progress = self.evaluate(db, &GoalSpec::from(&goal)).await?;

        let mut active = goal.into_active_model();
        active.current_amount = Set(progress.current_amount);
        active.updated_at = Set(Utc::now());
        let goal = active.update(db).await?;

        Ok((goal, progress))
    }
}
