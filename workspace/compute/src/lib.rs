pub mod alerts;
pub mod budget;
pub mod categories;
pub mod error;
pub mod goals;
pub mod ledger;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use budget::{BudgetChecker, DEFAULT_NEAR_LIMIT_RATIO};
use goals::GoalValuator;

/// Stateless services shared by the request handlers.
#[derive(Debug, Clone)]
pub struct ComputeServices {
    pub goals: GoalValuator,
    pub budgets: BudgetChecker,
    today: Option<NaiveDate>,
}

impl ComputeServices {
    pub fn new(today: Option<NaiveDate>, near_limit_ratio: Decimal) -> Self {
        Self {
            goals: GoalValuator::new(),
            budgets: BudgetChecker::new(near_limit_ratio),
            today,
        }
    }

    /// The pinned date if one was given, otherwise the current UTC date.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Returns a default pre-configured compute instance that will be used most of the time.
///
/// `today` pins the date used for alert lookups; `None` follows the clock.
pub fn default_compute(today: Option<NaiveDate>) -> ComputeServices {
    ComputeServices::new(today, DEFAULT_NEAR_LIMIT_RATIO)
}
