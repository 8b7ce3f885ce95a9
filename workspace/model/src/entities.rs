//! Root of the SeaORM entity modules.
//!
//! Every row belongs to exactly one user. Incomes, expenses and budgets hang
//! off a category, goals optionally reference one.

pub mod alert;
pub mod budget;
pub mod category;
pub mod expense;
pub mod financial_goal;
pub mod income;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::alert::Entity as Alert;
    pub use super::budget::Entity as Budget;
    pub use super::category::Entity as Category;
    pub use super::expense::Entity as Expense;
    pub use super::financial_goal::Entity as FinancialGoal;
    pub use super::income::Entity as Income;
    pub use super::user::Entity as User;
}
