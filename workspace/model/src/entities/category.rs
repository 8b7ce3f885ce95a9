use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Whether a category groups income ("receita") or expense ("despesa") entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CategoryType {
    #[sea_orm(string_value = "receita")]
    Income,
    #[sea_orm(string_value = "despesa")]
    Expense,
}

impl CategoryType {
    /// Wire and database name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "receita",
            CategoryType::Expense => "despesa",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            CategoryType::Income => CategoryType::Expense,
            CategoryType::Expense => CategoryType::Income,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receita" => Ok(CategoryType::Income),
            "despesa" => Ok(CategoryType::Expense),
            other => Err(format!(
                "Invalid category type '{}', expected 'receita' or 'despesa'",
                other
            )),
        }
    }
}

/// Represents a category grouping a user's income or expense entries.
///
/// Spending ceilings are only meaningful for expense categories:
/// `spending_limit` applies to the all-time total, `monthly_budget` to each
/// calendar month unless a `budget` row overrides that month.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub kind: CategoryType,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub spending_limit: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub monthly_budget: Option<Decimal>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::income::Entity")]
    Income,
    #[sea_orm(has_many = "super::expense::Entity")]
    Expense,
    #[sea_orm(has_many = "super::budget::Entity")]
    Budget,
    #[sea_orm(has_many = "super::financial_goal::Entity")]
    FinancialGoal,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl Related<super::financial_goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialGoal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expense(&self) -> bool {
        self.kind == CategoryType::Expense
    }

    /// True when the category has at least one positive spending ceiling.
    pub fn has_ceiling(&self) -> bool {
        [self.spending_limit, self.monthly_budget]
            .into_iter()
            .flatten()
            .any(|limit| limit > Decimal::ZERO)
    }
}
