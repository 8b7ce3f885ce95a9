use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use std::fmt;
use std::str::FromStr;

/// What a goal measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum GoalKind {
    /// Net balance: income minus expense.
    #[sea_orm(string_value = "geral")]
    General,
    /// Entries of one category.
    #[sea_orm(string_value = "categoria")]
    Category,
    #[sea_orm(string_value = "receita")]
    Income,
    #[sea_orm(string_value = "despesa")]
    Expense,
}

impl GoalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalKind::General => "geral",
            GoalKind::Category => "categoria",
            GoalKind::Income => "receita",
            GoalKind::Expense => "despesa",
        }
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geral" => Ok(GoalKind::General),
            "categoria" => Ok(GoalKind::Category),
            "receita" => Ok(GoalKind::Income),
            "despesa" => Ok(GoalKind::Expense),
            other => Err(format!(
                "Invalid goal type '{}', expected one of: geral, categoria, receita, despesa",
                other
            )),
        }
    }
}

/// A financial goal ("meta financeira") evaluated over `[start_date, end_date]`.
///
/// `current_amount` is derived data. It is refreshed whenever the goal is
/// read or updated and must not be treated as authoritative.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "financial_goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub target_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub current_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: GoalKind,
    /// Set iff `kind` is `categoria`.
    pub category_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
