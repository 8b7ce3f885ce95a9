use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Name))
                    .col(string(Users::Email).unique_key())
                    .col(string_len(Users::Cpf, 11).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(integer(Categories::UserId))
                    .col(string(Categories::Name))
                    .col(string_len(Categories::Kind, 10))
                    .col(decimal_null(Categories::SpendingLimit).decimal_len(12, 2))
                    .col(decimal_null(Categories::MonthlyBudget).decimal_len(12, 2))
                    .col(timestamp_with_time_zone(Categories::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_user")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(pk_auto(Incomes::Id))
                    .col(integer(Incomes::UserId))
                    .col(integer(Incomes::CategoryId))
                    .col(decimal(Incomes::Amount).decimal_len(12, 2))
                    .col(date(Incomes::Date))
                    .col(string(Incomes::Description))
                    .col(timestamp_with_time_zone(Incomes::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_income_user")
                            .from(Incomes::Table, Incomes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_income_category")
                            .from(Incomes::Table, Incomes::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(pk_auto(Expenses::Id))
                    .col(integer(Expenses::UserId))
                    .col(integer(Expenses::CategoryId))
                    .col(decimal(Expenses::Amount).decimal_len(12, 2))
                    .col(date(Expenses::Date))
                    .col(string(Expenses::Description))
                    .col(string_null(Expenses::Image))
                    .col(double_null(Expenses::Latitude))
                    .col(double_null(Expenses::Longitude))
                    .col(timestamp_with_time_zone(Expenses::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_user")
                            .from(Expenses::Table, Expenses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_category")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FinancialGoals::Table)
                    .if_not_exists()
                    .col(pk_auto(FinancialGoals::Id))
                    .col(integer(FinancialGoals::UserId))
                    .col(string(FinancialGoals::Title))
                    .col(decimal(FinancialGoals::TargetAmount).decimal_len(12, 2))
                    .col(decimal(FinancialGoals::CurrentAmount).decimal_len(12, 2).default(0))
                    .col(date(FinancialGoals::StartDate))
                    .col(date(FinancialGoals::EndDate))
                    .col(string_len(FinancialGoals::Kind, 16))
                    .col(integer_null(FinancialGoals::CategoryId))
                    .col(timestamp_with_time_zone(FinancialGoals::CreatedAt))
                    .col(timestamp_with_time_zone(FinancialGoals::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_financial_goal_user")
                            .from(FinancialGoals::Table, FinancialGoals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_financial_goal_category")
                            .from(FinancialGoals::Table, FinancialGoals::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(pk_auto(Alerts::Id))
                    .col(integer(Alerts::UserId))
                    .col(string(Alerts::Title))
                    .col(string(Alerts::Description))
                    .col(date(Alerts::AlertDate))
                    .col(timestamp_with_time_zone(Alerts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alert_user")
                            .from(Alerts::Table, Alerts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(pk_auto(Budgets::Id))
                    .col(integer(Budgets::UserId))
                    .col(integer(Budgets::CategoryId))
                    .col(decimal(Budgets::LimitAmount).decimal_len(12, 2))
                    .col(string_len(Budgets::Month, 7))
                    .col(timestamp_with_time_zone(Budgets::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_user")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_category")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One budget per category and month
        manager
            .create_index(
                Index::create()
                    .name("idx_budgets_category_month")
                    .table(Budgets::Table)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_category_date")
                    .table(Expenses::Table)
                    .col(Expenses::CategoryId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_incomes_category_date")
                    .table(Incomes::Table)
                    .col(Incomes::CategoryId)
                    .col(Incomes::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children first
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(FinancialGoals::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Cpf,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    Kind,
    SpendingLimit,
    MonthlyBudget,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Incomes {
    Table,
    Id,
    UserId,
    CategoryId,
    Amount,
    Date,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    UserId,
    CategoryId,
    Amount,
    Date,
    Description,
    Image,
    Latitude,
    Longitude,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FinancialGoals {
    Table,
    Id,
    UserId,
    Title,
    TargetAmount,
    CurrentAmount,
    StartDate,
    EndDate,
    Kind,
    CategoryId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    UserId,
    Title,
    Description,
    AlertDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Budgets {
    Table,
    Id,
    UserId,
    CategoryId,
    LimitAmount,
    Month,
    CreatedAt,
}
