use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The type cannot be dropped and recreated once the table depends on it,
        // so it is only created when missing.
        if !user_type_exists(manager).await? {
            manager
                .create_type(
                    Type::create()
                        .as_enum(UserTypeEnum::Name)
                        .values([UserTypeEnum::Dashboard, UserTypeEnum::Panel])
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Account).string().not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Status).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Users::Type)
                            .custom(UserTypeEnum::Name)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Audit and soft-delete columns, added to tables created before they existed.
        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .add_column_if_not_exists(ColumnDef::new(Users::CreatedBy).big_integer().null())
                    .add_column_if_not_exists(ColumnDef::new(Users::UpdatedBy).big_integer().null())
                    .add_column_if_not_exists(ColumnDef::new(Users::DeletedBy).big_integer().null())
                    .add_column_if_not_exists(ColumnDef::new(Users::DeletedAt).date_time().null())
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_users_account_live" ON "users" ("account") WHERE "deleted_at" IS NULL"#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(UserTypeEnum::Name).to_owned())
            .await?;
        Ok(())
    }
}

async fn user_type_exists(manager: &SchemaManager<'_>) -> Result<bool, DbErr> {
    let backend = manager.get_database_backend();
    let row = manager
        .get_connection()
        .query_one(Statement::from_string(
            backend,
            "SELECT 1 FROM pg_type WHERE typname = 'user_type'".to_owned(),
        ))
        .await?;
    Ok(row.is_some())
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Account,
    Password,
    Status,
    Type,
    CreatedBy,
    UpdatedBy,
    DeletedBy,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserTypeEnum {
    #[sea_orm(iden = "user_type")]
    Name,
    Dashboard,
    Panel,
}
