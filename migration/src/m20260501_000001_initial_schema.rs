use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create open_platforms table
        manager
            .create_table(
                Table::create()
                    .table(OpenPlatforms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OpenPlatforms::Slug)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OpenPlatforms::AppId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(OpenPlatforms::AppSecret))
                    .col(string(OpenPlatforms::VerifyToken))
                    .col(string(OpenPlatforms::AesKey))
                    .col(string(OpenPlatforms::Name))
                    .col(big_integer(OpenPlatforms::CreatedAt))
                    .col(big_integer(OpenPlatforms::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Create testers table
        manager
            .create_table(
                Table::create()
                    .table(Testers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Testers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(Testers::AppId))
                    .col(string_null(Testers::WechatId))
                    .col(string(Testers::UserStr))
                    .col(big_integer(Testers::CreatedAt))
                    .col(big_integer(Testers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // A tester is unique per app by either identifier
        manager
            .create_index(
                Index::create()
                    .name("idx_testers_app_wechat")
                    .table(Testers::Table)
                    .col(Testers::AppId)
                    .col(Testers::WechatId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_testers_app_userstr")
                    .table(Testers::Table)
                    .col(Testers::AppId)
                    .col(Testers::UserStr)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Testers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OpenPlatforms::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum OpenPlatforms {
    Table,
    Slug,
    AppId,
    AppSecret,
    VerifyToken,
    AesKey,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Testers {
    Table,
    Id,
    AppId,
    WechatId,
    UserStr,
    CreatedAt,
    UpdatedAt,
}
