use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000004_create_pharmacy_catalog::Articles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One cart per counter operator
        manager
            .create_table(
                Table::create()
                    .table(Carts::Table)
                    .if_not_exists()
                    .col(pk_uuid(Carts::Id))
                    .col(uuid_uniq(Carts::OwnerId))
                    .col(
                        timestamp_with_time_zone(Carts::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CartLines::Table)
                    .if_not_exists()
                    .col(pk_uuid(CartLines::Id))
                    .col(uuid(CartLines::CartId))
                    .col(big_integer(CartLines::ArticleId))
                    .col(integer(CartLines::Quantity))
                    .col(decimal_len(CartLines::UnitPrice, 12, 2))
                    .col(decimal_len(CartLines::TaxRate, 5, 2))
                    .col(
                        timestamp_with_time_zone(CartLines::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_lines_cart_id")
                            .from(CartLines::Table, CartLines::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_lines_article_id")
                            .from(CartLines::Table, CartLines::ArticleId)
                            .to(Articles::Table, Articles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Adding the same article again bumps the existing line
        manager
            .create_index(
                Index::create()
                    .name("uq_cart_lines_cart_article")
                    .table(CartLines::Table)
                    .col(CartLines::CartId)
                    .col(CartLines::ArticleId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CartLines::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Carts::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Carts {
    Table,
    Id,
    OwnerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CartLines {
    Table,
    Id,
    CartId,
    ArticleId,
    Quantity,
    UnitPrice,
    TaxRate,
    CreatedAt,
}
