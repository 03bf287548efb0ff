use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000004_create_pharmacy_catalog::{Articles, Lots, pk_bigint};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(pk_bigint(Sales::Id))
                    .col(uuid(Sales::OwnerId))
                    .col(uuid_null(Sales::CustomerId))
                    .col(string_len_null(Sales::Notes, 500))
                    .col(decimal_len(Sales::Subtotal, 12, 2))
                    .col(decimal_len(Sales::TaxTotal, 12, 2))
                    .col(decimal_len(Sales::Total, 12, 2))
                    .col(
                        timestamp_with_time_zone(Sales::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleLines::Table)
                    .if_not_exists()
                    .col(pk_bigint(SaleLines::Id))
                    .col(big_integer(SaleLines::SaleId))
                    .col(big_integer(SaleLines::ArticleId))
                    .col(big_integer(SaleLines::LotId))
                    .col(integer(SaleLines::Quantity))
                    .col(decimal_len(SaleLines::UnitPrice, 12, 2))
                    .col(decimal_len(SaleLines::TaxRate, 5, 2))
                    .col(decimal_len(SaleLines::LineSubtotal, 12, 2))
                    .col(decimal_len(SaleLines::LineTax, 12, 2))
                    .col(decimal_len(SaleLines::LineTotal, 12, 2))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_lines_sale_id")
                            .from(SaleLines::Table, SaleLines::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_lines_article_id")
                            .from(SaleLines::Table, SaleLines::ArticleId)
                            .to(Articles::Table, Articles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_lines_lot_id")
                            .from(SaleLines::Table, SaleLines::LotId)
                            .to(Lots::Table, Lots::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sale_lines_sale_id")
                    .table(SaleLines::Table)
                    .col(SaleLines::SaleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(pk_bigint(Invoices::Id))
                    .col(big_integer_uniq(Invoices::SaleId))
                    .col(string_len_uniq(Invoices::Number, 32))
                    .col(decimal_len(Invoices::Total, 12, 2))
                    .col(
                        timestamp_with_time_zone(Invoices::IssuedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_sale_id")
                            .from(Invoices::Table, Invoices::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One sequence per prefix and year, bumped with an upsert
        manager
            .create_table(
                Table::create()
                    .table(InvoiceCounters::Table)
                    .if_not_exists()
                    .col(string_len(InvoiceCounters::Prefix, 16))
                    .col(integer(InvoiceCounters::Year))
                    .col(big_integer(InvoiceCounters::LastValue).default(0))
                    .primary_key(
                        Index::create()
                            .col(InvoiceCounters::Prefix)
                            .col(InvoiceCounters::Year),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvoiceCounters::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SaleLines::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sales {
    Table,
    Id,
    OwnerId,
    CustomerId,
    Notes,
    Subtotal,
    TaxTotal,
    Total,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaleLines {
    Table,
    Id,
    SaleId,
    ArticleId,
    LotId,
    Quantity,
    UnitPrice,
    TaxRate,
    LineSubtotal,
    LineTax,
    LineTotal,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    SaleId,
    Number,
    Total,
    IssuedAt,
}

#[derive(DeriveIden)]
enum InvoiceCounters {
    Table,
    Prefix,
    Year,
    LastValue,
}
