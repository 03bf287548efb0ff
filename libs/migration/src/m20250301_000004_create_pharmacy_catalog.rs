use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000000_bootstrap::{drop_touch_updated_at_trigger, touch_updated_at_trigger};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// BIGSERIAL primary key. Pharmacy records use integer ids.
pub(crate) fn pk_bigint<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Dcis::Table)
                    .if_not_exists()
                    .col(pk_bigint(Dcis::Id))
                    .col(string_len_uniq(Dcis::Name, 190))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Articles::Table)
                    .if_not_exists()
                    .col(pk_bigint(Articles::Id))
                    .col(string_len_uniq(Articles::Code, 50))
                    .col(string_len(Articles::Name, 190))
                    .col(string_len_null(Articles::Form, 100))
                    .col(string_len_null(Articles::Dosage, 100))
                    .col(string_len_null(Articles::Unit, 100))
                    .col(decimal_len(Articles::SellPrice, 12, 2).default(0))
                    .col(decimal_len(Articles::TaxRate, 5, 2).default(0))
                    .col(big_integer_null(Articles::DciId))
                    .col(string_len_null(Articles::Image, 255))
                    .col(
                        timestamp_with_time_zone(Articles::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Articles::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_articles_dci_id")
                            .from(Articles::Table, Articles::DciId)
                            .to(Dcis::Table, Dcis::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_articles_name")
                    .table(Articles::Table)
                    .col(Articles::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&touch_updated_at_trigger("articles"))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(pk_bigint(Lots::Id))
                    .col(big_integer(Lots::ArticleId))
                    .col(string_len(Lots::LotNumber, 100))
                    .col(date_null(Lots::ExpiresAt))
                    .col(integer(Lots::Quantity).default(0))
                    .col(decimal_len_null(Lots::BuyPrice, 12, 2))
                    .col(decimal_len_null(Lots::SellPrice, 12, 2))
                    .col(string_len_null(Lots::Supplier, 190))
                    .col(
                        timestamp_with_time_zone(Lots::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Lots::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lots_article_id")
                            .from(Lots::Table, Lots::ArticleId)
                            .to(Articles::Table, Articles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Stock can never go negative, whatever path writes it
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE lots ADD CONSTRAINT chk_lots_quantity_non_negative CHECK (quantity >= 0)",
            )
            .await?;

        // FEFO allocation scans lots of one article by expiry
        manager
            .create_index(
                Index::create()
                    .name("idx_lots_article_expires")
                    .table(Lots::Table)
                    .col(Lots::ArticleId)
                    .col(Lots::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&touch_updated_at_trigger("lots"))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&drop_touch_updated_at_trigger("lots"))
            .await?;

        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&drop_touch_updated_at_trigger("articles"))
            .await?;

        manager
            .drop_table(Table::drop().table(Articles::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Dcis::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Dcis {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub(crate) enum Articles {
    Table,
    Id,
    Code,
    Name,
    Form,
    Dosage,
    Unit,
    SellPrice,
    TaxRate,
    DciId,
    Image,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Lots {
    Table,
    Id,
    ArticleId,
    LotNumber,
    ExpiresAt,
    Quantity,
    BuyPrice,
    SellPrice,
    Supplier,
    CreatedAt,
    UpdatedAt,
}
