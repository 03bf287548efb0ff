use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000000_bootstrap::{drop_touch_updated_at_trigger, touch_updated_at_trigger};
use crate::m20250301_000002_create_patients::Patients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Visits::Table)
                    .if_not_exists()
                    .col(pk_uuid(Visits::Id))
                    .col(uuid(Visits::PatientId))
                    .col(timestamp_with_time_zone(Visits::VisitedAt))
                    .col(string_len(Visits::Reason, 255))
                    .col(text_null(Visits::Notes))
                    .col(string_len(Visits::Status, 20).default("scheduled"))
                    .col(uuid_null(Visits::PractitionerId))
                    .col(
                        timestamp_with_time_zone(Visits::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Visits::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visits_patient_id")
                            .from(Visits::Table, Visits::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visits_patient_id")
                    .table(Visits::Table)
                    .col(Visits::PatientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visits_visited_at")
                    .table(Visits::Table)
                    .col(Visits::VisitedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&touch_updated_at_trigger("visits"))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&drop_touch_updated_at_trigger("visits"))
            .await?;

        manager
            .drop_table(Table::drop().table(Visits::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Visits {
    Table,
    Id,
    PatientId,
    VisitedAt,
    Reason,
    Notes,
    Status,
    PractitionerId,
    CreatedAt,
    UpdatedAt,
}
