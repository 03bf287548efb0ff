use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000000_bootstrap::{drop_touch_updated_at_trigger, touch_updated_at_trigger};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Patients::Table)
                    .if_not_exists()
                    .col(pk_uuid(Patients::Id))
                    .col(string_len(Patients::FirstName, 100))
                    .col(string_len(Patients::LastName, 100))
                    .col(date_null(Patients::BirthDate))
                    .col(string_len_null(Patients::Sex, 10))
                    .col(string_len_null(Patients::Phone, 30))
                    .col(string_len_null(Patients::Email, 190))
                    .col(string_len_null(Patients::Address, 255))
                    .col(
                        timestamp_with_time_zone(Patients::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Patients::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Patients::DeletedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patients_last_name")
                    .table(Patients::Table)
                    .col(Patients::LastName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patients_deleted_at")
                    .table(Patients::Table)
                    .col(Patients::DeletedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&touch_updated_at_trigger("patients"))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PatientHistory::Table)
                    .if_not_exists()
                    .col(pk_uuid(PatientHistory::Id))
                    .col(uuid(PatientHistory::PatientId))
                    .col(string_len(PatientHistory::Action, 20))
                    .col(uuid_null(PatientHistory::ActorId))
                    .col(json_binary(PatientHistory::Changes).default("{}"))
                    .col(
                        timestamp_with_time_zone(PatientHistory::At)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patient_history_patient_id")
                            .from(PatientHistory::Table, PatientHistory::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patient_history_patient_at")
                    .table(PatientHistory::Table)
                    .col(PatientHistory::PatientId)
                    .col(PatientHistory::At)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PatientHistory::Table).to_owned())
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&drop_touch_updated_at_trigger("patients"))
            .await?;

        manager
            .drop_table(Table::drop().table(Patients::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Patients {
    Table,
    Id,
    FirstName,
    LastName,
    BirthDate,
    Sex,
    Phone,
    Email,
    Address,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum PatientHistory {
    Table,
    Id,
    PatientId,
    Action,
    ActorId,
    Changes,
    At,
}
