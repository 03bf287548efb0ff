use sea_orm_migration::prelude::*;

use crate::m20250301_000004_create_pharmacy_catalog::Dcis;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Reference denominations. Articles pick from these; there is no write endpoint.
const DCI_NAMES: &[&str] = &[
    "Paracétamol",
    "Ibuprofène",
    "Amoxicilline",
    "Acide acétylsalicylique",
    "Métformine",
    "Oméprazole",
    "Salbutamol",
    "Cétirizine",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert.into_table(Dcis::Table).columns([Dcis::Name]);
        for name in DCI_NAMES {
            insert
                .values([(*name).into()])
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        insert.on_conflict(OnConflict::column(Dcis::Name).do_nothing().to_owned());

        manager.exec_stmt(insert).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Dcis::Table)
                    .and_where(Expr::col(Dcis::Name).is_in(DCI_NAMES.iter().copied()))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
