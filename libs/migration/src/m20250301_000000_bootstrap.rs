use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE EXTENSION IF NOT EXISTS pgcrypto")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS util")
            .await?;

        // Shared by every table that carries updated_at
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE FUNCTION util.touch_updated_at()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS util.touch_updated_at()")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS util CASCADE")
            .await?;

        Ok(())
    }
}

/// `CREATE TRIGGER <table>_touch_updated_at` statement for `table`.
pub(crate) fn touch_updated_at_trigger(table: &str) -> String {
    format!(
        "CREATE TRIGGER {table}_touch_updated_at BEFORE UPDATE ON {table} \
         FOR EACH ROW EXECUTE FUNCTION util.touch_updated_at()"
    )
}

pub(crate) fn drop_touch_updated_at_trigger(table: &str) -> String {
    format!("DROP TRIGGER IF EXISTS {table}_touch_updated_at ON {table}")
}
