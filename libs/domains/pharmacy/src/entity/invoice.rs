use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub sale_id: i64,
    #[sea_orm(unique)]
    pub number: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    pub issued_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Invoice {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            sale_id: model.sale_id,
            number: model.number,
            total: model.total,
            issued_at: model.issued_at.into(),
        }
    }
}
