use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub notes: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub tax_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_sale(self, lines: Vec<super::sale_line::Model>) -> crate::models::Sale {
        crate::models::Sale {
            id: self.id,
            owner_id: self.owner_id,
            customer_id: self.customer_id,
            notes: self.notes,
            lines: lines.into_iter().map(Into::into).collect(),
            subtotal: self.subtotal,
            tax_total: self.tax_total,
            total: self.total,
            created_at: self.created_at.into(),
        }
    }
}
