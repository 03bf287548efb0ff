use sea_orm::entity::prelude::*;

use crate::error::PharmacyError;
use crate::models::CartLine;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cart_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub article_id: i64,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_rate: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Rows are written through the same checks, so a failure here means the
/// table was edited out of band.
impl TryFrom<Model> for CartLine {
    type Error = PharmacyError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = model.id;
        CartLine::new(
            model.id,
            model.cart_id,
            model.article_id,
            model.quantity,
            model.unit_price,
            model.tax_rate,
            model.created_at.into(),
        )
        .map_err(|_| PharmacyError::Internal(format!("Cart line {} has an unstorable total", id)))
    }
}
