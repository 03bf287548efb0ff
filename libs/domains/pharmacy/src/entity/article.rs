use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::NewArticle;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub sell_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_rate: Decimal,
    pub dci_id: Option<i64>,
    pub image: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Domain article with the stock computed from its lots.
    pub fn into_article(self, stock: i64) -> crate::models::Article {
        crate::models::Article {
            id: self.id,
            code: self.code,
            name: self.name,
            form: self.form,
            dosage: self.dosage,
            unit: self.unit,
            sell_price: self.sell_price,
            tax_rate: self.tax_rate,
            stock,
            dci_id: self.dci_id,
            image: self.image,
            created_at: self.created_at.into(),
            updated_at: self.updated_at.into(),
        }
    }
}

impl From<NewArticle> for ActiveModel {
    fn from(input: NewArticle) -> Self {
        let now = chrono::Utc::now();
        ActiveModel {
            id: NotSet,
            code: Set(input.code),
            name: Set(input.name),
            form: Set(input.form),
            dosage: Set(input.dosage),
            unit: Set(input.unit),
            sell_price: Set(input.sell_price),
            tax_rate: Set(input.tax_rate),
            dci_id: Set(input.dci_id),
            image: Set(input.image),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}
