use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::NewLot;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub article_id: i64,
    pub lot_number: String,
    pub expires_at: Option<Date>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub buy_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub sell_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Lot {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            article_id: model.article_id,
            lot_number: model.lot_number,
            expires_at: model.expires_at,
            quantity: model.quantity,
            buy_price: model.buy_price,
            sell_price: model.sell_price,
            supplier: model.supplier,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl ActiveModel {
    /// Overwrite every editable column with `input`.
    pub fn apply(&mut self, input: NewLot) {
        self.article_id = Set(input.article_id);
        self.lot_number = Set(input.lot_number);
        self.expires_at = Set(input.expires_at);
        self.quantity = Set(input.quantity);
        self.buy_price = Set(input.buy_price);
        self.sell_price = Set(input.sell_price);
        self.supplier = Set(input.supplier);
        self.updated_at = Set(chrono::Utc::now().into());
    }
}

impl From<NewLot> for ActiveModel {
    fn from(input: NewLot) -> Self {
        let now = chrono::Utc::now();
        let mut model = ActiveModel {
            id: NotSet,
            created_at: Set(now.into()),
            ..Default::default()
        };
        model.apply(input);
        model
    }
}
