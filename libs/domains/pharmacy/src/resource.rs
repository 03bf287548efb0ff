//! External JSON shape of an article.
//!
//! [`ArticleResource::new`] only reshapes what it is given: the DCI is
//! rendered when the caller passes one, never looked up.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Article, ArticleWithDci, Dci};

/// `{id, name}` of a loaded DCI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DciSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ArticleResource {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub sell_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax_rate: Decimal,
    pub stock: i64,
    /// Present only when requested with `include=dci`
    pub dci: Option<DciSummary>,
    pub image_url: Option<String>,
    /// Same value as `image_url`, kept for older clients
    pub image: Option<String>,
    /// Reserved
    pub brand: Option<String>,
}

impl ArticleResource {
    pub fn new(article: &Article, dci: Option<&Dci>) -> Self {
        Self {
            id: article.id,
            code: article.code.clone(),
            name: article.name.clone(),
            form: article.form.clone(),
            dosage: article.dosage.clone(),
            unit: article.unit.clone(),
            sell_price: article.sell_price,
            tax_rate: article.tax_rate,
            stock: article.stock.max(0),
            dci: dci.map(|dci| DciSummary {
                id: dci.id,
                name: dci.name.clone(),
            }),
            image_url: article.image.clone(),
            image: article.image.clone(),
            brand: None,
        }
    }
}

impl From<&ArticleWithDci> for ArticleResource {
    fn from(loaded: &ArticleWithDci) -> Self {
        Self::new(&loaded.article, loaded.dci.as_ref())
    }
}
