use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::validation::{
    MAX_MONEY, money, not_blank, parse_date, percentage, quantity_out_of_range, required,
    validate_date, validate_uuid,
};

/// Round a money amount to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// International nonproprietary name (DCI) an article can be classified under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dci {
    pub id: i64,
    pub name: String,
}

/// Catalog entry. `stock` is the sum of the article's lot quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    pub sell_price: Decimal,
    pub tax_rate: Decimal,
    pub stock: i64,
    pub dci_id: Option<i64>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An article together with its DCI, when the caller asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleWithDci {
    pub article: Article,
    pub dci: Option<Dci>,
}

/// Body for creating or replacing an article
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ArticleInput {
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub code: String,
    #[validate(length(min = 1, max = 190), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub form: Option<String>,
    #[validate(length(max = 100))]
    pub dosage: Option<String>,
    #[validate(length(max = 100))]
    pub unit: Option<String>,
    #[validate(required, custom(function = "money"))]
    #[schema(value_type = Option<f64>)]
    pub sell_price: Option<Decimal>,
    #[validate(required, custom(function = "percentage"))]
    #[schema(value_type = Option<f64>)]
    pub tax_rate: Option<Decimal>,
    pub dci_id: Option<i64>,
    #[validate(length(max = 255))]
    pub image: Option<String>,
}

/// Article fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub code: String,
    pub name: String,
    pub form: Option<String>,
    pub dosage: Option<String>,
    pub unit: Option<String>,
    pub sell_price: Decimal,
    pub tax_rate: Decimal,
    pub dci_id: Option<i64>,
    pub image: Option<String>,
}

impl ArticleInput {
    pub fn into_new_article(self) -> Result<NewArticle, ValidationErrors> {
        Ok(NewArticle {
            sell_price: round_money(required(self.sell_price, "sell_price")?),
            tax_rate: round_money(required(self.tax_rate, "tax_rate")?),
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            form: self.form,
            dosage: self.dosage,
            unit: self.unit,
            dci_id: self.dci_id,
            image: self.image,
        })
    }
}

/// Query parameters for listing articles
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct ArticleFilter {
    /// Case-insensitive match on code or name
    pub search: Option<String>,
    /// Comma-separated relations to load; `dci` is the only one
    pub include: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self {
            search: None,
            include: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ArticleFilter {
    pub fn include_dci(&self) -> bool {
        includes_dci(self.include.as_deref())
    }
}

/// `?include=` for single-article reads
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct IncludeQuery {
    pub include: Option<String>,
}

impl IncludeQuery {
    pub fn include_dci(&self) -> bool {
        includes_dci(self.include.as_deref())
    }
}

fn includes_dci(include: Option<&str>) -> bool {
    include
        .map(|raw| raw.split(',').any(|part| part.trim().eq_ignore_ascii_case("dci")))
        .unwrap_or(false)
}

fn default_limit() -> u64 {
    50
}

/// A stock batch of one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lot {
    pub id: i64,
    pub article_id: i64,
    pub lot_number: String,
    pub expires_at: Option<NaiveDate>,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub buy_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub sell_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Lots expiring today can still be sold.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < today)
    }
}

/// Body for creating a lot or replacing one
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LotInput {
    #[validate(required)]
    pub article_id: Option<i64>,
    #[validate(required, length(min = 1, max = 100))]
    pub lot_number: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    #[validate(custom(function = "validate_date"))]
    pub expires_at: Option<String>,
    #[validate(required, range(min = 0))]
    pub quantity: Option<i32>,
    #[validate(custom(function = "money"))]
    #[schema(value_type = Option<f64>)]
    pub buy_price: Option<Decimal>,
    #[validate(custom(function = "money"))]
    #[schema(value_type = Option<f64>)]
    pub sell_price: Option<Decimal>,
    #[validate(length(max = 190))]
    pub supplier: Option<String>,
}

/// Lot fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewLot {
    pub article_id: i64,
    pub lot_number: String,
    pub expires_at: Option<NaiveDate>,
    pub quantity: i32,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub supplier: Option<String>,
}

impl LotInput {
    pub fn into_new_lot(self) -> Result<NewLot, ValidationErrors> {
        let expires_at = match self.expires_at.as_deref() {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| {
                let mut errors = ValidationErrors::new();
                if let Err(e) = validate_date(raw) {
                    errors.add("expires_at", e);
                }
                errors
            })?),
            None => None,
        };

        Ok(NewLot {
            article_id: required(self.article_id, "article_id")?,
            lot_number: required(self.lot_number, "lot_number")?,
            quantity: required(self.quantity, "quantity")?,
            expires_at,
            buy_price: self.buy_price.map(round_money),
            sell_price: self.sell_price.map(round_money),
            supplier: self.supplier,
        })
    }
}

/// Query parameters for listing lots
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LotFilter {
    pub article_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for LotFilter {
    fn default() -> Self {
        Self {
            article_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Subtotal, tax and total of one priced line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl LineAmounts {
    /// `None` when the line total would not fit a money column.
    pub fn compute(unit_price: Decimal, tax_rate: Decimal, quantity: i32) -> Option<Self> {
        let subtotal = round_money(unit_price.checked_mul(Decimal::from(quantity))?);
        let tax = round_money(subtotal.checked_mul(tax_rate)?.checked_div(Decimal::ONE_HUNDRED)?);
        let total = subtotal.checked_add(tax)?;
        (total <= MAX_MONEY).then_some(Self { subtotal, tax, total })
    }
}

/// Quantity of a cart line after adding `added` units to `current`.
///
/// Fails as a `quantity` field error when the sum leaves `i32` or the line
/// total would not fit a money column.
pub fn merged_quantity(
    current: i32,
    added: i32,
    unit_price: Decimal,
    tax_rate: Decimal,
) -> Result<i32, ValidationErrors> {
    let out_of_range = || quantity_out_of_range(i64::from(current) + i64::from(added));
    let quantity = current.checked_add(added).ok_or_else(out_of_range)?;
    LineAmounts::compute(unit_price, tax_rate, quantity).ok_or_else(out_of_range)?;
    Ok(quantity)
}

/// One cart entry with the price and tax captured when it was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub article_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    amounts: LineAmounts,
}

impl CartLine {
    pub fn new(
        id: Uuid,
        cart_id: Uuid,
        article_id: i64,
        quantity: i32,
        unit_price: Decimal,
        tax_rate: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let amounts = LineAmounts::compute(unit_price, tax_rate, quantity)
            .ok_or_else(|| quantity_out_of_range(i64::from(quantity)))?;
        Ok(Self {
            id,
            cart_id,
            article_id,
            quantity,
            unit_price,
            tax_rate,
            line_total: amounts.total,
            created_at,
            amounts,
        })
    }

    pub fn amounts(&self) -> LineAmounts {
        self.amounts
    }
}

/// The counter operator's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub lines: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Build a cart view, ordering lines by insertion and summing them.
    pub fn new(id: Uuid, owner_id: Uuid, mut lines: Vec<CartLine>, created_at: DateTime<Utc>) -> Self {
        lines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let (subtotal, tax_total) = lines.iter().map(CartLine::amounts).fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(subtotal, tax), amounts| (subtotal + amounts.subtotal, tax + amounts.tax),
        );

        Self {
            id,
            owner_id,
            lines,
            subtotal,
            tax_total,
            total: subtotal + tax_total,
            created_at,
        }
    }
}

/// Body for adding an article to the cart
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddToCart {
    #[validate(required)]
    pub article_id: Option<i64>,
    #[validate(required, range(min = 1))]
    pub quantity: Option<i32>,
}

/// Body for checking out the cart
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct Checkout {
    #[validate(custom(function = "validate_uuid"))]
    pub customer_id: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[serde(default)]
    pub auto_invoice: bool,
}

/// Checkout fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOrder {
    pub customer_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl Checkout {
    pub fn order(&self) -> CheckoutOrder {
        CheckoutOrder {
            customer_id: self
                .customer_id
                .as_deref()
                .and_then(|raw| Uuid::parse_str(raw).ok()),
            notes: self.notes.clone(),
        }
    }
}

/// One sold quantity drawn from one lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaleLine {
    pub id: i64,
    pub article_id: i64,
    pub lot_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub line_subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub line_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub line_total: Decimal,
}

/// The order recorded by a checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sale {
    pub id: i64,
    pub owner_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub notes: Option<String>,
    pub lines: Vec<SaleLine>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: i64,
    pub sale_id: i64,
    /// `{prefix}-{YYYY}-{seq:06}`
    pub number: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub issued_at: DateTime<Utc>,
}

/// A sale with its invoice, if one was issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaleDetails {
    #[serde(flatten)]
    pub sale: Sale,
    pub invoice: Option<Invoice>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    Issued,
    Failed,
    NotRequested,
}

/// Response of a checkout. The sale is committed whatever the invoice outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResult {
    pub sale: Sale,
    pub invoice: Option<Invoice>,
    pub invoice_status: InvoiceStatus,
    pub invoice_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn test_line_amounts_round_half_away_from_zero() {
        let amounts = LineAmounts::compute(dec("2.35"), dec("5.5"), 3).unwrap();
        assert_eq!(amounts.subtotal, dec("7.05"));
        // 7.05 * 5.5% = 0.38775
        assert_eq!(amounts.tax, dec("0.39"));
        assert_eq!(amounts.total, dec("7.44"));

        let half = LineAmounts::compute(dec("0.10"), dec("25"), 1).unwrap();
        assert_eq!(half.tax, dec("0.03"));
    }

    #[test]
    fn test_line_amounts_refuse_totals_past_column_size() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
        assert_eq!(LineAmounts::compute(huge, dec("0"), 2), None);
        assert_eq!(LineAmounts::compute(MAX_MONEY, dec("20"), 1), None);
        assert_eq!(
            LineAmounts::compute(MAX_MONEY, dec("0"), 1).unwrap().total,
            MAX_MONEY
        );
    }

    #[test]
    fn test_cart_line_rejects_unstorable_total() {
        let err = CartLine::new(Uuid::new_v4(), Uuid::new_v4(), 1, i32::MAX, dec("9.99"), dec("0"), Utc::now())
            .unwrap_err();
        let field = &err.field_errors()["quantity"][0];
        assert_eq!(field.code, "range");
    }

    #[test]
    fn test_merged_quantity() {
        assert_eq!(merged_quantity(2, 3, dec("1.00"), dec("0")).unwrap(), 5);

        let overflow = merged_quantity(i32::MAX, 5, dec("0.00"), dec("0")).unwrap_err();
        assert!(overflow.field_errors().contains_key("quantity"));

        let too_costly = merged_quantity(1, 1, MAX_MONEY, dec("0")).unwrap_err();
        assert_eq!(too_costly.field_errors()["quantity"][0].code, "range");
    }

    #[test]
    fn test_cart_totals_sum_lines() {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();
        let lines = vec![
            CartLine::new(Uuid::new_v4(), cart_id, 1, 2, dec("10.00"), dec("20"), now).unwrap(),
            CartLine::new(Uuid::new_v4(), cart_id, 2, 1, dec("3.50"), dec("0"), now).unwrap(),
        ];

        let cart = Cart::new(cart_id, Uuid::new_v4(), lines, now);
        assert_eq!(cart.subtotal, dec("23.50"));
        assert_eq!(cart.tax_total, dec("4.00"));
        assert_eq!(cart.total, dec("27.50"));
    }

    #[test]
    fn test_add_to_cart_contract() {
        let ok = AddToCart {
            article_id: Some(7),
            quantity: Some(3),
        };
        assert!(ok.validate().is_ok());

        let zero = AddToCart {
            article_id: Some(7),
            quantity: Some(0),
        };
        let errors = zero.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));

        let missing = AddToCart {
            article_id: None,
            quantity: Some(1),
        };
        let errors = missing.validate().unwrap_err();
        assert_eq!(errors.field_errors()["article_id"][0].code, "required");
    }

    fn lot_input() -> LotInput {
        LotInput {
            article_id: Some(7),
            lot_number: Some("L-2026-01".into()),
            expires_at: Some("2027-01-31".into()),
            quantity: Some(10),
            buy_price: Some(dec("1.20")),
            sell_price: None,
            supplier: Some("Laborex".into()),
        }
    }

    fn article_input() -> ArticleInput {
        ArticleInput {
            code: "PARA500".into(),
            name: "Paracetamol 500mg".into(),
            form: None,
            dosage: None,
            unit: None,
            sell_price: Some(dec("2.35")),
            tax_rate: Some(dec("5.5")),
            dci_id: None,
            image: None,
        }
    }

    #[test]
    fn test_article_contract_rejects_blank_code_and_name() {
        let input = ArticleInput {
            code: "   ".into(),
            name: "\t".into(),
            ..article_input()
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields["code"][0].code, "required");
        assert_eq!(fields["name"][0].code, "required");
    }

    #[test]
    fn test_article_contract_caps_sell_price() {
        let input = ArticleInput {
            sell_price: Some(Decimal::from_i128_with_scale(10_i128.pow(28), 0)),
            ..article_input()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.field_errors()["sell_price"][0].code, "range");

        let at_cap = ArticleInput {
            sell_price: Some(MAX_MONEY),
            ..article_input()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_article_input_trims_code() {
        let input = ArticleInput {
            code: "  PARA500 ".into(),
            ..article_input()
        };
        assert_eq!(input.into_new_article().unwrap().code, "PARA500");
    }

    #[test]
    fn test_lot_contract_rejects_negative_quantity() {
        let input = LotInput {
            quantity: Some(-1),
            ..lot_input()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));
    }

    #[test]
    fn test_lot_contract_field_rules() {
        let input = LotInput {
            lot_number: Some("x".repeat(101)),
            expires_at: Some("next tuesday".into()),
            buy_price: Some(dec("-0.01")),
            sell_price: Some(MAX_MONEY + dec("0.01")),
            supplier: Some("s".repeat(191)),
            ..lot_input()
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["lot_number", "expires_at", "buy_price", "sell_price", "supplier"] {
            assert!(fields.contains_key(field), "missing error on {field}");
        }
    }

    #[test]
    fn test_lot_input_into_new_lot_parses_date() {
        let new_lot = lot_input().into_new_lot().unwrap();
        assert_eq!(new_lot.expires_at, NaiveDate::from_ymd_opt(2027, 1, 31));
        assert_eq!(new_lot.quantity, 10);
    }

    #[test]
    fn test_checkout_contract() {
        let bad = Checkout {
            customer_id: Some("42".into()),
            notes: Some("n".repeat(501)),
            auto_invoice: true,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_id"));
        assert!(errors.field_errors().contains_key("notes"));

        let body: Checkout = serde_json::from_str("{}").unwrap();
        assert!(!body.auto_invoice);
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_include_parsing() {
        let filter = ArticleFilter {
            include: Some("lots, DCI".into()),
            ..Default::default()
        };
        assert!(filter.include_dci());
        assert!(!ArticleFilter::default().include_dci());
    }

    #[test]
    fn test_invoice_status_serializes_snake_case() {
        let json = serde_json::to_value(InvoiceStatus::NotRequested).unwrap();
        assert_eq!(json, "not_requested");
    }
}
