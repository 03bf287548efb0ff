use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::checkout::plan_checkout;
use crate::error::{PharmacyError, PharmacyResult};
use crate::invoice::format_invoice_number;
use crate::models::{
    Article, ArticleFilter, ArticleWithDci, Cart, CartLine, CheckoutOrder, Dci, Invoice, Lot,
    LotFilter, NewArticle, NewLot, Sale, SaleLine, merged_quantity,
};

/// Persistence for the pharmacy: catalog, stock, carts and sales.
///
/// Every cart-level write is one transaction in the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PharmacyRepository: Send + Sync {
    async fn list_dcis(&self) -> PharmacyResult<Vec<Dci>>;

    async fn get_dci(&self, id: i64) -> PharmacyResult<Option<Dci>>;

    /// List articles; `dci` is filled only when `filter.include_dci()`.
    async fn list_articles(&self, filter: ArticleFilter) -> PharmacyResult<Vec<ArticleWithDci>>;

    async fn get_article(&self, id: i64, include_dci: bool) -> PharmacyResult<Option<ArticleWithDci>>;

    async fn create_article(&self, input: NewArticle) -> PharmacyResult<Article>;

    async fn update_article(&self, id: i64, input: NewArticle) -> PharmacyResult<Article>;

    /// Lots ordered by expiry ascending, undated last.
    async fn list_lots(&self, filter: LotFilter) -> PharmacyResult<Vec<Lot>>;

    async fn create_lot(&self, input: NewLot) -> PharmacyResult<Lot>;

    async fn update_lot(&self, id: i64, input: NewLot) -> PharmacyResult<Lot>;

    async fn delete_lot(&self, id: i64) -> PharmacyResult<bool>;

    /// The owner's cart, created on first access.
    async fn get_cart(&self, owner_id: Uuid) -> PharmacyResult<Cart>;

    /// Add `quantity` of an article, snapshotting its current price and tax
    /// rate on a new line or bumping the existing line.
    async fn add_to_cart(&self, owner_id: Uuid, article_id: i64, quantity: i32) -> PharmacyResult<Cart>;

    async fn remove_cart_line(&self, owner_id: Uuid, line_id: Uuid) -> PharmacyResult<bool>;

    async fn clear_cart(&self, owner_id: Uuid) -> PharmacyResult<()>;

    /// Allocate stock FEFO, decrement lots, record the sale and empty the cart.
    async fn checkout(&self, owner_id: Uuid, order: CheckoutOrder, today: NaiveDate) -> PharmacyResult<Sale>;

    async fn get_sale(&self, id: i64) -> PharmacyResult<Option<Sale>>;

    /// Record an invoice for a sale with the next number of the year.
    async fn create_invoice(&self, sale_id: i64, prefix: String, issued_at: DateTime<Utc>) -> PharmacyResult<Invoice>;

    async fn get_invoice_for_sale(&self, sale_id: i64) -> PharmacyResult<Option<Invoice>>;
}

#[derive(Debug, Clone)]
struct StoredArticle {
    id: i64,
    input: NewArticle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredCart {
    id: Uuid,
    created_at: DateTime<Utc>,
    lines: Vec<CartLine>,
}

#[derive(Debug, Default)]
struct PharmacyStore {
    dcis: BTreeMap<i64, Dci>,
    articles: BTreeMap<i64, StoredArticle>,
    lots: BTreeMap<i64, Lot>,
    carts: HashMap<Uuid, StoredCart>,
    sales: BTreeMap<i64, Sale>,
    invoices: BTreeMap<i64, Invoice>,
    /// Keyed by (prefix, year)
    invoice_counters: HashMap<(String, i32), i64>,
    next_id: i64,
}

impl PharmacyStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn stock_of(&self, article_id: i64) -> i64 {
        self.lots
            .values()
            .filter(|lot| lot.article_id == article_id)
            .map(|lot| i64::from(lot.quantity))
            .sum()
    }

    fn article(&self, stored: &StoredArticle) -> Article {
        Article {
            id: stored.id,
            code: stored.input.code.clone(),
            name: stored.input.name.clone(),
            form: stored.input.form.clone(),
            dosage: stored.input.dosage.clone(),
            unit: stored.input.unit.clone(),
            sell_price: stored.input.sell_price,
            tax_rate: stored.input.tax_rate,
            stock: self.stock_of(stored.id),
            dci_id: stored.input.dci_id,
            image: stored.input.image.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    fn with_dci(&self, stored: &StoredArticle, include_dci: bool) -> ArticleWithDci {
        let dci = if include_dci {
            stored.input.dci_id.and_then(|id| self.dcis.get(&id).cloned())
        } else {
            None
        };
        ArticleWithDci {
            article: self.article(stored),
            dci,
        }
    }

    fn code_taken(&self, code: &str, except: Option<i64>) -> bool {
        self.articles
            .values()
            .any(|a| Some(a.id) != except && a.input.code.eq_ignore_ascii_case(code))
    }

    fn cart_mut(&mut self, owner_id: Uuid) -> &mut StoredCart {
        self.carts.entry(owner_id).or_insert_with(|| StoredCart {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            lines: Vec::new(),
        })
    }

    fn cart_view(&mut self, owner_id: Uuid) -> Cart {
        let cart = self.cart_mut(owner_id);
        Cart::new(cart.id, owner_id, cart.lines.clone(), cart.created_at)
    }
}

/// In-memory implementation of PharmacyRepository (for development/testing).
///
/// Writes hold the single store lock for their whole duration.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPharmacyRepository {
    store: Arc<RwLock<PharmacyStore>>,
}

impl InMemoryPharmacyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a DCI. There is no write endpoint for DCIs.
    pub async fn insert_dci(&self, name: impl Into<String>) -> Dci {
        let mut store = self.store.write().await;
        let dci = Dci {
            id: store.next_id(),
            name: name.into(),
        };
        store.dcis.insert(dci.id, dci.clone());
        dci
    }
}

#[async_trait]
impl PharmacyRepository for InMemoryPharmacyRepository {
    async fn list_dcis(&self) -> PharmacyResult<Vec<Dci>> {
        let store = self.store.read().await;
        let mut dcis: Vec<Dci> = store.dcis.values().cloned().collect();
        dcis.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dcis)
    }

    async fn get_dci(&self, id: i64) -> PharmacyResult<Option<Dci>> {
        let store = self.store.read().await;
        Ok(store.dcis.get(&id).cloned())
    }

    async fn list_articles(&self, filter: ArticleFilter) -> PharmacyResult<Vec<ArticleWithDci>> {
        let store = self.store.read().await;
        let include_dci = filter.include_dci();
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut result: Vec<ArticleWithDci> = store
            .articles
            .values()
            .filter(|a| match &search {
                Some(term) => {
                    a.input.code.to_lowercase().contains(term)
                        || a.input.name.to_lowercase().contains(term)
                }
                None => true,
            })
            .map(|a| store.with_dci(a, include_dci))
            .collect();

        result.sort_by(|a, b| {
            a.article
                .name
                .cmp(&b.article.name)
                .then(a.article.id.cmp(&b.article.id))
        });

        Ok(result
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn get_article(&self, id: i64, include_dci: bool) -> PharmacyResult<Option<ArticleWithDci>> {
        let store = self.store.read().await;
        Ok(store.articles.get(&id).map(|a| store.with_dci(a, include_dci)))
    }

    async fn create_article(&self, input: NewArticle) -> PharmacyResult<Article> {
        let mut store = self.store.write().await;

        if store.code_taken(&input.code, None) {
            return Err(PharmacyError::DuplicateArticleCode(input.code));
        }

        let now = Utc::now();
        let stored = StoredArticle {
            id: store.next_id(),
            input,
            created_at: now,
            updated_at: now,
        };
        store.articles.insert(stored.id, stored.clone());

        tracing::info!(article_id = stored.id, "Created article");
        Ok(store.article(&stored))
    }

    async fn update_article(&self, id: i64, input: NewArticle) -> PharmacyResult<Article> {
        let mut store = self.store.write().await;

        if !store.articles.contains_key(&id) {
            return Err(PharmacyError::ArticleNotFound(id));
        }
        if store.code_taken(&input.code, Some(id)) {
            return Err(PharmacyError::DuplicateArticleCode(input.code));
        }

        let stored = store
            .articles
            .get_mut(&id)
            .ok_or(PharmacyError::ArticleNotFound(id))?;
        stored.input = input;
        stored.updated_at = Utc::now();
        let stored = stored.clone();

        tracing::info!(article_id = id, "Updated article");
        Ok(store.article(&stored))
    }

    async fn list_lots(&self, filter: LotFilter) -> PharmacyResult<Vec<Lot>> {
        let store = self.store.read().await;

        let mut result: Vec<Lot> = store
            .lots
            .values()
            .filter(|lot| filter.article_id.is_none_or(|id| lot.article_id == id))
            .cloned()
            .collect();
        result.sort_by_key(|lot| (lot.expires_at.is_none(), lot.expires_at, lot.id));

        Ok(result
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn create_lot(&self, input: NewLot) -> PharmacyResult<Lot> {
        let mut store = self.store.write().await;

        if !store.articles.contains_key(&input.article_id) {
            return Err(PharmacyError::ArticleNotFound(input.article_id));
        }

        let now = Utc::now();
        let lot = Lot {
            id: store.next_id(),
            article_id: input.article_id,
            lot_number: input.lot_number,
            expires_at: input.expires_at,
            quantity: input.quantity,
            buy_price: input.buy_price,
            sell_price: input.sell_price,
            supplier: input.supplier,
            created_at: now,
            updated_at: now,
        };
        store.lots.insert(lot.id, lot.clone());

        tracing::info!(lot_id = lot.id, article_id = lot.article_id, "Created lot");
        Ok(lot)
    }

    async fn update_lot(&self, id: i64, input: NewLot) -> PharmacyResult<Lot> {
        let mut store = self.store.write().await;

        if !store.articles.contains_key(&input.article_id) {
            return Err(PharmacyError::ArticleNotFound(input.article_id));
        }

        let lot = store.lots.get_mut(&id).ok_or(PharmacyError::LotNotFound(id))?;
        lot.article_id = input.article_id;
        lot.lot_number = input.lot_number;
        lot.expires_at = input.expires_at;
        lot.quantity = input.quantity;
        lot.buy_price = input.buy_price;
        lot.sell_price = input.sell_price;
        lot.supplier = input.supplier;
        lot.updated_at = Utc::now();

        tracing::info!(lot_id = id, "Updated lot");
        Ok(lot.clone())
    }

    async fn delete_lot(&self, id: i64) -> PharmacyResult<bool> {
        let mut store = self.store.write().await;

        let sold_from = store
            .sales
            .values()
            .any(|sale| sale.lines.iter().any(|line| line.lot_id == id));
        if sold_from {
            return Err(PharmacyError::LotInUse(id));
        }

        if store.lots.remove(&id).is_some() {
            tracing::info!(lot_id = id, "Deleted lot");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn get_cart(&self, owner_id: Uuid) -> PharmacyResult<Cart> {
        let mut store = self.store.write().await;
        Ok(store.cart_view(owner_id))
    }

    async fn add_to_cart(&self, owner_id: Uuid, article_id: i64, quantity: i32) -> PharmacyResult<Cart> {
        let mut store = self.store.write().await;

        let (unit_price, tax_rate) = store
            .articles
            .get(&article_id)
            .map(|a| (a.input.sell_price, a.input.tax_rate))
            .ok_or(PharmacyError::ArticleNotFound(article_id))?;

        let cart = store.cart_mut(owner_id);
        match cart.lines.iter_mut().find(|l| l.article_id == article_id) {
            Some(line) => {
                let merged = merged_quantity(line.quantity, quantity, line.unit_price, line.tax_rate)?;
                *line = CartLine::new(
                    line.id,
                    line.cart_id,
                    article_id,
                    merged,
                    line.unit_price,
                    line.tax_rate,
                    line.created_at,
                )?;
            }
            None => {
                let line = CartLine::new(
                    Uuid::now_v7(),
                    cart.id,
                    article_id,
                    quantity,
                    unit_price,
                    tax_rate,
                    Utc::now(),
                )?;
                cart.lines.push(line);
            }
        }

        Ok(store.cart_view(owner_id))
    }

    async fn remove_cart_line(&self, owner_id: Uuid, line_id: Uuid) -> PharmacyResult<bool> {
        let mut store = self.store.write().await;

        let Some(cart) = store.carts.get_mut(&owner_id) else {
            return Ok(false);
        };
        let before = cart.lines.len();
        cart.lines.retain(|l| l.id != line_id);
        Ok(cart.lines.len() < before)
    }

    async fn clear_cart(&self, owner_id: Uuid) -> PharmacyResult<()> {
        let mut store = self.store.write().await;
        if let Some(cart) = store.carts.get_mut(&owner_id) {
            cart.lines.clear();
        }
        Ok(())
    }

    async fn checkout(&self, owner_id: Uuid, order: CheckoutOrder, today: NaiveDate) -> PharmacyResult<Sale> {
        let mut store = self.store.write().await;

        let lines = store
            .carts
            .get(&owner_id)
            .map(|c| c.lines.clone())
            .unwrap_or_default();
        let lots: Vec<Lot> = store.lots.values().cloned().collect();

        let plan = plan_checkout(&lines, &lots, today)?;

        let now = Utc::now();
        for allocation in plan.decrements() {
            if let Some(lot) = store.lots.get_mut(&allocation.lot_id) {
                lot.quantity -= allocation.quantity;
                lot.updated_at = now;
            }
        }

        let mut sale_lines = Vec::with_capacity(plan.lines.len());
        for planned in &plan.lines {
            sale_lines.push(SaleLine {
                id: store.next_id(),
                article_id: planned.article_id,
                lot_id: planned.lot_id,
                quantity: planned.quantity,
                unit_price: planned.unit_price,
                tax_rate: planned.tax_rate,
                line_subtotal: planned.amounts.subtotal,
                line_tax: planned.amounts.tax,
                line_total: planned.amounts.total,
            });
        }

        let sale = Sale {
            id: store.next_id(),
            owner_id,
            customer_id: order.customer_id,
            notes: order.notes,
            lines: sale_lines,
            subtotal: plan.subtotal,
            tax_total: plan.tax_total,
            total: plan.total,
            created_at: now,
        };
        store.sales.insert(sale.id, sale.clone());

        if let Some(cart) = store.carts.get_mut(&owner_id) {
            cart.lines.clear();
        }

        tracing::info!(sale_id = sale.id, total = %sale.total, "Recorded sale");
        Ok(sale)
    }

    async fn get_sale(&self, id: i64) -> PharmacyResult<Option<Sale>> {
        let store = self.store.read().await;
        Ok(store.sales.get(&id).cloned())
    }

    async fn create_invoice(&self, sale_id: i64, prefix: String, issued_at: DateTime<Utc>) -> PharmacyResult<Invoice> {
        let mut store = self.store.write().await;

        let total = store
            .sales
            .get(&sale_id)
            .map(|s| s.total)
            .ok_or(PharmacyError::SaleNotFound(sale_id))?;
        if store.invoices.contains_key(&sale_id) {
            return Err(PharmacyError::AlreadyInvoiced(sale_id));
        }

        let year = issued_at.year();
        let counter = store.invoice_counters.entry((prefix.clone(), year)).or_insert(0);
        *counter += 1;
        let number = format_invoice_number(&prefix, year, *counter);

        let invoice = Invoice {
            id: store.next_id(),
            sale_id,
            number,
            total,
            issued_at,
        };
        store.invoices.insert(sale_id, invoice.clone());

        tracing::info!(sale_id, invoice_number = %invoice.number, "Issued invoice");
        Ok(invoice)
    }

    async fn get_invoice_for_sale(&self, sale_id: i64) -> PharmacyResult<Option<Invoice>> {
        let store = self.store.read().await;
        Ok(store.invoices.get(&sale_id).cloned())
    }
}
