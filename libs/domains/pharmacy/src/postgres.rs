use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::checkout::plan_checkout;
use crate::entity::{article, cart, cart_line, dci, invoice, lot, sale, sale_line};
use crate::error::{PharmacyError, PharmacyResult};
use crate::invoice::format_invoice_number;
use crate::models::{
    Article, ArticleFilter, ArticleWithDci, Cart, CartLine, CheckoutOrder, Dci, Invoice, Lot,
    LotFilter, NewArticle, NewLot, Sale, merged_quantity,
};
use crate::repository::PharmacyRepository;

/// PostgreSQL implementation of PharmacyRepository using SeaORM
#[derive(Clone)]
pub struct PgPharmacyRepository {
    db: DatabaseConnection,
}

impl PgPharmacyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Article row with its stock summed from lots
#[derive(Debug, FromQueryResult)]
struct ArticleRow {
    id: i64,
    code: String,
    name: String,
    form: Option<String>,
    dosage: Option<String>,
    unit: Option<String>,
    sell_price: Decimal,
    tax_rate: Decimal,
    dci_id: Option<i64>,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    stock: i64,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            code: row.code,
            name: row.name,
            form: row.form,
            dosage: row.dosage,
            unit: row.unit,
            sell_price: row.sell_price,
            tax_rate: row.tax_rate,
            stock: row.stock,
            dci_id: row.dci_id,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.code, a.name, a.form, a.dosage, a.unit, a.sell_price, a.tax_rate,
           a.dci_id, a.image, a.created_at, a.updated_at,
           COALESCE((SELECT SUM(l.quantity) FROM lots l WHERE l.article_id = a.id), 0)::BIGINT AS stock
    FROM articles a
"#;

#[derive(Debug, FromQueryResult)]
struct CounterRow {
    last_value: i64,
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    let message = err.to_string();
    message.contains("duplicate key") || message.contains("unique constraint")
}

/// Attach DCIs to articles with one lookup, when requested.
async fn attach_dcis<C: ConnectionTrait>(
    conn: &C,
    articles: Vec<Article>,
    include_dci: bool,
) -> PharmacyResult<Vec<ArticleWithDci>> {
    if !include_dci {
        return Ok(articles
            .into_iter()
            .map(|article| ArticleWithDci { article, dci: None })
            .collect());
    }

    let ids: Vec<i64> = articles.iter().filter_map(|a| a.dci_id).collect();
    let dcis: HashMap<i64, Dci> = if ids.is_empty() {
        HashMap::new()
    } else {
        dci::Entity::find()
            .filter(dci::Column::Id.is_in(ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|m| (m.id, Dci::from(m)))
            .collect()
    };

    Ok(articles
        .into_iter()
        .map(|article| {
            let dci = article.dci_id.and_then(|id| dcis.get(&id).cloned());
            ArticleWithDci { article, dci }
        })
        .collect())
}

async fn find_article<C: ConnectionTrait>(conn: &C, id: i64) -> PharmacyResult<Option<Article>> {
    let sql = format!("{ARTICLE_SELECT} WHERE a.id = $1");
    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);
    let row = ArticleRow::find_by_statement(stmt).one(conn).await?;
    Ok(row.map(Article::from))
}

/// The owner's cart row, inserted on first access.
async fn cart_for<C: ConnectionTrait>(conn: &C, owner_id: Uuid) -> PharmacyResult<cart::Model> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO carts (id, owner_id, created_at) VALUES ($1, $2, NOW()) ON CONFLICT (owner_id) DO NOTHING",
        [Uuid::now_v7().into(), owner_id.into()],
    );
    conn.execute_raw(stmt).await?;

    locked_cart(conn, owner_id)
        .await?
        .ok_or_else(|| PharmacyError::Internal(format!("Cart for {} vanished", owner_id)))
}

/// The owner's cart row held `FOR UPDATE`.
///
/// Every write to a cart's lines takes this lock first, so adds, removals
/// and checkout of one cart run one after another.
async fn locked_cart<C: ConnectionTrait>(conn: &C, owner_id: Uuid) -> PharmacyResult<Option<cart::Model>> {
    Ok(cart::Entity::find()
        .filter(cart::Column::OwnerId.eq(owner_id))
        .lock_exclusive()
        .one(conn)
        .await?)
}

fn to_cart_lines(models: Vec<cart_line::Model>) -> PharmacyResult<Vec<CartLine>> {
    models.into_iter().map(CartLine::try_from).collect()
}

async fn cart_view<C: ConnectionTrait>(conn: &C, cart: cart::Model) -> PharmacyResult<Cart> {
    let lines = cart_line::Entity::find()
        .filter(cart_line::Column::CartId.eq(cart.id))
        .order_by_asc(cart_line::Column::CreatedAt)
        .order_by_asc(cart_line::Column::Id)
        .all(conn)
        .await?;
    let lines = to_cart_lines(lines)?;

    Ok(Cart::new(cart.id, cart.owner_id, lines, cart.created_at.into()))
}

async fn load_sale<C: ConnectionTrait>(conn: &C, id: i64) -> PharmacyResult<Option<Sale>> {
    let Some(model) = sale::Entity::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let lines = sale_line::Entity::find()
        .filter(sale_line::Column::SaleId.eq(id))
        .order_by_asc(sale_line::Column::Id)
        .all(conn)
        .await?;
    Ok(Some(model.into_sale(lines)))
}

#[async_trait]
impl PharmacyRepository for PgPharmacyRepository {
    async fn list_dcis(&self) -> PharmacyResult<Vec<Dci>> {
        let models = dci::Entity::find()
            .order_by_asc(dci::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Dci::from).collect())
    }

    async fn get_dci(&self, id: i64) -> PharmacyResult<Option<Dci>> {
        let model = dci::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Dci::from))
    }

    async fn list_articles(&self, filter: ArticleFilter) -> PharmacyResult<Vec<ArticleWithDci>> {
        let include_dci = filter.include_dci();
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", term.replace('%', "\\%").replace('_', "\\_")));

        let sql = format!(
            "{ARTICLE_SELECT} WHERE ($1::TEXT IS NULL OR a.code ILIKE $1 OR a.name ILIKE $1) \
             ORDER BY a.name, a.id LIMIT $2 OFFSET $3"
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                pattern.into(),
                (filter.limit as i64).into(),
                (filter.offset as i64).into(),
            ],
        );

        let articles: Vec<Article> = ArticleRow::find_by_statement(stmt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Article::from)
            .collect();

        attach_dcis(&self.db, articles, include_dci).await
    }

    async fn get_article(&self, id: i64, include_dci: bool) -> PharmacyResult<Option<ArticleWithDci>> {
        let Some(article) = find_article(&self.db, id).await? else {
            return Ok(None);
        };
        let mut loaded = attach_dcis(&self.db, vec![article], include_dci).await?;
        Ok(loaded.pop())
    }

    async fn create_article(&self, input: NewArticle) -> PharmacyResult<Article> {
        let code = input.code.clone();
        let active: article::ActiveModel = input.into();

        let model = active.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                PharmacyError::DuplicateArticleCode(code.clone())
            } else {
                PharmacyError::from(e)
            }
        })?;

        tracing::info!(article_id = model.id, "Created article");
        Ok(model.into_article(0))
    }

    async fn update_article(&self, id: i64, input: NewArticle) -> PharmacyResult<Article> {
        let existing = article::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(PharmacyError::ArticleNotFound(id))?;

        let code = input.code.clone();
        let mut active: article::ActiveModel = input.into();
        active.id = Set(existing.id);
        active.created_at = Set(existing.created_at);

        active.update(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                PharmacyError::DuplicateArticleCode(code.clone())
            } else {
                PharmacyError::from(e)
            }
        })?;

        tracing::info!(article_id = id, "Updated article");
        find_article(&self.db, id)
            .await?
            .ok_or(PharmacyError::ArticleNotFound(id))
    }

    async fn list_lots(&self, filter: LotFilter) -> PharmacyResult<Vec<Lot>> {
        let mut query = lot::Entity::find();
        if let Some(article_id) = filter.article_id {
            query = query.filter(lot::Column::ArticleId.eq(article_id));
        }

        // ASC puts NULL expiry dates last in PostgreSQL
        let models = query
            .order_by_asc(lot::Column::ExpiresAt)
            .order_by_asc(lot::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Lot::from).collect())
    }

    async fn create_lot(&self, input: NewLot) -> PharmacyResult<Lot> {
        if article::Entity::find_by_id(input.article_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(PharmacyError::ArticleNotFound(input.article_id));
        }

        let active: lot::ActiveModel = input.into();
        let model = active.insert(&self.db).await?;

        tracing::info!(lot_id = model.id, article_id = model.article_id, "Created lot");
        Ok(model.into())
    }

    async fn update_lot(&self, id: i64, input: NewLot) -> PharmacyResult<Lot> {
        let txn = self.db.begin().await?;

        let existing = lot::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(PharmacyError::LotNotFound(id))?;
        if article::Entity::find_by_id(input.article_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(PharmacyError::ArticleNotFound(input.article_id));
        }

        let mut active = existing.into_active_model();
        active.apply(input);
        let model = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(lot_id = id, "Updated lot");
        Ok(model.into())
    }

    async fn delete_lot(&self, id: i64) -> PharmacyResult<bool> {
        let result = lot::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| {
                if e.to_string().contains("foreign key") {
                    PharmacyError::LotInUse(id)
                } else {
                    PharmacyError::from(e)
                }
            })?;

        if result.rows_affected > 0 {
            tracing::info!(lot_id = id, "Deleted lot");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn get_cart(&self, owner_id: Uuid) -> PharmacyResult<Cart> {
        let txn = self.db.begin().await?;
        let cart = cart_for(&txn, owner_id).await?;
        let view = cart_view(&txn, cart).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn add_to_cart(&self, owner_id: Uuid, article_id: i64, quantity: i32) -> PharmacyResult<Cart> {
        let txn = self.db.begin().await?;

        let cart = cart_for(&txn, owner_id).await?;
        let article = article::Entity::find_by_id(article_id)
            .one(&txn)
            .await?
            .ok_or(PharmacyError::ArticleNotFound(article_id))?;

        let existing = cart_line::Entity::find()
            .filter(cart_line::Column::CartId.eq(cart.id))
            .filter(cart_line::Column::ArticleId.eq(article_id))
            .one(&txn)
            .await?;
        // The cart lock keeps this line stable until the upsert
        match &existing {
            Some(line) => merged_quantity(line.quantity, quantity, line.unit_price, line.tax_rate)?,
            None => merged_quantity(0, quantity, article.sell_price, article.tax_rate)?,
        };

        // An existing line keeps its original price snapshot
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO cart_lines (id, cart_id, article_id, quantity, unit_price, tax_rate, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (cart_id, article_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            "#,
            [
                Uuid::now_v7().into(),
                cart.id.into(),
                article_id.into(),
                quantity.into(),
                article.sell_price.into(),
                article.tax_rate.into(),
            ],
        );
        txn.execute_raw(stmt).await?;

        let view = cart_view(&txn, cart).await?;
        txn.commit().await?;
        Ok(view)
    }

    async fn remove_cart_line(&self, owner_id: Uuid, line_id: Uuid) -> PharmacyResult<bool> {
        let txn = self.db.begin().await?;
        let Some(cart) = locked_cart(&txn, owner_id).await? else {
            return Ok(false);
        };

        let result = cart_line::Entity::delete_many()
            .filter(cart_line::Column::Id.eq(line_id))
            .filter(cart_line::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn clear_cart(&self, owner_id: Uuid) -> PharmacyResult<()> {
        let txn = self.db.begin().await?;
        if let Some(cart) = locked_cart(&txn, owner_id).await? {
            cart_line::Entity::delete_many()
                .filter(cart_line::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn checkout(&self, owner_id: Uuid, order: CheckoutOrder, today: NaiveDate) -> PharmacyResult<Sale> {
        let txn = self.db.begin().await?;

        let Some(cart) = locked_cart(&txn, owner_id).await? else {
            return Err(PharmacyError::EmptyCart);
        };

        let line_models = cart_line::Entity::find()
            .filter(cart_line::Column::CartId.eq(cart.id))
            .order_by_asc(cart_line::Column::CreatedAt)
            .order_by_asc(cart_line::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await?;
        let line_ids: Vec<Uuid> = line_models.iter().map(|m| m.id).collect();
        let lines = to_cart_lines(line_models)?;
        if lines.is_empty() {
            return Err(PharmacyError::EmptyCart);
        }

        // Lock every lot the cart can draw from, in id order
        let article_ids: Vec<i64> = lines.iter().map(|l| l.article_id).collect();
        let lot_models = lot::Entity::find()
            .filter(lot::Column::ArticleId.is_in(article_ids))
            .order_by_asc(lot::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await?;
        let lots: Vec<Lot> = lot_models.iter().cloned().map(Lot::from).collect();

        let plan = plan_checkout(&lines, &lots, today)?;

        let now = Utc::now();
        for allocation in plan.decrements() {
            let Some(model) = lot_models.iter().find(|m| m.id == allocation.lot_id) else {
                continue;
            };
            let mut active = model.clone().into_active_model();
            active.quantity = Set(model.quantity - allocation.quantity);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }

        let sale_model = sale::ActiveModel {
            id: NotSet,
            owner_id: Set(owner_id),
            customer_id: Set(order.customer_id),
            notes: Set(order.notes),
            subtotal: Set(plan.subtotal),
            tax_total: Set(plan.tax_total),
            total: Set(plan.total),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut sale_lines = Vec::with_capacity(plan.lines.len());
        for planned in &plan.lines {
            let line = sale_line::ActiveModel {
                id: NotSet,
                sale_id: Set(sale_model.id),
                article_id: Set(planned.article_id),
                lot_id: Set(planned.lot_id),
                quantity: Set(planned.quantity),
                unit_price: Set(planned.unit_price),
                tax_rate: Set(planned.tax_rate),
                line_subtotal: Set(planned.amounts.subtotal),
                line_tax: Set(planned.amounts.tax),
                line_total: Set(planned.amounts.total),
            }
            .insert(&txn)
            .await?;
            sale_lines.push(line);
        }

        // Only the lines that were sold
        cart_line::Entity::delete_many()
            .filter(cart_line::Column::Id.is_in(line_ids))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let sale = sale_model.into_sale(sale_lines);
        tracing::info!(sale_id = sale.id, total = %sale.total, "Recorded sale");
        Ok(sale)
    }

    async fn get_sale(&self, id: i64) -> PharmacyResult<Option<Sale>> {
        load_sale(&self.db, id).await
    }

    async fn create_invoice(&self, sale_id: i64, prefix: String, issued_at: DateTime<Utc>) -> PharmacyResult<Invoice> {
        let txn = self.db.begin().await?;

        let sale = sale::Entity::find_by_id(sale_id)
            .one(&txn)
            .await?
            .ok_or(PharmacyError::SaleNotFound(sale_id))?;

        if invoice::Entity::find()
            .filter(invoice::Column::SaleId.eq(sale_id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(PharmacyError::AlreadyInvoiced(sale_id));
        }

        let year = issued_at.year();
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO invoice_counters (prefix, year, last_value) VALUES ($1, $2, 1)
            ON CONFLICT (prefix, year) DO UPDATE SET last_value = invoice_counters.last_value + 1
            RETURNING last_value
            "#,
            [prefix.clone().into(), year.into()],
        );
        let sequence = CounterRow::find_by_statement(stmt)
            .one(&txn)
            .await?
            .map(|row| row.last_value)
            .ok_or_else(|| PharmacyError::Invoice("Invoice counter returned no row".to_string()))?;

        let model = invoice::ActiveModel {
            id: NotSet,
            sale_id: Set(sale_id),
            number: Set(format_invoice_number(&prefix, year, sequence)),
            total: Set(sale.total),
            issued_at: Set(issued_at.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(sale_id, invoice_number = %model.number, "Issued invoice");
        Ok(model.into())
    }

    async fn get_invoice_for_sale(&self, sale_id: i64) -> PharmacyResult<Option<Invoice>> {
        let model = invoice::Entity::find()
            .filter(invoice::Column::SaleId.eq(sale_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Invoice::from))
    }
}
