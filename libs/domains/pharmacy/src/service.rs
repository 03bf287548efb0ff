use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{PharmacyError, PharmacyResult};
use crate::invoice::{InvoiceConfig, InvoiceIssuer, RepositoryInvoiceIssuer};
use crate::models::{
    AddToCart, ArticleFilter, ArticleInput, Cart, Checkout, CheckoutResult, Dci, InvoiceStatus,
    Lot, LotFilter, LotInput, NewLot, SaleDetails,
};
use crate::repository::PharmacyRepository;
use crate::resource::ArticleResource;
use crate::validation::{exists_error, required};

const MAX_PAGE_SIZE: u64 = 200;

/// Service layer for the pharmacy counter
pub struct PharmacyService<R: PharmacyRepository> {
    repository: Arc<R>,
    invoices: Arc<dyn InvoiceIssuer>,
}

impl<R: PharmacyRepository> Clone for PharmacyService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            invoices: Arc::clone(&self.invoices),
        }
    }
}

impl<R: PharmacyRepository + 'static> PharmacyService<R> {
    /// Service whose invoices are numbered by the same repository.
    pub fn new(repository: R, invoice_config: InvoiceConfig) -> Self {
        let repository = Arc::new(repository);
        let invoices = Arc::new(RepositoryInvoiceIssuer::new(
            Arc::clone(&repository),
            invoice_config,
        ));
        Self {
            repository,
            invoices,
        }
    }
}

impl<R: PharmacyRepository> PharmacyService<R> {
    pub fn with_issuer(repository: Arc<R>, invoices: Arc<dyn InvoiceIssuer>) -> Self {
        Self {
            repository,
            invoices,
        }
    }

    pub async fn list_articles(&self, mut filter: ArticleFilter) -> PharmacyResult<Vec<ArticleResource>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let articles = self.repository.list_articles(filter).await?;
        Ok(articles.iter().map(ArticleResource::from).collect())
    }

    pub async fn get_article(&self, id: i64, include_dci: bool) -> PharmacyResult<ArticleResource> {
        self.repository
            .get_article(id, include_dci)
            .await?
            .map(|loaded| ArticleResource::from(&loaded))
            .ok_or(PharmacyError::ArticleNotFound(id))
    }

    pub async fn create_article(&self, input: ArticleInput) -> PharmacyResult<ArticleResource> {
        input.validate()?;
        self.ensure_dci_exists(input.dci_id).await?;

        let article = self.repository.create_article(input.into_new_article()?).await?;
        Ok(ArticleResource::new(&article, None))
    }

    /// Replace an article. Cart lines keep the price they were added at.
    pub async fn update_article(&self, id: i64, input: ArticleInput) -> PharmacyResult<ArticleResource> {
        input.validate()?;
        self.ensure_dci_exists(input.dci_id).await?;

        let article = self
            .repository
            .update_article(id, input.into_new_article()?)
            .await?;
        Ok(ArticleResource::new(&article, None))
    }

    pub async fn list_dcis(&self) -> PharmacyResult<Vec<Dci>> {
        self.repository.list_dcis().await
    }

    pub async fn list_lots(&self, mut filter: LotFilter) -> PharmacyResult<Vec<Lot>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.repository.list_lots(filter).await
    }

    pub async fn create_lot(&self, input: LotInput) -> PharmacyResult<Lot> {
        let new_lot = self.validated_lot(input).await?;
        let article_id = new_lot.article_id;

        self.repository
            .create_lot(new_lot)
            .await
            .map_err(|e| article_reference_error(e, article_id))
    }

    pub async fn update_lot(&self, id: i64, input: LotInput) -> PharmacyResult<Lot> {
        let new_lot = self.validated_lot(input).await?;
        let article_id = new_lot.article_id;

        self.repository
            .update_lot(id, new_lot)
            .await
            .map_err(|e| article_reference_error(e, article_id))
    }

    pub async fn delete_lot(&self, id: i64) -> PharmacyResult<()> {
        if !self.repository.delete_lot(id).await? {
            return Err(PharmacyError::LotNotFound(id));
        }
        Ok(())
    }

    pub async fn get_cart(&self, owner_id: Uuid) -> PharmacyResult<Cart> {
        self.repository.get_cart(owner_id).await
    }

    pub async fn add_to_cart(&self, owner_id: Uuid, input: AddToCart) -> PharmacyResult<Cart> {
        input.validate()?;
        let article_id = required(input.article_id, "article_id")?;
        let quantity = required(input.quantity, "quantity")?;

        self.ensure_article_exists(article_id).await?;

        let cart = self
            .repository
            .add_to_cart(owner_id, article_id, quantity)
            .await
            .map_err(|e| article_reference_error(e, article_id))?;

        tracing::debug!(%owner_id, article_id, quantity, "Added to cart");
        Ok(cart)
    }

    pub async fn remove_cart_line(&self, owner_id: Uuid, line_id: Uuid) -> PharmacyResult<Cart> {
        if !self.repository.remove_cart_line(owner_id, line_id).await? {
            return Err(PharmacyError::CartLineNotFound(line_id));
        }
        self.repository.get_cart(owner_id).await
    }

    pub async fn clear_cart(&self, owner_id: Uuid) -> PharmacyResult<Cart> {
        self.repository.clear_cart(owner_id).await?;
        self.repository.get_cart(owner_id).await
    }

    /// Check out the owner's cart.
    ///
    /// The sale is committed before invoicing. An invoice failure is reported
    /// in the result and leaves the sale, stock and cart as committed.
    pub async fn checkout(&self, owner_id: Uuid, input: Checkout) -> PharmacyResult<CheckoutResult> {
        input.validate()?;

        let today = Utc::now().date_naive();
        let sale = self
            .repository
            .checkout(owner_id, input.order(), today)
            .await?;

        if !input.auto_invoice {
            return Ok(CheckoutResult {
                sale,
                invoice: None,
                invoice_status: InvoiceStatus::NotRequested,
                invoice_error: None,
            });
        }

        match self.invoices.issue(&sale).await {
            Ok(invoice) => Ok(CheckoutResult {
                sale,
                invoice: Some(invoice),
                invoice_status: InvoiceStatus::Issued,
                invoice_error: None,
            }),
            Err(e) => {
                tracing::warn!(sale_id = sale.id, error = %e, "Invoice issuing failed after checkout");
                Ok(CheckoutResult {
                    sale,
                    invoice: None,
                    invoice_status: InvoiceStatus::Failed,
                    invoice_error: Some(e.to_string()),
                })
            }
        }
    }

    pub async fn get_sale(&self, id: i64) -> PharmacyResult<SaleDetails> {
        let sale = self
            .repository
            .get_sale(id)
            .await?
            .ok_or(PharmacyError::SaleNotFound(id))?;
        let invoice = self.repository.get_invoice_for_sale(id).await?;
        Ok(SaleDetails { sale, invoice })
    }

    async fn validated_lot(&self, input: LotInput) -> PharmacyResult<NewLot> {
        input.validate()?;
        let new_lot = input.into_new_lot()?;
        self.ensure_article_exists(new_lot.article_id).await?;
        Ok(new_lot)
    }

    async fn ensure_article_exists(&self, article_id: i64) -> PharmacyResult<()> {
        match self.repository.get_article(article_id, false).await? {
            Some(_) => Ok(()),
            None => Err(exists_error("article_id", article_id).into()),
        }
    }

    async fn ensure_dci_exists(&self, dci_id: Option<i64>) -> PharmacyResult<()> {
        let Some(dci_id) = dci_id else {
            return Ok(());
        };
        match self.repository.get_dci(dci_id).await? {
            Some(_) => Ok(()),
            None => Err(exists_error("dci_id", dci_id).into()),
        }
    }
}

/// An article that vanished between the check and the write is still an
/// `exists` failure on `article_id`.
fn article_reference_error(err: PharmacyError, article_id: i64) -> PharmacyError {
    match err {
        PharmacyError::ArticleNotFound(id) if id == article_id => {
            exists_error("article_id", article_id).into()
        }
        other => other,
    }
}
