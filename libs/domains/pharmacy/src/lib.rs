//! Pharmacy Domain
//!
//! Article catalog, stock lots, the counter cart and checkout into sales.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← axum router, OpenAPI paths
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌────────────────┐
//! │   Service   │ ──► │ InvoiceIssuer  │
//! └──────┬──────┘     └────────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← in-memory or PostgreSQL
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← entities, request contracts, ArticleResource
//! └─────────────┘
//! ```
//!
//! Checkout draws stock first-expiring-first-out ([`checkout::plan_checkout`])
//! inside one repository transaction. Invoicing runs after the sale commits.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_pharmacy::{InvoiceConfig, PgPharmacyRepository, PharmacyService};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//! let service = PharmacyService::new(PgPharmacyRepository::new(db), InvoiceConfig::default());
//! let router = domain_pharmacy::handlers::router(service);
//! # Ok(())
//! # }
//! ```

pub mod checkout;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod invoice;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod resource;
pub mod service;
pub mod validation;

pub use error::{PharmacyError, PharmacyResult};
pub use handlers::ApiDoc;
pub use invoice::{InvoiceConfig, InvoiceIssuer, RepositoryInvoiceIssuer};
pub use models::{
    AddToCart, Article, ArticleFilter, ArticleInput, ArticleWithDci, Cart, CartLine, Checkout,
    CheckoutResult, Dci, Invoice, InvoiceStatus, Lot, LotFilter, LotInput, Sale, SaleDetails,
    SaleLine,
};
pub use postgres::PgPharmacyRepository;
pub use repository::{InMemoryPharmacyRepository, PharmacyRepository};
pub use resource::{ArticleResource, DciSummary};
pub use service::PharmacyService;
