//! Invoice issuing for checkouts that ask for it.

use async_trait::async_trait;
use chrono::Utc;
use core_config::{ConfigError, FromEnv, env_or_default};
use std::sync::Arc;

use crate::error::PharmacyResult;
use crate::models::{Invoice, Sale};
use crate::repository::PharmacyRepository;

pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// `INV-2026-000042`
pub fn format_invoice_number(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:06}", prefix, year, sequence)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceConfig {
    pub prefix: String,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }
}

/// Environment variables:
/// - `INVOICE_PREFIX` (default: `INV`)
impl FromEnv for InvoiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let prefix = env_or_default("INVOICE_PREFIX", DEFAULT_INVOICE_PREFIX);
        if prefix.trim().is_empty() || prefix.len() > 16 {
            return Err(ConfigError::ParseError {
                key: "INVOICE_PREFIX".to_string(),
                details: "must be 1 to 16 characters".to_string(),
            });
        }
        Ok(Self { prefix })
    }
}

/// Issues the invoice of a committed sale.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    async fn issue(&self, sale: &Sale) -> PharmacyResult<Invoice>;
}

/// Numbers invoices from the store's per-year counter.
pub struct RepositoryInvoiceIssuer<R: PharmacyRepository> {
    repository: Arc<R>,
    config: InvoiceConfig,
}

impl<R: PharmacyRepository> RepositoryInvoiceIssuer<R> {
    pub fn new(repository: Arc<R>, config: InvoiceConfig) -> Self {
        Self { repository, config }
    }
}

#[async_trait]
impl<R: PharmacyRepository> InvoiceIssuer for RepositoryInvoiceIssuer<R> {
    async fn issue(&self, sale: &Sale) -> PharmacyResult<Invoice> {
        self.repository
            .create_invoice(sale.id, self.config.prefix.clone(), Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_invoice_number() {
        assert_eq!(format_invoice_number("INV", 2026, 42), "INV-2026-000042");
        assert_eq!(format_invoice_number("PH", 2027, 1_234_567), "PH-2027-1234567");
    }

    #[test]
    fn test_invoice_config_from_env() {
        temp_env::with_var("INVOICE_PREFIX", Some("PHX"), || {
            assert_eq!(InvoiceConfig::from_env().unwrap().prefix, "PHX");
        });
        temp_env::with_var_unset("INVOICE_PREFIX", || {
            assert_eq!(InvoiceConfig::from_env().unwrap(), InvoiceConfig::default());
        });
        temp_env::with_var("INVOICE_PREFIX", Some("  "), || {
            assert!(InvoiceConfig::from_env().is_err());
        });
    }
}
