//! Tenant config loading + cache: read-only per turn, short TTL (60 seconds),
//! invalidated on admin updates. The admin config surface itself is out of
//! core scope — this crate only needs *somewhere* to read a `Company` from,
//! loaded once via `figment` and shared by `Arc`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use figment::providers::{Format, Toml};
use figment::Figment;
use receptionist_core::config::Company;
use tracing::{debug, warn};

const DEMO_COMPANY_TOML: &str = include_str!("../fixtures/demo_company.toml");

/// Default TTL for the read-through company cache (spec.md §5).
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum CompanyStoreError {
    #[error("unknown company: {0}")]
    NotFound(String),
    #[error("config parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CompanyStoreError>;

/// spec.md §6.9 Tenant Config read interface.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn get_company(&self, company_id: &str) -> Result<Arc<Company>>;

    /// Drop any cached entry for `company_id` so the next read goes to the
    /// backing source (spec.md §5 "invalidation on admin updates").
    fn invalidate(&self, _company_id: &str) {}
}

/// In-process registry of tenant TOML fragments, keyed by `company_id`.
/// Each tenant's full `frontDeskBehavior` tree is parsed independently —
/// there is no cross-tenant inheritance, matching spec.md §3 Company being
/// entirely self-contained.
pub struct StaticCompanyStore {
    tenants: HashMap<String, String>,
}

impl StaticCompanyStore {
    /// The bundled demo tenant plus anything registered with [`Self::register`].
    pub fn with_demo_tenant() -> Self {
        let mut tenants = HashMap::new();
        tenants.insert("demo".to_string(), DEMO_COMPANY_TOML.to_string());
        Self { tenants }
    }

    pub fn register(&mut self, company_id: impl Into<String>, toml_source: impl Into<String>) {
        self.tenants.insert(company_id.into(), toml_source.into());
    }
}

#[async_trait]
impl CompanyStore for StaticCompanyStore {
    async fn get_company(&self, company_id: &str) -> Result<Arc<Company>> {
        let source = self
            .tenants
            .get(company_id)
            .ok_or_else(|| CompanyStoreError::NotFound(company_id.to_string()))?;

        let company: Company = Figment::new()
            .merge(Toml::string(source))
            .extract()
            .map_err(|e| CompanyStoreError::Parse(e.to_string()))?;

        Ok(Arc::new(company))
    }
}

/// Read-through TTL cache wrapping any [`CompanyStore`] (spec.md §5).
pub struct CachedCompanyStore<S> {
    inner: S,
    ttl: Duration,
    cache: DashMap<String, (Instant, Arc<Company>)>,
}

impl<S: CompanyStore> CachedCompanyStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl<S: CompanyStore> CompanyStore for CachedCompanyStore<S> {
    async fn get_company(&self, company_id: &str) -> Result<Arc<Company>> {
        if let Some(entry) = self.cache.get(company_id) {
            let (fetched_at, company) = entry.value();
            if fetched_at.elapsed() < self.ttl {
                debug!(company_id, "tenant config cache hit");
                return Ok(company.clone());
            }
        }

        let company = self.inner.get_company(company_id).await?;
        self.cache.insert(company_id.to_string(), (Instant::now(), company.clone()));
        Ok(company)
    }

    fn invalidate(&self, company_id: &str) {
        if self.cache.remove(company_id).is_some() {
            warn!(company_id, "tenant config cache entry invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_the_bundled_demo_tenant() {
        let store = StaticCompanyStore::with_demo_tenant();
        let company = store.get_company("demo").await.unwrap();
        assert_eq!(company.company_id, "demo");
        assert_eq!(company.trade, "hvac");
        assert_eq!(company.front_desk_behavior.booking_slots.len(), 4);
    }

    #[tokio::test]
    async fn unknown_tenant_is_an_error() {
        let store = StaticCompanyStore::with_demo_tenant();
        assert!(store.get_company("nope").await.is_err());
    }

    #[tokio::test]
    async fn cache_serves_repeated_reads_without_reparsing() {
        let cached = CachedCompanyStore::new(StaticCompanyStore::with_demo_tenant(), Duration::from_secs(60));
        let first = cached.get_company("demo").await.unwrap();
        let second = cached.get_company("demo").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_read() {
        let cached = CachedCompanyStore::new(StaticCompanyStore::with_demo_tenant(), Duration::from_secs(60));
        let first = cached.get_company("demo").await.unwrap();
        cached.invalidate("demo");
        let second = cached.get_company("demo").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
