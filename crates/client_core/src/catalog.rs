//! One-time service catalog load shared by every selection scope.
//!
//! Concurrent callers that arrive while a fetch is pending await the same
//! future. A successful result is cached for the lifetime of the cache; a
//! failure leaves the cache unavailable until the next `load()` retries.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use shared::protocol::ServiceCatalog;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{error::CatalogError, DirectoryApi};

type CatalogFuture = Shared<BoxFuture<'static, Result<Arc<ServiceCatalog>, CatalogError>>>;

enum CatalogSlot {
    Empty,
    Pending { attempt: u64, future: CatalogFuture },
    Ready(Arc<ServiceCatalog>),
    Unavailable(CatalogError),
}

pub struct ReferenceCatalogCache {
    api: Arc<dyn DirectoryApi>,
    slot: Mutex<CatalogSlot>,
    attempts: AtomicU64,
    fetches: AtomicUsize,
}

impl ReferenceCatalogCache {
    pub fn new(api: Arc<dyn DirectoryApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            slot: Mutex::new(CatalogSlot::Empty),
            attempts: AtomicU64::new(0),
            fetches: AtomicUsize::new(0),
        })
    }

    pub async fn load(&self) -> Result<Arc<ServiceCatalog>, CatalogError> {
        let (attempt, future) = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                CatalogSlot::Ready(catalog) => return Ok(Arc::clone(catalog)),
                CatalogSlot::Pending { attempt, future } => (*attempt, future.clone()),
                CatalogSlot::Empty | CatalogSlot::Unavailable(_) => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.fetch();
                    *slot = CatalogSlot::Pending {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;

        let mut slot = self.slot.lock().await;
        if matches!(&*slot, CatalogSlot::Pending { attempt: pending, .. } if *pending == attempt) {
            *slot = match &result {
                Ok(catalog) => CatalogSlot::Ready(Arc::clone(catalog)),
                Err(err) => CatalogSlot::Unavailable(err.clone()),
            };
        }
        result
    }

    /// Cached catalog, if a load has completed successfully.
    pub async fn cached(&self) -> Option<Arc<ServiceCatalog>> {
        match &*self.slot.lock().await {
            CatalogSlot::Ready(catalog) => Some(Arc::clone(catalog)),
            _ => None,
        }
    }

    pub async fn last_error(&self) -> Option<CatalogError> {
        match &*self.slot.lock().await {
            CatalogSlot::Unavailable(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Number of backend fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn fetch(&self) -> CatalogFuture {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let api = Arc::clone(&self.api);
        async move {
            match api.load_service_catalog().await {
                Ok(catalog) => {
                    info!(
                        categories = catalog.categories.len(),
                        "service catalog loaded"
                    );
                    Ok(Arc::new(catalog))
                }
                Err(err) => {
                    warn!(error = %err, "service catalog load failed");
                    Err(CatalogError::Unavailable(err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
