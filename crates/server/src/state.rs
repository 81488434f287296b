//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tidepool_core::TenantId;

use crate::config::ServerConfig;
use crate::db::metrics::DashboardStats;
use crate::shopify::RestFeedFactory;
use crate::sync::SyncGuard;

/// Dashboard aggregates are cheap to stale-read; a short TTL keeps repeat
/// dashboard loads off the database between syncs.
const STATS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    feeds: RestFeedFactory,
    guard: Arc<SyncGuard>,
    stats_cache: Cache<TenantId, DashboardStats>,
}

impl AppState {
    /// Build the shared state from loaded configuration and a live pool.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the shared HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let feeds = RestFeedFactory::new(config.shopify.clone())?;
        let stats_cache = Cache::builder()
            .time_to_live(STATS_CACHE_TTL)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                feeds,
                guard: Arc::new(SyncGuard::new()),
                stats_cache,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn feeds(&self) -> &RestFeedFactory {
        &self.inner.feeds
    }

    #[must_use]
    pub fn guard(&self) -> &Arc<SyncGuard> {
        &self.inner.guard
    }

    #[must_use]
    pub fn stats_cache(&self) -> &Cache<TenantId, DashboardStats> {
        &self.inner.stats_cache
    }
}
