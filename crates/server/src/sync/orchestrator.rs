//! Drives one tenant's full synchronization.
//!
//! A run claims the tenant's guard slot, resolves credentials, then fetches
//! and upserts all customer pages, then all product pages, then all order
//! pages - strictly in that order, so order-to-customer references are
//! checked against the freshest possible customer set (the reference itself
//! stays nullable and unenforced). Entity steps never run in parallel;
//! within a tenant the only suspension points are page fetches and record
//! upserts.
//!
//! Any client-level failure stops the remaining steps and reports the counts
//! committed so far. The guard permit releases on drop, so success, failure,
//! and panic all release the tenant's slot. There is no mid-flight
//! cancellation and no end-to-end timeout; per-request ceilings live in the
//! feed.

use std::sync::Arc;

use tidepool_core::{EntityKind, TenantId};
use tracing::{info, instrument};

use super::feed::{FeedFactory, RemoteFeed};
use super::guard::SyncGuard;
use super::store::{CredentialStore, SyncStore};
use super::upsert::Upserter;
use super::{SyncError, SyncFailure, SyncReport};

/// Orchestrates full syncs over injected collaborators.
///
/// No global singletons: the credential store, record store, and feed
/// factory all arrive as explicit dependencies, which is also what makes
/// the whole subsystem testable against fakes.
pub struct SyncOrchestrator<C, S, F> {
    credentials: C,
    store: S,
    feeds: F,
    guard: Arc<SyncGuard>,
}

impl<C, S, F> SyncOrchestrator<C, S, F>
where
    C: CredentialStore,
    S: SyncStore,
    F: FeedFactory,
{
    #[must_use]
    pub const fn new(credentials: C, store: S, feeds: F, guard: Arc<SyncGuard>) -> Self {
        Self {
            credentials,
            store,
            feeds,
            guard,
        }
    }

    /// Run one full sync for the tenant.
    ///
    /// # Errors
    ///
    /// Returns [`SyncFailure`] carrying the terminating error plus the
    /// per-entity counts committed before it. Refusal to start (guard held,
    /// unknown tenant) reports zero counts and performs no work.
    #[instrument(skip(self), fields(%tenant_id))]
    pub async fn start_sync(&self, tenant_id: TenantId) -> Result<SyncReport, SyncFailure> {
        let mut report = SyncReport::default();

        let Some(_permit) = self.guard.try_acquire(tenant_id) else {
            return Err(SyncFailure::new(
                SyncError::SyncInProgress(tenant_id),
                report,
            ));
        };

        let credentials = match self.credentials.lookup(tenant_id).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                return Err(SyncFailure::new(
                    SyncError::TenantNotFound(tenant_id),
                    report,
                ));
            }
            Err(error) => {
                return Err(SyncFailure::new(SyncError::Credentials(error), report));
            }
        };

        info!(tenant = %credentials.name, "starting full sync");

        let feed = self.feeds.feed(&credentials);
        let upserter = Upserter::new(&self.store);

        report.customers = match self.sync_customers(&feed, &upserter, tenant_id).await {
            Ok(committed) => committed,
            Err(error) => return Err(SyncFailure::new(error, report)),
        };

        report.products = match self.sync_products(&feed, &upserter, tenant_id).await {
            Ok(committed) => committed,
            Err(error) => return Err(SyncFailure::new(error, report)),
        };

        report.orders = match self.sync_orders(&feed, &upserter, tenant_id).await {
            Ok(committed) => committed,
            Err(error) => return Err(SyncFailure::new(error, report)),
        };

        info!(
            customers = report.customers,
            products = report.products,
            orders = report.orders,
            "sync completed"
        );

        Ok(report)
    }

    async fn sync_customers(
        &self,
        feed: &F::Feed,
        upserter: &Upserter<'_, S>,
        tenant_id: TenantId,
    ) -> Result<u64, SyncError> {
        let mut committed = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = feed
                .customers_page(cursor.as_deref())
                .await
                .map_err(|source| SyncError::Fetch {
                    kind: EntityKind::Customer,
                    source,
                })?;

            committed += upserter.apply_customers(tenant_id, page.items).await;

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(committed)
    }

    async fn sync_products(
        &self,
        feed: &F::Feed,
        upserter: &Upserter<'_, S>,
        tenant_id: TenantId,
    ) -> Result<u64, SyncError> {
        let mut committed = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = feed
                .products_page(cursor.as_deref())
                .await
                .map_err(|source| SyncError::Fetch {
                    kind: EntityKind::Product,
                    source,
                })?;

            committed += upserter.apply_products(tenant_id, page.items).await;

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(committed)
    }

    async fn sync_orders(
        &self,
        feed: &F::Feed,
        upserter: &Upserter<'_, S>,
        tenant_id: TenantId,
    ) -> Result<u64, SyncError> {
        let mut committed = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = feed
                .orders_page(cursor.as_deref())
                .await
                .map_err(|source| SyncError::Fetch {
                    kind: EntityKind::Order,
                    source,
                })?;

            committed += upserter.apply_orders(tenant_id, page.items).await;

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(committed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;
    use tidepool_core::ExternalId;

    use crate::db::RepositoryError;
    use crate::shopify::ShopifyError;
    use crate::shopify::types::{RemoteCustomer, RemoteOrder, RemoteProduct};
    use crate::sync::feed::Page;
    use crate::sync::store::{
        CredentialStore, CustomerRecord, OrderRecord, ProductRecord, SyncStore, TenantCredentials,
    };

    use super::*;

    // =========================================================================
    // Instrumentation
    // =========================================================================

    /// Everything observable a run does, in order: remote page fetches and
    /// committed writes.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Fetch(EntityKind),
        Write(EntityKind, TenantId, String),
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    fn fetch_positions(events: &[Event], kind: EntityKind) -> Vec<usize> {
        events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| matches!(e, Event::Fetch(k) if *k == kind).then_some(i))
            .collect()
    }

    fn write_positions(events: &[Event], kind: EntityKind) -> Vec<usize> {
        events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| matches!(e, Event::Write(k, _, _) if *k == kind).then_some(i))
            .collect()
    }

    // =========================================================================
    // Fakes
    // =========================================================================

    struct FakeCredentials {
        known: Vec<TenantId>,
    }

    impl CredentialStore for FakeCredentials {
        async fn lookup(
            &self,
            tenant_id: TenantId,
        ) -> Result<Option<TenantCredentials>, RepositoryError> {
            Ok(self.known.contains(&tenant_id).then(|| TenantCredentials {
                name: "Fake Shop".to_string(),
                shop_domain: "fake.myshopify.com".to_string(),
                access_token: SecretString::from("shpat_fake"),
            }))
        }
    }

    /// Scripted remote data. Cursors are page indexes rendered as strings;
    /// the orchestrator must treat them as opaque either way.
    #[derive(Clone, Default)]
    struct Script {
        customer_pages: Vec<Vec<RemoteCustomer>>,
        product_pages: Vec<Vec<RemoteProduct>>,
        order_pages: Vec<Vec<RemoteOrder>>,
        fail_orders: bool,
        fetch_delay: Duration,
    }

    struct FakeFeed {
        script: Script,
        events: EventLog,
    }

    impl FakeFeed {
        fn page_at<T: Clone>(pages: &[Vec<T>], cursor: Option<&str>) -> Page<T> {
            let index = cursor.map_or(0, |c| c.parse::<usize>().unwrap_or(0));
            let items = pages.get(index).cloned().unwrap_or_default();
            let next_cursor = (index + 1 < pages.len()).then(|| (index + 1).to_string());
            Page { items, next_cursor }
        }

        async fn delay(&self) {
            if self.script.fetch_delay > Duration::ZERO {
                tokio::time::sleep(self.script.fetch_delay).await;
            }
        }
    }

    impl RemoteFeed for FakeFeed {
        async fn customers_page(
            &self,
            cursor: Option<&str>,
        ) -> Result<Page<RemoteCustomer>, ShopifyError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Fetch(EntityKind::Customer));
            self.delay().await;
            Ok(Self::page_at(&self.script.customer_pages, cursor))
        }

        async fn products_page(
            &self,
            cursor: Option<&str>,
        ) -> Result<Page<RemoteProduct>, ShopifyError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Fetch(EntityKind::Product));
            self.delay().await;
            Ok(Self::page_at(&self.script.product_pages, cursor))
        }

        async fn orders_page(
            &self,
            cursor: Option<&str>,
        ) -> Result<Page<RemoteOrder>, ShopifyError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Fetch(EntityKind::Order));
            self.delay().await;
            if self.script.fail_orders {
                return Err(ShopifyError::RetriesExhausted {
                    attempts: 4,
                    last: Box::new(ShopifyError::Api {
                        status: 503,
                        body: "service unavailable".to_string(),
                    }),
                });
            }
            Ok(Self::page_at(&self.script.order_pages, cursor))
        }
    }

    struct FakeFeedFactory {
        script: Arc<Mutex<Script>>,
        events: EventLog,
    }

    impl FeedFactory for FakeFeedFactory {
        type Feed = FakeFeed;

        fn feed(&self, _credentials: &TenantCredentials) -> FakeFeed {
            FakeFeed {
                script: self.script.lock().unwrap().clone(),
                events: Arc::clone(&self.events),
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        customers: Mutex<BTreeMap<(TenantId, String), CustomerRecord>>,
        products: Mutex<BTreeMap<(TenantId, String), ProductRecord>>,
        orders: Mutex<BTreeMap<(TenantId, String), OrderRecord>>,
        fail_customer_ids: HashSet<String>,
        events: EventLog,
    }

    impl MemoryStore {
        fn new(events: EventLog) -> Self {
            Self {
                events,
                ..Self::default()
            }
        }

        fn customer(&self, tenant_id: TenantId, external_id: &str) -> Option<CustomerRecord> {
            self.customers
                .lock()
                .unwrap()
                .get(&(tenant_id, external_id.to_string()))
                .cloned()
        }

        fn order(&self, tenant_id: TenantId, external_id: &str) -> Option<OrderRecord> {
            self.orders
                .lock()
                .unwrap()
                .get(&(tenant_id, external_id.to_string()))
                .cloned()
        }

        fn counts_for(&self, tenant_id: TenantId) -> (usize, usize, usize) {
            fn count<V>(map: &Mutex<BTreeMap<(TenantId, String), V>>, tenant_id: TenantId) -> usize {
                map.lock()
                    .unwrap()
                    .keys()
                    .filter(|(t, _)| *t == tenant_id)
                    .count()
            }
            (
                count(&self.customers, tenant_id),
                count(&self.products, tenant_id),
                count(&self.orders, tenant_id),
            )
        }
    }

    impl SyncStore for Arc<MemoryStore> {
        async fn upsert_customer(
            &self,
            tenant_id: TenantId,
            record: &CustomerRecord,
        ) -> Result<(), RepositoryError> {
            if self.fail_customer_ids.contains(record.external_id.as_str()) {
                return Err(RepositoryError::Conflict("injected failure".to_string()));
            }
            self.customers.lock().unwrap().insert(
                (tenant_id, record.external_id.as_str().to_string()),
                record.clone(),
            );
            self.events.lock().unwrap().push(Event::Write(
                EntityKind::Customer,
                tenant_id,
                record.external_id.as_str().to_string(),
            ));
            Ok(())
        }

        async fn upsert_product(
            &self,
            tenant_id: TenantId,
            record: &ProductRecord,
        ) -> Result<(), RepositoryError> {
            self.products.lock().unwrap().insert(
                (tenant_id, record.external_id.as_str().to_string()),
                record.clone(),
            );
            self.events.lock().unwrap().push(Event::Write(
                EntityKind::Product,
                tenant_id,
                record.external_id.as_str().to_string(),
            ));
            Ok(())
        }

        async fn upsert_order(
            &self,
            tenant_id: TenantId,
            record: &OrderRecord,
        ) -> Result<(), RepositoryError> {
            self.orders.lock().unwrap().insert(
                (tenant_id, record.external_id.as_str().to_string()),
                record.clone(),
            );
            self.events.lock().unwrap().push(Event::Write(
                EntityKind::Order,
                tenant_id,
                record.external_id.as_str().to_string(),
            ));
            Ok(())
        }
    }

    // =========================================================================
    // Harness
    // =========================================================================

    struct Harness {
        orchestrator:
            SyncOrchestrator<FakeCredentials, Arc<MemoryStore>, FakeFeedFactory>,
        store: Arc<MemoryStore>,
        script: Arc<Mutex<Script>>,
        events: EventLog,
        guard: Arc<SyncGuard>,
    }

    fn harness(script: Script, known_tenants: Vec<TenantId>) -> Harness {
        harness_with_store_failures(script, known_tenants, HashSet::new())
    }

    fn harness_with_store_failures(
        script: Script,
        known_tenants: Vec<TenantId>,
        fail_customer_ids: HashSet<String>,
    ) -> Harness {
        let events: EventLog = Arc::default();
        let script = Arc::new(Mutex::new(script));
        let store = Arc::new(MemoryStore {
            fail_customer_ids,
            ..MemoryStore::new(Arc::clone(&events))
        });
        let guard = Arc::new(SyncGuard::new());

        let orchestrator = SyncOrchestrator::new(
            FakeCredentials {
                known: known_tenants,
            },
            Arc::clone(&store),
            FakeFeedFactory {
                script: Arc::clone(&script),
                events: Arc::clone(&events),
            },
            Arc::clone(&guard),
        );

        Harness {
            orchestrator,
            store,
            script,
            events,
            guard,
        }
    }

    fn remote_customers(ids: std::ops::RangeInclusive<i64>) -> Vec<RemoteCustomer> {
        ids.map(|i| {
            serde_json::from_value(json!({
                "id": i,
                "first_name": format!("Customer{i}"),
                "email": format!("c{i}@example.test"),
                "total_spent": format!("{i}.00"),
            }))
            .unwrap()
        })
        .collect()
    }

    fn remote_products(ids: std::ops::RangeInclusive<i64>) -> Vec<RemoteProduct> {
        ids.map(|i| {
            serde_json::from_value(json!({
                "id": i,
                "title": format!("Product {i}"),
                "variants": [{"price": format!("{i}.50")}],
            }))
            .unwrap()
        })
        .collect()
    }

    fn remote_orders(ids: std::ops::RangeInclusive<i64>) -> Vec<RemoteOrder> {
        ids.map(|i| {
            serde_json::from_value(json!({
                "id": i,
                "total_price": format!("{i}.25"),
                "currency": "USD",
                "customer": {"id": i},
                "created_at": "2024-03-01T12:00:00Z",
            }))
            .unwrap()
        })
        .collect()
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_full_sync_reports_per_entity_counts() {
        let tenant = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=3), remote_customers(4..=5)],
                product_pages: vec![remote_products(1..=2)],
                order_pages: vec![remote_orders(1..=2)],
                ..Script::default()
            },
            vec![tenant],
        );

        let report = h.orchestrator.start_sync(tenant).await.expect("sync");

        assert_eq!(
            report,
            SyncReport {
                customers: 5,
                products: 2,
                orders: 2
            }
        );
        assert_eq!(h.store.counts_for(tenant), (5, 2, 2));
        assert!(!h.guard.is_active(tenant));
    }

    #[tokio::test]
    async fn test_sync_twice_is_idempotent() {
        let tenant = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=4)],
                product_pages: vec![remote_products(1..=3)],
                order_pages: vec![remote_orders(1..=2)],
                ..Script::default()
            },
            vec![tenant],
        );

        let first = h.orchestrator.start_sync(tenant).await.expect("first sync");
        let customers_after_first = h.store.customers.lock().unwrap().clone();

        let second = h
            .orchestrator
            .start_sync(tenant)
            .await
            .expect("second sync");

        assert_eq!(first, second);
        assert_eq!(h.store.counts_for(tenant), (4, 3, 2));
        // Same remote data: stored field values are bit-identical.
        assert_eq!(*h.store.customers.lock().unwrap(), customers_after_first);
    }

    #[tokio::test]
    async fn test_customers_and_products_complete_before_first_order_fetch() {
        let tenant = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=3), remote_customers(4..=6)],
                product_pages: vec![remote_products(1..=2)],
                order_pages: vec![remote_orders(1..=2)],
                ..Script::default()
            },
            vec![tenant],
        );

        h.orchestrator.start_sync(tenant).await.expect("sync");

        let events = h.events.lock().unwrap().clone();
        let last_customer_write = *write_positions(&events, EntityKind::Customer)
            .last()
            .expect("customer writes");
        let last_product_write = *write_positions(&events, EntityKind::Product)
            .last()
            .expect("product writes");
        let first_product_fetch = *fetch_positions(&events, EntityKind::Product)
            .first()
            .expect("product fetches");
        let first_order_fetch = *fetch_positions(&events, EntityKind::Order)
            .first()
            .expect("order fetches");

        assert!(
            last_customer_write < first_product_fetch,
            "customer upserts must finish before products begin"
        );
        assert!(
            last_product_write < first_order_fetch,
            "product upserts must finish before any order fetch"
        );
    }

    #[tokio::test]
    async fn test_concurrent_same_tenant_syncs_run_exactly_once() {
        let tenant = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=2)],
                product_pages: vec![remote_products(1..=1)],
                order_pages: vec![remote_orders(1..=1)],
                fetch_delay: Duration::from_millis(25),
                ..Script::default()
            },
            vec![tenant],
        );

        let (left, right) = tokio::join!(
            h.orchestrator.start_sync(tenant),
            h.orchestrator.start_sync(tenant)
        );

        let (done, refused) = match (left, right) {
            (Ok(report), Err(failure)) | (Err(failure), Ok(report)) => (report, failure),
            other => panic!("expected exactly one success and one refusal, got {other:?}"),
        };

        assert_eq!(
            done,
            SyncReport {
                customers: 2,
                products: 1,
                orders: 1
            }
        );
        assert!(matches!(refused.error, SyncError::SyncInProgress(t) if t == tenant));
        assert_eq!(refused.partial, SyncReport::default());

        // The refused run performed no work: the write log holds exactly the
        // one completed run's writes, with no interleaving from a second.
        let events = h.events.lock().unwrap();
        let writes = events
            .iter()
            .filter(|e| matches!(e, Event::Write(_, _, _)))
            .count();
        assert_eq!(writes, 4);
        drop(events);

        assert_eq!(h.store.counts_for(tenant), (2, 1, 1));
        assert!(!h.guard.is_active(tenant));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_committed_counts_then_recovers() {
        let tenant = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=10)],
                product_pages: vec![remote_products(1..=5)],
                fail_orders: true,
                ..Script::default()
            },
            vec![tenant],
        );

        let failure = h
            .orchestrator
            .start_sync(tenant)
            .await
            .expect_err("order fetch fails");

        assert_eq!(failure.stage(), Some(EntityKind::Order));
        assert_eq!(
            failure.partial,
            SyncReport {
                customers: 10,
                products: 5,
                orders: 0
            }
        );
        assert_eq!(h.store.counts_for(tenant), (10, 5, 0));
        assert!(!h.guard.is_active(tenant));

        // Remote recovers; the idempotent re-run completes with full counts
        // and no duplicate customer or product rows.
        {
            let mut script = h.script.lock().unwrap();
            script.fail_orders = false;
            script.order_pages = vec![remote_orders(1..=3)];
        }

        let report = h.orchestrator.start_sync(tenant).await.expect("re-run");
        assert_eq!(
            report,
            SyncReport {
                customers: 10,
                products: 5,
                orders: 3
            }
        );
        assert_eq!(h.store.counts_for(tenant), (10, 5, 3));
    }

    #[tokio::test]
    async fn test_tenant_isolation_same_external_ids() {
        let tenant_a = TenantId::generate();
        let tenant_b = TenantId::generate();
        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=3)],
                product_pages: vec![remote_products(1..=2)],
                order_pages: vec![remote_orders(1..=1)],
                ..Script::default()
            },
            vec![tenant_a, tenant_b],
        );

        h.orchestrator.start_sync(tenant_a).await.expect("sync A");
        assert_eq!(h.store.counts_for(tenant_a), (3, 2, 1));
        assert_eq!(h.store.counts_for(tenant_b), (0, 0, 0));

        let a_customers_before = h
            .store
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, _), _)| *t == tenant_a)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>();

        h.orchestrator.start_sync(tenant_b).await.expect("sync B");

        // Same external ids, distinct rows; A's records untouched by B's run.
        assert_eq!(h.store.counts_for(tenant_b), (3, 2, 1));
        let a_customers_after = h
            .store
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, _), _)| *t == tenant_a)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>();
        assert_eq!(a_customers_before, a_customers_after);
    }

    #[tokio::test]
    async fn test_malformed_total_spent_stores_zero() {
        let tenant = TenantId::generate();
        let omitted: RemoteCustomer = serde_json::from_value(json!({"id": 1})).unwrap();
        let garbage: RemoteCustomer =
            serde_json::from_value(json!({"id": 2, "total_spent": "not-a-number"})).unwrap();

        let h = harness(
            Script {
                customer_pages: vec![vec![omitted, garbage]],
                ..Script::default()
            },
            vec![tenant],
        );

        let report = h.orchestrator.start_sync(tenant).await.expect("sync");
        assert_eq!(report.customers, 2);

        for external_id in ["1", "2"] {
            let stored = h.store.customer(tenant, external_id).expect("stored");
            assert_eq!(stored.total_spent, Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_order_referencing_unsynced_customer_is_stored() {
        let tenant = TenantId::generate();
        let stray_order: RemoteOrder = serde_json::from_value(json!({
            "id": 500,
            "total_price": "49.99",
            "currency": "USD",
            "customer": {"id": 99},
            "created_at": "2024-04-02T09:00:00Z",
        }))
        .unwrap();

        let h = harness(
            Script {
                customer_pages: vec![remote_customers(1..=3)],
                order_pages: vec![vec![stray_order]],
                ..Script::default()
            },
            vec![tenant],
        );

        let report = h.orchestrator.start_sync(tenant).await.expect("sync");
        assert_eq!(report.orders, 1);

        let stored = h.store.order(tenant, "500").expect("order stored");
        assert_eq!(stored.customer_external_id, Some(ExternalId::from("99")));
    }

    #[tokio::test]
    async fn test_unknown_tenant_fails_and_releases_guard() {
        let tenant = TenantId::generate();
        let h = harness(Script::default(), vec![]);

        let failure = h
            .orchestrator
            .start_sync(tenant)
            .await
            .expect_err("unknown tenant");
        assert!(matches!(failure.error, SyncError::TenantNotFound(t) if t == tenant));
        assert_eq!(failure.partial, SyncReport::default());
        assert!(!h.guard.is_active(tenant));

        // The guard was released, so the follow-up still reports the real
        // error rather than a phantom in-progress sync.
        let failure = h
            .orchestrator
            .start_sync(tenant)
            .await
            .expect_err("still unknown");
        assert!(matches!(failure.error, SyncError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn test_per_record_storage_failure_skips_and_continues() {
        let tenant = TenantId::generate();
        let h = harness_with_store_failures(
            Script {
                customer_pages: vec![remote_customers(1..=3)],
                product_pages: vec![remote_products(1..=2)],
                order_pages: vec![remote_orders(1..=1)],
                ..Script::default()
            },
            vec![tenant],
            HashSet::from(["2".to_string()]),
        );

        let report = h.orchestrator.start_sync(tenant).await.expect("sync");

        // The poisoned record is skipped; the batch and the later stages
        // still complete.
        assert_eq!(
            report,
            SyncReport {
                customers: 2,
                products: 2,
                orders: 1
            }
        );
        assert!(h.store.customer(tenant, "1").is_some());
        assert!(h.store.customer(tenant, "2").is_none());
        assert!(h.store.customer(tenant, "3").is_some());
    }
}
