//! Per-tenant mutual exclusion for sync runs.
//!
//! At most one sync may run per tenant at a time; distinct tenants proceed
//! independently. The guard is process-wide and in-memory only - a restart
//! clears every lock, which is acceptable because sync jobs never fan out
//! across processes.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tidepool_core::TenantId;

/// Process-wide map of tenants with a sync in flight.
///
/// `try_acquire` never blocks and never queues: it either hands back a
/// permit or refuses immediately. The permit releases on drop, so every
/// terminal path - success, failure, panic - releases the guard.
#[derive(Debug, Default)]
pub struct SyncGuard {
    active: Mutex<HashSet<TenantId>>,
}

impl SyncGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the tenant's slot. Returns `None` if a sync is already
    /// in progress for this tenant.
    #[must_use]
    pub fn try_acquire(&self, tenant_id: TenantId) -> Option<SyncPermit<'_>> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Lazy construction matters: an eagerly built permit would drop on
        // refusal and release the slot out from under the running sync.
        active
            .insert(tenant_id)
            .then(|| SyncPermit { guard: self, tenant_id })
    }

    /// Whether a sync currently holds this tenant's slot.
    #[must_use]
    pub fn is_active(&self, tenant_id: TenantId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&tenant_id)
    }

    /// Idempotent: releasing an already-released tenant is a no-op.
    fn release(&self, tenant_id: TenantId) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tenant_id);
    }
}

/// Exclusive right to sync one tenant. Releases the slot on drop.
#[derive(Debug)]
pub struct SyncPermit<'a> {
    guard: &'a SyncGuard,
    tenant_id: TenantId,
}

impl SyncPermit<'_> {
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(self.tenant_id);
    }
}
