//! Integration tests for Tidepool.
//!
//! # Running Tests
//!
//! ```bash
//! # Start PostgreSQL and the server
//! cargo run -p tidepool-server
//!
//! # Run integration tests
//! cargo test -p tidepool-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `tenant_onboarding` - Onboarding and listing tenants
//! - `sync_flow` - Triggering syncs and reading dashboard aggregates
//!
//! Tests are `#[ignore]`d by default: they need a running server, a
//! reachable database, and (for a real end-to-end sync) valid remote
//! credentials. `TIDEPOOL_BASE_URL` overrides the default server address.
