//! Tidepool server library.
//!
//! This crate provides the ingestion service as a library, allowing it to be
//! tested and reused.
//!
//! # Architecture
//!
//! - [`sync`] - the multi-tenant ingestion core: per-tenant guard,
//!   idempotent upserter, and the orchestrator driving customers, then
//!   products, then orders
//! - [`shopify`] - REST client for the remote platform (pagination,
//!   rate-limit backoff, credential failures)
//! - [`db`] - `PostgreSQL` repositories for tenants, synced records, and
//!   dashboard aggregates
//! - [`routes`] / [`middleware`] - thin JSON plumbing over the above

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;
