//! Multi-source job-listing aggregation pipeline.
//!
//! Collectors pull listings from independent upstreams (syndication feed,
//! aggregator API, social listing index, direct crawl), each isolated behind
//! its own circuit breaker. The orchestrator fans out to all of them
//! concurrently, settles every outcome, deduplicates by content fingerprint
//! and writes the survivors through an idempotent batched upsert. A
//! standalone extraction engine recovers structured fields from arbitrary
//! posting URLs via a four-strategy fallback chain.

pub mod breaker;
pub mod collectors;
pub mod config;
pub mod db;
pub mod dedupe;
pub mod error;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod store;
