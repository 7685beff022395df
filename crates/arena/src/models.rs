//! These models represent the objects passed between the browser, the dispatcher and the
//! provider adapters.
//!
//! The browser speaks a camelCase JSON shape (`apiKey`, `modelId`, `enableWebSearch`), while
//! each provider speaks its own request format. The structs here are the canonical form in
//! between: requests are deserialized straight into them, and the adapters in `providers`
//! turn them into provider payloads.
pub mod config;
pub mod message;
pub mod request;
