//! # asyncapi2components
//!
//! Normalize a bundled [AsyncAPI](https://www.asyncapi.com/) document after
//! its external references have been resolved and inlined.
//!
//! ## Features
//!
//! - Hoists every inlined schema under `#/components/schemas/<Name>`
//! - Replaces non-root schema occurrences with local references
//! - Deduplicates equivalent schemas under one canonical name
//! - Rewrites `discriminator.mapping` file values to local refs, loading
//!   schema files on demand
//! - Collapses object-form discriminators to their `propertyName` string
//! - Rewrites operation `channel.$ref` values to local channel pointers
//! - Strips the `x-origin` bookkeeping from the emitted document
//!
//! ## Example (Programmatic Usage)
//!
//! ```no_run
//! use serde_json::json;
//! use asyncapi2components::document::Document;
//! use asyncapi2components::normalizer::normalize_document;
//!
//! let bundled = json!({
//!     "asyncapi": "3.0.0",
//!     "channels": {
//!         "pets": {
//!             "messages": {
//!                 "petCreated": {
//!                     "payload": {
//!                         "type": "object",
//!                         "x-origin": "./schemas/Pet.yaml"
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let mut doc = Document::from_json(&bundled);
//! normalize_document(&mut doc).unwrap();
//!
//! let normalized = doc.to_json(doc.root()).unwrap();
//! println!("{}", serde_json::to_string_pretty(&normalized).unwrap());
//! ```
//!
//! ## Example (CLI)
//!
//! ```bash
//! asyncapi2components bundled.yaml normalized.yaml
//! ```
//!
//! ## Crate Layout
//!
//! - [`document`] — Arena document model with stable node identity
//! - [`common`] — Helpers for names, fingerprints, traversal
//! - [`normalizer`] — The seven-pass normalization pipeline
//! - [`loader`] — On-demand schema file loading for discriminator mappings
//!
//! The CLI binary is enabled with the `cli` feature.
pub mod common;
pub mod document;
pub mod error;
pub mod loader;
pub mod normalizer;

pub use document::Document;
pub use error::{NormalizeError, Result};
pub use normalizer::{normalize_document, normalize_file, rewrite_channel_refs};
