//! # config-sdk
//!
//! Client SDK for a remote HTTP configuration service, in two variants with
//! an identical contract: [`client::AsyncConfigClient`] (tokio tasks) and
//! [`blocking::ConfigClient`] (background threads). Both offer CRUD
//! operations on named configuration documents, optional validation against
//! JSON-schema documents loaded from the service, an in-memory response
//! cache, and a polling watch that reports changes through a callback.
//!
//! The crate also ships the `analyze-modules` binary, a static scanner for
//! front-end module trees built on [`analyzer`] and [`report`].

pub mod analyzer;
pub mod blocking;
pub mod cache;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod report;
pub mod schema;
pub mod watch;

pub use analyzer::ModuleAnalyzer;
pub use blocking::ConfigClient;
pub use cache::{CacheStats, ConfigCache};
pub use client::AsyncConfigClient;
pub use config::ClientConfig;
pub use document::{canonical_form, merge_documents};
pub use error::{Result, SdkError};
pub use report::{AnalysisReport, FilePresence, ModuleReport, ReportPrinter, Summary};
pub use schema::{SchemaRegistry, ValidationOutcome};
pub use watch::{DEFAULT_WATCH_INTERVAL, WatchHandle};
