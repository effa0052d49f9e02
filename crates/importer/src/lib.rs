// ABOUTME: Library entry point for importing WordPress posts into Payload CMS.
// ABOUTME: Re-exports the Importer, its options and builder, content stores, and the error taxonomy.

//! wp2payload-importer - pulls posts, authors, categories and images from the
//! WordPress REST API and upserts them into a Payload CMS instance.
//!
//! Runs are resumable: WordPress post ids and image URLs are mapped to the
//! local ids they produced in JSON side files under the work directory, and
//! every recoverable failure is appended to a log instead of stopping the run.
//!
//! # Example
//!
//! ```no_run
//! use wp2payload_importer::{ImportError, ImporterBuilder, PayloadStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ImportError> {
//!     let store = PayloadStore::new(reqwest::Client::new(), "http://localhost:3000", None)?;
//!     let importer = ImporterBuilder::new()
//!         .wp_base("https://blog.example.com")
//!         .limit(Some(10))
//!         .build(store)?;
//!     let summary = importer.run().await?;
//!     println!("{} of {} posts imported", summary.succeeded, summary.total);
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod failure_log;
pub mod id_map;
pub mod importer;
pub mod media;
pub mod options;
pub mod policy;
pub mod record;
pub mod resource;
pub mod store;
pub mod upsert;
pub mod wordpress;

pub use crate::error::{ErrorCode, ImportError};
pub use crate::failure_log::{FailureEntry, FailureKind, FailureLog};
pub use crate::id_map::IdMap;
pub use crate::importer::{Importer, RunSummary};
pub use crate::options::{Auth, ImportOptions, ImporterBuilder};
pub use crate::policy::{policy_for, Policy, Stage};
pub use crate::record::PostRecord;
pub use crate::store::{Collection, ContentStore, DocId, MediaUpload, MemoryStore, PayloadStore};
pub use crate::upsert::UpsertOutcome;
