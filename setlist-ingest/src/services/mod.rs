//! Ingest services
//!
//! - [`reconciler`]: additive-only batch import into a performance
//! - [`catalog`]: artist/track linking for new entries
//! - [`deduplicator`]: offline catalog merge job
//! - [`oracle`]: release-status lookup seam

pub mod catalog;
pub mod deduplicator;
pub mod oracle;
pub mod reconciler;

pub use catalog::{Catalog, CatalogLink};
pub use deduplicator::{DedupReport, OfflineDeduplicator};
pub use oracle::{HttpOracle, IdentificationOracle, OracleError, OracleVerdict};
pub use reconciler::{CandidateTimestamp, ImportCandidate, ImportRequest, ImportSummary, Reconciler};
