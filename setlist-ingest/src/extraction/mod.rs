//! Text extraction pipeline
//!
//! Turns untrusted freeform text (descriptions, comments, page text) into
//! timestamped track candidates:
//!
//! ```text
//! SourceBlob ─► TimestampScanner ─► NoiseFilter ─► MentionParser
//!                         └──────── CandidateAssembler ─► CrossSourceMerger
//! ```
//!
//! Everything here is pure and synchronous; storage is never touched.

pub mod candidate_assembler;
pub mod mention_parser;
pub mod noise_filter;
pub mod source_merger;
pub mod timestamp_scanner;
pub mod types;

pub use candidate_assembler::CandidateAssembler;
pub use mention_parser::{parse_mention, ParsedMention};
pub use noise_filter::{check_fragment, NoiseReason};
pub use source_merger::CrossSourceMerger;
pub use timestamp_scanner::{scan_timestamps, TimestampMatch};
pub use types::{SourceBlob, SourceKind, TrackCandidate};
