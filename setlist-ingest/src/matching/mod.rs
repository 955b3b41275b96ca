//! Fuzzy matching
//!
//! - [`similarity`]: string likeness in [0, 1]
//! - [`identity_matcher`]: candidate ↔ canonical entry matching across
//!   field-ordering strategies

pub mod identity_matcher;
pub mod similarity;

pub use identity_matcher::{
    IdentityMatcher, MatchStrategy, MatchVerdict, MatchWeights, ScoredMatch, TrackIdentity,
};
pub use similarity::similarity;
