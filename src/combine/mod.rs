//! Combining information from several matrices.

pub mod matching;

pub use matching::MatchRowsByName;
