//! Query algebra of a corpus search engine.
//!
//! Queries are represented as [`TextPattern`](textpattern::TextPattern) trees,
//! optionally constrained by [`MatchFilter`](matchfilter::MatchFilter)
//! expressions over captured tokens. The [`translate`](translate) module
//! compiles such a tree into a [`SpanQuery`](plan::SpanQuery) plan for a
//! positional index engine, and the [`serializer`] module writes trees as
//! corpus query language text or as JSON (and reads them back from JSON).

#![warn(clippy::panic)]
#![warn(clippy::expect_used)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod extensions;
pub mod matchfilter;
pub mod metadata;
pub mod plan;
pub mod serializer;
pub mod textpattern;
pub mod translate;

pub use corpusql_core::types::{
    ExpansionDirection, MatchSensitivity, PositionOperation, RelationDirection, SpanMode,
    TagAdjust, UNLIMITED,
};
