//! Contract towards the positional index engine that executes plans.

use crate::errors::Result;
use crate::plan::SpanQuery;
use std::collections::BTreeMap;

pub mod memory;

pub type DocId = u32;

/// A relation between a source and a target span, as stored in the index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationInfo {
    /// Relation class and type, e.g. `dep::nsubj` or `__tag::s`
    pub full_type: String,
    pub source_start: u32,
    pub source_end: u32,
    pub target_start: u32,
    pub target_end: u32,
}

impl RelationInfo {
    /// Span covering both source and target.
    pub fn full_span(&self) -> (u32, u32) {
        (
            self.source_start.min(self.target_start),
            self.source_end.max(self.target_end),
        )
    }

    /// Root relations have no source, which is stored as an empty source at
    /// the target start.
    pub fn is_root(&self) -> bool {
        self.source_start == self.source_end && self.source_start == self.target_start
    }
}

/// Information captured for a name in a match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchInfo {
    Span { start: u32, end: u32 },
    Relation(RelationInfo),
    RelationList(Vec<RelationInfo>),
}

impl MatchInfo {
    /// The token range this capture covers.
    pub fn span(&self) -> (u32, u32) {
        match self {
            MatchInfo::Span { start, end } => (*start, *end),
            MatchInfo::Relation(r) => r.full_span(),
            MatchInfo::RelationList(relations) => {
                let mut iter = relations.iter().map(|r| r.full_span());
                match iter.next() {
                    Some(first) => iter.fold(first, |(s, e), (rs, re)| (s.min(rs), e.max(re))),
                    None => (0, 0),
                }
            }
        }
    }
}

/// A match of a plan in a document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanMatch {
    pub doc: DocId,
    pub start: u32,
    pub end: u32,
    pub captures: BTreeMap<String, MatchInfo>,
}

/// An engine that finds the matches of a plan.
pub trait SpanIndex {
    /// Find all matches of `plan` in the annotated field `field`, ordered by
    /// document and start position.
    fn find_spans<'a>(
        &'a self,
        plan: &'a SpanQuery,
        field: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<SpanMatch>> + 'a>>;
}

/// Lookup of token annotation values by position, used to evaluate
/// constraints on captured tokens.
pub trait ForwardIndexAccessor {
    fn token_value(&self, doc: DocId, field: &str, annotation: &str, position: u32)
        -> Option<String>;
}
