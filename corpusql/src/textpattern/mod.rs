//! The text pattern algebra: an immutable tree describing a corpus query.
//!
//! Nodes are only created through the constructor functions of [`TextPattern`],
//! which reject invalid parameter combinations. Nested `And`, `Or` and
//! `Sequence` nodes are flattened when they are constructed.

use crate::errors::{QueryError, Result};
use crate::matchfilter::MatchFilter;
use corpusql_core::types::{
    add_max, mul_max, ExpansionDirection, MatchSensitivity, PositionOperation, SpanMode,
    TagAdjust, UNLIMITED,
};
use std::collections::BTreeMap;

mod relation;
pub mod rewrite;

pub use relation::{RelationOperatorInfo, RelationTarget};


#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextPattern {
    /// Literal match of a single token annotation value
    Term(TermPattern),
    /// Regular expression match of a single token annotation value
    Regex(TermPattern),
    /// A gap of unconstrained tokens
    AnyToken(AnyToken),
    And(Clauses),
    Or(Clauses),
    Not(Negation),
    Sequence(Clauses),
    Repetition(Repetition),
    Expansion(Expansion),
    PositionFilter(PositionFilter),
    FilterNGrams(FilterNGrams),
    CaptureGroup(CaptureGroup),
    Constrained(Constrained),
    Edge(Edge),
    FixedSpan(FixedSpan),
    Tags(Tags),
    RelationTarget(RelationTarget),
    RelationMatch(RelationMatch),
    RootRelationMatch(RootRelationMatch),
    /// Placeholder that is filled in depending on where it occurs
    DefaultValue,
    DocVersion(DocVersion),
    QueryFunctionCall(QueryFunctionCall),
    Settings(Settings),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TermPattern {
    value: String,
    annotation: Option<String>,
    sensitivity: Option<MatchSensitivity>,
}

impl TermPattern {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn sensitivity(&self) -> Option<MatchSensitivity> {
        self.sensitivity
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnyToken {
    min: u32,
    max: u32,
}

impl AnyToken {
    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// True if this matches any sequence of tokens, including the empty one.
    pub fn is_any_ngram(&self) -> bool {
        self.min == 0 && self.max == UNLIMITED
    }
}

/// The (flattened) clauses of an `And`, `Or` or `Sequence` node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Clauses(Vec<TextPattern>);

impl Clauses {
    pub fn as_slice(&self) -> &[TextPattern] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<TextPattern> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Negation {
    clause: Box<TextPattern>,
}

impl Negation {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Repetition {
    clause: Box<TextPattern>,
    min: u32,
    max: u32,
}

impl Repetition {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expansion {
    clause: Box<TextPattern>,
    direction: ExpansionDirection,
    min: u32,
    max: u32,
}

impl Expansion {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn direction(&self) -> ExpansionDirection {
        self.direction
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PositionFilter {
    producer: Box<TextPattern>,
    filter: Box<TextPattern>,
    operation: PositionOperation,
    invert: bool,
    adjust_leading: i32,
    adjust_trailing: i32,
}

impl PositionFilter {
    pub fn producer(&self) -> &TextPattern {
        &self.producer
    }

    pub fn filter(&self) -> &TextPattern {
        &self.filter
    }

    pub fn operation(&self) -> PositionOperation {
        self.operation
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn adjust_leading(&self) -> i32 {
        self.adjust_leading
    }

    pub fn adjust_trailing(&self) -> i32 {
        self.adjust_trailing
    }

    /// Adjust the start and end of the producer spans before comparing them
    /// to the filter spans.
    pub fn adjusted(mut self, leading: i32, trailing: i32) -> PositionFilter {
        self.adjust_leading = leading;
        self.adjust_trailing = trailing;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilterNGrams {
    clause: Box<TextPattern>,
    operation: PositionOperation,
    min: u32,
    max: u32,
}

impl FilterNGrams {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn operation(&self) -> PositionOperation {
        self.operation
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaptureGroup {
    clause: Box<TextPattern>,
    capture_as: String,
}

impl CaptureGroup {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn capture_as(&self) -> &str {
        &self.capture_as
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constrained {
    clause: Box<TextPattern>,
    constraint: MatchFilter,
}

impl Constrained {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn constraint(&self) -> &MatchFilter {
        &self.constraint
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    clause: Box<TextPattern>,
    trailing_edge: bool,
}

impl Edge {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn trailing_edge(&self) -> bool {
        self.trailing_edge
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixedSpan {
    start: u32,
    end: u32,
}

impl FixedSpan {
    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }
}

/// Value an attribute of a markup span must have.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchValue {
    Regex(String),
    /// Integer value in the inclusive range `min..=max`
    IntRange { min: i64, max: i64 },
}

impl MatchValue {
    pub fn int_range(min: i64, max: i64) -> Result<MatchValue> {
        if min > max {
            return Err(QueryError::construction(
                "attribute range",
                format!("minimum {} is larger than maximum {}", min, max),
            ));
        }
        Ok(MatchValue::IntRange { min, max })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tags {
    element_name: String,
    attributes: BTreeMap<String, MatchValue>,
    adjust: TagAdjust,
    capture_as: Option<String>,
}

impl Tags {
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn attributes(&self) -> &BTreeMap<String, MatchValue> {
        &self.attributes
    }

    pub fn adjust(&self) -> TagAdjust {
        self.adjust
    }

    pub fn capture_as(&self) -> Option<&str> {
        self.capture_as.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationMatch {
    parent: Box<TextPattern>,
    children: Vec<RelationTarget>,
}

impl RelationMatch {
    pub fn parent(&self) -> &TextPattern {
        &self.parent
    }

    pub fn children(&self) -> &[RelationTarget] {
        &self.children
    }
}

/// Relation match without a parent: all children are root relations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RootRelationMatch {
    children: Vec<RelationTarget>,
}

impl RootRelationMatch {
    pub fn children(&self) -> &[RelationTarget] {
        &self.children
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocVersion {
    clause: Box<TextPattern>,
    version: String,
}

impl DocVersion {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionArg {
    Pattern(TextPattern),
    Str(String),
    Int(i64),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryFunctionCall {
    name: String,
    args: Vec<FunctionArg>,
}

impl QueryFunctionCall {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[FunctionArg] {
        &self.args
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Settings {
    clause: Box<TextPattern>,
    settings: BTreeMap<String, String>,
}

impl Settings {
    pub fn clause(&self) -> &TextPattern {
        &self.clause
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }
}

fn check_bounds(node: &'static str, min: u32, max: u32) -> Result<()> {
    if min > max {
        return Err(QueryError::construction(
            node,
            format!("minimum {} is larger than maximum {}", min, max),
        ));
    }
    Ok(())
}

/// Collect clauses, inlining the clauses of children of the same kind.
fn flatten<F>(node: &'static str, clauses: Vec<TextPattern>, same_kind: F) -> Result<Clauses>
where
    F: Fn(TextPattern) -> std::result::Result<Clauses, TextPattern>,
{
    if clauses.is_empty() {
        return Err(QueryError::construction(node, "needs at least one clause"));
    }
    let mut result = Vec::with_capacity(clauses.len());
    for c in clauses {
        match same_kind(c) {
            Ok(nested) => result.extend(nested.0),
            Err(other) => result.push(other),
        }
    }
    Ok(Clauses(result))
}

impl TextPattern {
    pub fn term(value: &str) -> TextPattern {
        TextPattern::term_with(value, None, None)
    }

    pub fn term_with(
        value: &str,
        annotation: Option<&str>,
        sensitivity: Option<MatchSensitivity>,
    ) -> TextPattern {
        TextPattern::Term(TermPattern {
            value: value.to_string(),
            annotation: annotation.map(String::from),
            sensitivity,
        })
    }

    pub fn regex(value: &str) -> TextPattern {
        TextPattern::regex_with(value, None, None)
    }

    pub fn regex_with(
        value: &str,
        annotation: Option<&str>,
        sensitivity: Option<MatchSensitivity>,
    ) -> TextPattern {
        TextPattern::Regex(TermPattern {
            value: value.to_string(),
            annotation: annotation.map(String::from),
            sensitivity,
        })
    }

    pub fn any_token(min: u32, max: u32) -> Result<TextPattern> {
        check_bounds("any token", min, max)?;
        if max == 0 {
            return Err(QueryError::construction(
                "any token",
                "maximum must be at least 1",
            ));
        }
        Ok(TextPattern::AnyToken(AnyToken { min, max }))
    }

    /// Matches any sequence of tokens, including the empty sequence.
    pub fn any_ngram() -> TextPattern {
        TextPattern::AnyToken(AnyToken {
            min: 0,
            max: UNLIMITED,
        })
    }

    pub fn and(clauses: Vec<TextPattern>) -> Result<TextPattern> {
        let clauses = flatten("and", clauses, |c| match c {
            TextPattern::And(nested) => Ok(nested),
            other => Err(other),
        })?;
        Ok(TextPattern::And(clauses))
    }

    pub fn or(clauses: Vec<TextPattern>) -> Result<TextPattern> {
        let clauses = flatten("or", clauses, |c| match c {
            TextPattern::Or(nested) => Ok(nested),
            other => Err(other),
        })?;
        Ok(TextPattern::Or(clauses))
    }

    pub fn sequence(clauses: Vec<TextPattern>) -> Result<TextPattern> {
        let clauses = flatten("sequence", clauses, |c| match c {
            TextPattern::Sequence(nested) => Ok(nested),
            other => Err(other),
        })?;
        Ok(TextPattern::Sequence(clauses))
    }

    /// Token-level negation.
    ///
    /// Fails if the clause is known to match anything but single tokens.
    pub fn not(clause: TextPattern) -> Result<TextPattern> {
        if let Some((min, max)) = clause.length_range() {
            if min != 1 || max != 1 {
                return Err(QueryError::construction(
                    "not",
                    "can only negate patterns that match a single token",
                ));
            }
        }
        Ok(TextPattern::Not(Negation {
            clause: Box::new(clause),
        }))
    }

    /// Repeat a clause between `min` and `max` times.
    ///
    /// Repeating exactly once returns the clause itself.
    pub fn repetition(clause: TextPattern, min: u32, max: u32) -> Result<TextPattern> {
        check_bounds("repetition", min, max)?;
        if max == 0 {
            return Err(QueryError::construction(
                "repetition",
                "maximum must be at least 1",
            ));
        }
        if min == 1 && max == 1 {
            return Ok(clause);
        }
        Ok(TextPattern::Repetition(Repetition {
            clause: Box::new(clause),
            min,
            max,
        }))
    }

    pub fn expansion(
        clause: TextPattern,
        direction: ExpansionDirection,
        min: u32,
        max: u32,
    ) -> Result<TextPattern> {
        check_bounds("expansion", min, max)?;
        Ok(TextPattern::Expansion(Expansion {
            clause: Box::new(clause),
            direction,
            min,
            max,
        }))
    }

    pub fn position_filter(
        producer: TextPattern,
        filter: TextPattern,
        operation: PositionOperation,
        invert: bool,
    ) -> TextPattern {
        TextPattern::PositionFilter(PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            operation,
            invert,
            adjust_leading: 0,
            adjust_trailing: 0,
        })
    }

    pub fn position_filter_adjusted(
        producer: TextPattern,
        filter: TextPattern,
        operation: PositionOperation,
        invert: bool,
        adjust_leading: i32,
        adjust_trailing: i32,
    ) -> TextPattern {
        TextPattern::PositionFilter(PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            operation,
            invert,
            adjust_leading,
            adjust_trailing,
        })
    }

    pub fn filter_ngrams(
        clause: TextPattern,
        operation: PositionOperation,
        min: u32,
        max: u32,
    ) -> Result<TextPattern> {
        check_bounds("n-gram filter", min, max)?;
        Ok(TextPattern::FilterNGrams(FilterNGrams {
            clause: Box::new(clause),
            operation,
            min,
            max,
        }))
    }

    pub fn capture(clause: TextPattern, capture_as: &str) -> Result<TextPattern> {
        if capture_as.is_empty() {
            return Err(QueryError::construction(
                "capture group",
                "capture name must not be empty",
            ));
        }
        Ok(TextPattern::CaptureGroup(CaptureGroup {
            clause: Box::new(clause),
            capture_as: capture_as.to_string(),
        }))
    }

    pub fn constrained(clause: TextPattern, constraint: MatchFilter) -> TextPattern {
        TextPattern::Constrained(Constrained {
            clause: Box::new(clause),
            constraint,
        })
    }

    pub fn edge(clause: TextPattern, trailing_edge: bool) -> TextPattern {
        TextPattern::Edge(Edge {
            clause: Box::new(clause),
            trailing_edge,
        })
    }

    pub fn fixed_span(start: u32, end: u32) -> Result<TextPattern> {
        if start > end {
            return Err(QueryError::construction(
                "fixed span",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(TextPattern::FixedSpan(FixedSpan { start, end }))
    }

    pub fn tags(
        element_name: &str,
        attributes: BTreeMap<String, MatchValue>,
        adjust: TagAdjust,
        capture_as: Option<&str>,
    ) -> Result<TextPattern> {
        if element_name.is_empty() {
            return Err(QueryError::construction(
                "tags",
                "element name must not be empty",
            ));
        }
        Ok(TextPattern::Tags(Tags {
            element_name: element_name.to_string(),
            attributes,
            adjust,
            capture_as: capture_as.filter(|c| !c.is_empty()).map(String::from),
        }))
    }

    pub fn relation_target(target: RelationTarget) -> TextPattern {
        TextPattern::RelationTarget(target)
    }

    /// Match a parent span with one or more relations starting in it.
    pub fn relation_match(parent: TextPattern, children: Vec<RelationTarget>) -> Result<TextPattern> {
        if children.is_empty() {
            return Err(QueryError::construction(
                "relation match",
                "needs at least one relation target",
            ));
        }
        if children.iter().any(|c| c.operator_info().is_root()) {
            return Err(QueryError::construction(
                "relation match",
                "root relations have no source and cannot have a parent",
            ));
        }
        Ok(TextPattern::RelationMatch(RelationMatch {
            parent: Box::new(parent),
            children,
        }))
    }

    /// Match one or more root relations (without a parent).
    pub fn root_relation_match(children: Vec<RelationTarget>) -> Result<TextPattern> {
        if children.is_empty() {
            return Err(QueryError::construction(
                "root relation match",
                "needs at least one relation target",
            ));
        }
        for c in children.iter() {
            if !c.operator_info().is_root() || c.span_mode() != SpanMode::Target {
                return Err(QueryError::construction(
                    "root relation match",
                    "all children must be root relations with span mode target",
                ));
            }
        }
        Ok(TextPattern::RootRelationMatch(RootRelationMatch { children }))
    }

    pub fn default_value() -> TextPattern {
        TextPattern::DefaultValue
    }

    pub fn doc_version(clause: TextPattern, version: &str) -> Result<TextPattern> {
        if version.is_empty() {
            return Err(QueryError::construction(
                "document version",
                "version must not be empty",
            ));
        }
        Ok(TextPattern::DocVersion(DocVersion {
            clause: Box::new(clause),
            version: version.to_string(),
        }))
    }

    pub fn function_call(name: &str, args: Vec<FunctionArg>) -> Result<TextPattern> {
        if name.is_empty() {
            return Err(QueryError::construction(
                "function call",
                "function name must not be empty",
            ));
        }
        Ok(TextPattern::QueryFunctionCall(QueryFunctionCall {
            name: name.to_string(),
            args,
        }))
    }

    pub fn settings(clause: TextPattern, settings: BTreeMap<String, String>) -> TextPattern {
        TextPattern::Settings(Settings {
            clause: Box::new(clause),
            settings,
        })
    }

    /// Short name of the node kind, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TextPattern::Term(_) => "term",
            TextPattern::Regex(_) => "regex",
            TextPattern::AnyToken(_) => "any token",
            TextPattern::And(_) => "and",
            TextPattern::Or(_) => "or",
            TextPattern::Not(_) => "not",
            TextPattern::Sequence(_) => "sequence",
            TextPattern::Repetition(_) => "repetition",
            TextPattern::Expansion(_) => "expansion",
            TextPattern::PositionFilter(_) => "position filter",
            TextPattern::FilterNGrams(_) => "n-gram filter",
            TextPattern::CaptureGroup(_) => "capture group",
            TextPattern::Constrained(_) => "constrained",
            TextPattern::Edge(_) => "edge",
            TextPattern::FixedSpan(_) => "fixed span",
            TextPattern::Tags(_) => "tags",
            TextPattern::RelationTarget(_) => "relation target",
            TextPattern::RelationMatch(_) => "relation match",
            TextPattern::RootRelationMatch(_) => "root relation match",
            TextPattern::DefaultValue => "default value",
            TextPattern::DocVersion(_) => "document version",
            TextPattern::QueryFunctionCall(_) => "function call",
            TextPattern::Settings(_) => "settings",
        }
    }

    /// Check if this pattern can be written inside token brackets (`[...]`)
    /// in the query language.
    pub fn is_bracket_query(&self) -> bool {
        match self {
            TextPattern::Term(t) | TextPattern::Regex(t) => t.annotation.is_some(),
            TextPattern::And(clauses) | TextPattern::Or(clauses) => {
                clauses.iter().all(|c| c.is_bracket_query())
            }
            TextPattern::Not(n) => n.clause.is_bracket_query(),
            _ => false,
        }
    }

    /// True if this is `AnyToken(0, UNLIMITED)`.
    pub fn is_any_ngram(&self) -> bool {
        matches!(self, TextPattern::AnyToken(a) if a.is_any_ngram())
    }

    /// Minimum and maximum number of tokens a match of this pattern spans,
    /// or `None` if this can't be determined from the pattern alone.
    pub fn length_range(&self) -> Option<(u32, u32)> {
        match self {
            TextPattern::Term(_) | TextPattern::Regex(_) | TextPattern::Not(_) => Some((1, 1)),
            TextPattern::AnyToken(a) => Some((a.min, a.max)),
            TextPattern::And(clauses) => {
                let mut result = (0, UNLIMITED);
                for c in clauses.iter() {
                    let (min, max) = c.length_range()?;
                    result = (result.0.max(min), result.1.min(max));
                }
                Some(result)
            }
            TextPattern::Or(clauses) => {
                let mut result = (UNLIMITED, 0);
                for c in clauses.iter() {
                    let (min, max) = c.length_range()?;
                    result = (result.0.min(min), result.1.max(max));
                }
                Some(result)
            }
            TextPattern::Sequence(clauses) => {
                let mut result = (0, 0);
                for c in clauses.iter() {
                    let (min, max) = c.length_range()?;
                    result = (add_max(result.0, min), add_max(result.1, max));
                }
                Some(result)
            }
            TextPattern::Repetition(r) => {
                let (min, max) = r.clause.length_range()?;
                Some((mul_max(min, r.min), mul_max(max, r.max)))
            }
            TextPattern::Expansion(e) => {
                let (min, max) = e.clause.length_range()?;
                Some((add_max(min, e.min), add_max(max, e.max)))
            }
            TextPattern::PositionFilter(p) => p.producer.length_range(),
            TextPattern::FilterNGrams(f) => Some((f.min, f.max)),
            TextPattern::CaptureGroup(c) => c.clause.length_range(),
            TextPattern::Constrained(c) => c.clause.length_range(),
            TextPattern::DocVersion(d) => d.clause.length_range(),
            TextPattern::Settings(s) => s.clause.length_range(),
            TextPattern::Edge(_) => Some((0, 0)),
            TextPattern::FixedSpan(f) => {
                let len = f.end - f.start;
                Some((len, len))
            }
            TextPattern::Tags(t) => match t.adjust {
                TagAdjust::FullTag => None,
                TagAdjust::LeadingEdge | TagAdjust::TrailingEdge => Some((0, 0)),
            },
            TextPattern::RelationTarget(_)
            | TextPattern::RelationMatch(_)
            | TextPattern::RootRelationMatch(_)
            | TextPattern::DefaultValue
            | TextPattern::QueryFunctionCall(_) => None,
        }
    }

    /// Direct child patterns, in the order they appear in the query.
    pub fn child_patterns(&self) -> Vec<&TextPattern> {
        match self {
            TextPattern::And(clauses) | TextPattern::Or(clauses) | TextPattern::Sequence(clauses) => {
                clauses.iter().collect()
            }
            TextPattern::Not(n) => vec![n.clause.as_ref()],
            TextPattern::Repetition(r) => vec![r.clause.as_ref()],
            TextPattern::Expansion(e) => vec![e.clause.as_ref()],
            TextPattern::PositionFilter(p) => vec![p.producer.as_ref(), p.filter.as_ref()],
            TextPattern::FilterNGrams(n) => vec![n.clause.as_ref()],
            TextPattern::CaptureGroup(c) => vec![c.clause.as_ref()],
            TextPattern::Constrained(c) => vec![c.clause.as_ref()],
            TextPattern::Edge(e) => vec![e.clause.as_ref()],
            TextPattern::RelationTarget(t) => vec![t.target()],
            TextPattern::RelationMatch(m) => std::iter::once(m.parent.as_ref())
                .chain(m.children.iter().map(RelationTarget::target))
                .collect(),
            TextPattern::RootRelationMatch(m) => {
                m.children.iter().map(RelationTarget::target).collect()
            }
            TextPattern::DocVersion(d) => vec![d.clause.as_ref()],
            TextPattern::QueryFunctionCall(call) => call
                .args
                .iter()
                .filter_map(|arg| match arg {
                    FunctionArg::Pattern(p) => Some(p),
                    _ => None,
                })
                .collect(),
            TextPattern::Settings(s) => vec![s.clause.as_ref()],
            TextPattern::Term(_)
            | TextPattern::Regex(_)
            | TextPattern::AnyToken(_)
            | TextPattern::FixedSpan(_)
            | TextPattern::Tags(_)
            | TextPattern::DefaultValue => Vec::new(),
        }
    }

    /// Call `f` for this node and all its descendants (pre-order).
    ///
    /// Uses an explicit stack, so arbitrarily deep patterns can be walked.
    pub fn walk<F: FnMut(&TextPattern)>(&self, f: &mut F) {
        let mut stack = vec![self];
        while let Some(pattern) = stack.pop() {
            f(pattern);
            stack.extend(pattern.child_patterns().into_iter().rev());
        }
    }

    /// Names of all explicit captures in this pattern (capture groups, tag and
    /// relation captures).
    pub fn explicit_capture_names(&self) -> Vec<String> {
        let mut result = Vec::new();
        self.walk(&mut |p: &TextPattern| match p {
            TextPattern::CaptureGroup(c) => result.push(c.capture_as.clone()),
            TextPattern::Tags(t) => {
                if let Some(c) = &t.capture_as {
                    result.push(c.clone());
                }
            }
            TextPattern::RelationTarget(t) => {
                if let Some(c) = t.capture_as() {
                    result.push(c.to_string());
                }
            }
            TextPattern::RelationMatch(m) => {
                result.extend(m.children.iter().filter_map(|c| c.capture_as().map(String::from)))
            }
            TextPattern::RootRelationMatch(m) => {
                result.extend(m.children.iter().filter_map(|c| c.capture_as().map(String::from)))
            }
            _ => {}
        });
        result
    }
}
