//! Corpus query language text form of patterns and match filters.
//!
//! Each node is written with a precedence level. A child is put in
//! parentheses only if its level is lower than the slot it is written into
//! requires. Nodes without a text form result in
//! [`QueryError::UnsupportedSerialization`].

use crate::errors::{QueryError, Result};
use crate::matchfilter::MatchFilter;
use crate::textpattern::{
    FunctionArg, MatchValue, RelationTarget, Tags, TermPattern, TextPattern,
};
use corpusql_core::types::{
    ExpansionDirection, MatchSensitivity, PositionOperation, SpanMode, TagAdjust, UNLIMITED,
};
use corpusql_core::util::{escape_regex, quote};

#[cfg(test)]
mod tests;

/// Precedence levels of the pattern syntax, lowest binding first.
mod level {
    pub const CONSTRAINT: u8 = 0;
    pub const POSITION: u8 = 1;
    pub const OR: u8 = 2;
    pub const AND: u8 = 3;
    pub const SEQUENCE: u8 = 4;
    pub const PREFIX: u8 = 5;
    pub const POSTFIX: u8 = 6;
    pub const ATOM: u8 = 7;
}

/// Precedence levels of the match filter syntax.
mod filter_level {
    pub const IMPLICATION: u8 = 0;
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const COMPARE: u8 = 3;
    pub const NOT: u8 = 4;
    pub const ATOM: u8 = 5;
}

/// Text of a (sub)expression together with its precedence level.
struct Written {
    text: String,
    level: u8,
}

impl Written {
    fn new<S: Into<String>>(text: S, level: u8) -> Written {
        Written {
            text: text.into(),
            level,
        }
    }

    fn in_slot(self, min_level: u8) -> String {
        if self.level < min_level {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn unsupported(what: &str) -> QueryError {
    QueryError::UnsupportedSerialization(what.to_string())
}

fn sensitivity_prefix(sensitivity: Option<MatchSensitivity>) -> Result<&'static str> {
    match sensitivity {
        None => Ok(""),
        Some(MatchSensitivity::Sensitive) => Ok("(?-i)"),
        Some(MatchSensitivity::Insensitive) => Ok("(?i)"),
        Some(other) => Err(QueryError::UnsupportedSerialization(format!(
            "match sensitivity '{}' has no query language syntax",
            other
        ))),
    }
}

/// Values that can be written without quotes, e.g. `the` or `fo.*`.
fn is_plain_word(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_alphanumeric() => {
            chars.all(|c| c.is_alphanumeric() || ".*+?-_".contains(c))
        }
        _ => false,
    }
}

/// The regex a term or regex node matches, including a sensitivity prefix.
fn value_regex(pattern: &TextPattern, t: &TermPattern) -> Result<String> {
    let value = match pattern {
        TextPattern::Term(_) => escape_regex(t.value()),
        _ => t.value().to_string(),
    };
    Ok(format!("{}{}", sensitivity_prefix(t.sensitivity())?, value))
}

fn repetition_operator(min: u32, max: u32) -> String {
    match (min, max) {
        (1, 1) => String::new(),
        (0, UNLIMITED) => "*".to_string(),
        (1, UNLIMITED) => "+".to_string(),
        (0, 1) => "?".to_string(),
        (min, UNLIMITED) => format!("{{{},}}", min),
        (min, max) if min == max => format!("{{{}}}", min),
        (min, max) => format!("{{{},{}}}", min, max),
    }
}

fn any_token(min: u32, max: u32) -> Written {
    let op = repetition_operator(min, max);
    let level = if op.is_empty() {
        level::ATOM
    } else {
        level::POSTFIX
    };
    Written::new(format!("[]{}", op), level)
}

/// Write the inside of a token bracket, e.g. `lemma='be' & pos!='VERB'`.
fn write_bracket_part(pattern: &TextPattern) -> Result<Written> {
    match pattern {
        TextPattern::Term(t) | TextPattern::Regex(t) => Ok(Written::new(
            format!(
                "{}={}",
                t.annotation().unwrap_or_default(),
                quote(&value_regex(pattern, t)?)
            ),
            level::ATOM,
        )),
        TextPattern::And(clauses) => {
            let parts: Vec<String> = clauses
                .iter()
                .map(|c| Ok(write_bracket_part(c)?.in_slot(level::AND + 1)))
                .collect::<Result<_>>()?;
            Ok(Written::new(parts.join(" & "), level::AND))
        }
        TextPattern::Or(clauses) => {
            let parts: Vec<String> = clauses
                .iter()
                .map(|c| Ok(write_bracket_part(c)?.in_slot(level::OR + 1)))
                .collect::<Result<_>>()?;
            Ok(Written::new(parts.join(" | "), level::OR))
        }
        TextPattern::Not(n) => match n.clause() {
            clause @ (TextPattern::Term(t) | TextPattern::Regex(t)) => Ok(Written::new(
                format!(
                    "{}!={}",
                    t.annotation().unwrap_or_default(),
                    quote(&value_regex(clause, t)?)
                ),
                level::ATOM,
            )),
            clause => Ok(Written::new(
                format!("!{}", write_bracket_part(clause)?.in_slot(level::PREFIX + 1)),
                level::PREFIX,
            )),
        },
        other => Err(QueryError::UnsupportedSerialization(format!(
            "{} cannot be written inside token brackets",
            other.kind()
        ))),
    }
}

fn write_tags(tags: &Tags) -> Result<Written> {
    let mut attributes = String::new();
    for (name, value) in tags.attributes() {
        attributes.push(' ');
        attributes.push_str(name);
        attributes.push('=');
        match value {
            MatchValue::Regex(regex) => attributes.push_str(&quote(regex)),
            MatchValue::IntRange { min, max } => {
                attributes.push_str(&format!("in[{},{}]", min, max))
            }
        }
    }
    let name = tags.element_name();
    let tag = match tags.adjust() {
        TagAdjust::FullTag => format!("<{}{}/>", name, attributes),
        TagAdjust::LeadingEdge => format!("<{}{}>", name, attributes),
        TagAdjust::TrailingEdge if attributes.is_empty() => format!("</{}>", name),
        TagAdjust::TrailingEdge => {
            return Err(unsupported(
                "attributes on the trailing edge of a tag cannot be written",
            ))
        }
    };
    Ok(match tags.capture_as() {
        Some(capture) => Written::new(format!("{}:{}", capture, tag), level::PREFIX),
        None => Written::new(tag, level::ATOM),
    })
}

/// Write one relation child as `capture:operator target`.
fn write_relation_target(target: &RelationTarget) -> Result<String> {
    let operator = target.operator_info();
    let expected_mode = if operator.is_root() {
        SpanMode::Target
    } else {
        SpanMode::Source
    };
    if target.span_mode() != expected_mode {
        return Err(QueryError::UnsupportedSerialization(format!(
            "relation span mode '{}' can only be expressed with a function call",
            target.span_mode()
        )));
    }
    if operator.source_version().is_some() {
        return Err(unsupported(
            "relation source versions have no query language syntax",
        ));
    }
    let capture = target
        .capture_as()
        .map(|c| format!("{}:", c))
        .unwrap_or_default();
    Ok(format!(
        "{}{} {}",
        capture,
        operator.to_operator(),
        write(target.target())?.in_slot(level::SEQUENCE + 1)
    ))
}

fn write_clauses(clauses: &[TextPattern], separator: &str, slot: u8) -> Result<String> {
    let parts: Vec<String> = clauses
        .iter()
        .map(|c| Ok(write(c)?.in_slot(slot)))
        .collect::<Result<_>>()?;
    Ok(parts.join(separator))
}

fn write(pattern: &TextPattern) -> Result<Written> {
    if pattern.is_bracket_query() {
        return Ok(Written::new(
            format!("[{}]", write_bracket_part(pattern)?.text),
            level::ATOM,
        ));
    }
    let written = match pattern {
        TextPattern::Term(t) | TextPattern::Regex(t) => {
            let regex = value_regex(pattern, t)?;
            if is_plain_word(&regex) {
                Written::new(regex, level::ATOM)
            } else {
                Written::new(quote(&regex), level::ATOM)
            }
        }
        TextPattern::AnyToken(a) => any_token(a.min(), a.max()),
        TextPattern::And(clauses) => Written::new(
            write_clauses(clauses.as_slice(), " & ", level::AND + 1)?,
            level::AND,
        ),
        TextPattern::Or(clauses) => Written::new(
            write_clauses(clauses.as_slice(), " | ", level::OR + 1)?,
            level::OR,
        ),
        TextPattern::Sequence(clauses) => Written::new(
            write_clauses(clauses.as_slice(), " ", level::SEQUENCE + 1)?,
            level::SEQUENCE,
        ),
        TextPattern::Not(n) => Written::new(
            format!("!{}", write(n.clause())?.in_slot(level::PREFIX + 1)),
            level::PREFIX,
        ),
        TextPattern::Repetition(r) => Written::new(
            format!(
                "{}{}",
                write(r.clause())?.in_slot(level::POSTFIX + 1),
                repetition_operator(r.min(), r.max())
            ),
            level::POSTFIX,
        ),
        TextPattern::Expansion(e) => {
            let clause = write(e.clause())?.in_slot(level::SEQUENCE + 1);
            let any = any_token(e.min(), e.max()).text;
            let text = match e.direction() {
                ExpansionDirection::Left => format!("{} {}", any, clause),
                ExpansionDirection::Right => format!("{} {}", clause, any),
            };
            Written::new(text, level::SEQUENCE)
        }
        TextPattern::PositionFilter(p) => {
            if p.invert() || p.adjust_leading() != 0 || p.adjust_trailing() != 0 {
                return Err(unsupported(
                    "inverted or adjusted position filters have no query language syntax",
                ));
            }
            let keyword = match p.operation() {
                PositionOperation::Within => "within",
                PositionOperation::Containing => "containing",
                other => {
                    return Err(QueryError::UnsupportedSerialization(format!(
                        "position filter operation '{}' has no query language syntax",
                        other
                    )))
                }
            };
            Written::new(
                format!(
                    "{} {} {}",
                    write(p.producer())?.in_slot(level::POSITION + 1),
                    keyword,
                    write(p.filter())?.in_slot(level::POSITION + 1)
                ),
                level::POSITION,
            )
        }
        TextPattern::CaptureGroup(c) => Written::new(
            format!(
                "{}:{}",
                c.capture_as(),
                write(c.clause())?.in_slot(level::PREFIX + 1)
            ),
            level::PREFIX,
        ),
        TextPattern::Constrained(c) => Written::new(
            format!(
                "{} :: {}",
                write(c.clause())?.in_slot(level::CONSTRAINT + 1),
                filter_to_cql(c.constraint())?
            ),
            level::CONSTRAINT,
        ),
        TextPattern::Tags(t) => write_tags(t)?,
        TextPattern::RelationTarget(t) => Written::new(
            format!("_ {}", write_relation_target(t)?),
            level::POSITION,
        ),
        TextPattern::RelationMatch(m) => {
            let children: Vec<String> = m
                .children()
                .iter()
                .map(|c| Ok(format!(" {}", write_relation_target(c)?)))
                .collect::<Result<_>>()?;
            Written::new(
                format!(
                    "{}{}",
                    write(m.parent())?.in_slot(level::SEQUENCE + 1),
                    children.join(" ;")
                ),
                level::POSITION,
            )
        }
        TextPattern::RootRelationMatch(m) => {
            let children: Vec<String> = m
                .children()
                .iter()
                .map(write_relation_target)
                .collect::<Result<_>>()?;
            Written::new(children.join(" ; "), level::POSITION)
        }
        TextPattern::DefaultValue => Written::new("_", level::ATOM),
        TextPattern::QueryFunctionCall(call) => {
            let args: Vec<String> = call
                .args()
                .iter()
                .map(|arg| match arg {
                    FunctionArg::Pattern(p) => Ok(write(p)?.text),
                    FunctionArg::Str(s) => Ok(quote(s)),
                    FunctionArg::Int(i) => Ok(i.to_string()),
                })
                .collect::<Result<_>>()?;
            Written::new(format!("{}({})", call.name(), args.join(", ")), level::ATOM)
        }
        TextPattern::Edge(_)
        | TextPattern::FixedSpan(_)
        | TextPattern::FilterNGrams(_)
        | TextPattern::Settings(_)
        | TextPattern::DocVersion(_) => {
            return Err(QueryError::UnsupportedSerialization(format!(
                "{} has no query language syntax",
                pattern.kind()
            )))
        }
    };
    Ok(written)
}

/// Write a pattern in corpus query language syntax.
pub fn to_cql(pattern: &TextPattern) -> Result<String> {
    Ok(write(pattern)?.text)
}

/// Left-associative binary operator.
fn write_binary(left: &MatchFilter, op: &str, right: &MatchFilter, level: u8) -> Result<Written> {
    Ok(Written::new(
        format!(
            "{}{}{}",
            write_filter(left)?.in_slot(level),
            op,
            write_filter(right)?.in_slot(level + 1)
        ),
        level,
    ))
}

fn write_filter(filter: &MatchFilter) -> Result<Written> {
    use filter_level::*;
    match filter {
        MatchFilter::Implication(a, b) => write_binary(a, " -> ", b, IMPLICATION),
        MatchFilter::Or(a, b) => write_binary(a, " | ", b, OR),
        MatchFilter::And(a, b) => write_binary(a, " & ", b, AND),
        MatchFilter::Compare {
            left,
            right,
            operator,
            ..
        } => Ok(Written::new(
            format!(
                "{} {} {}",
                write_filter(left)?.in_slot(COMPARE + 1),
                operator,
                write_filter(right)?.in_slot(COMPARE + 1)
            ),
            COMPARE,
        )),
        MatchFilter::Equals { left, right, .. } => Ok(Written::new(
            format!(
                "{} = {}",
                write_filter(left)?.in_slot(COMPARE + 1),
                write_filter(right)?.in_slot(COMPARE + 1)
            ),
            COMPARE,
        )),
        MatchFilter::Not(clause) => Ok(Written::new(
            format!("!{}", write_filter(clause)?.in_slot(NOT)),
            NOT,
        )),
        MatchFilter::StringLiteral(value) => Ok(Written::new(quote(value), ATOM)),
        MatchFilter::TokenAnnotation {
            capture,
            annotation,
        } => Ok(Written::new(
            format!("{}.{}", capture, annotation),
            ATOM,
        )),
        MatchFilter::FunctionCall { name, capture } => {
            Ok(Written::new(format!("{}({})", name, capture), ATOM))
        }
        MatchFilter::SameTokens { .. } => Err(unsupported(
            "same-token comparisons have no query language syntax",
        )),
        MatchFilter::TokenAnnotationEqualsString { .. } => Err(unsupported(
            "annotation-equals-string filters have no query language syntax",
        )),
    }
}

/// Write a match filter in corpus query language syntax.
pub fn filter_to_cql(filter: &MatchFilter) -> Result<String> {
    Ok(write_filter(filter)?.text)
}
