//! Algebraic simplifications that replace a node with an equivalent, cheaper one.
//!
//! Rewriting is applied lazily to a single node right before it is translated;
//! it never changes which spans the pattern matches.

use super::{AnyToken, TermPattern, TextPattern};
use corpusql_core::{
    types::UNLIMITED,
    util::{is_alphanumeric_only, split_sensitivity_prefix},
};

impl TextPattern {
    /// Rewrite this node into a simpler equivalent, or return `None` if no
    /// rule applies.
    pub fn rewrite(&self) -> Option<TextPattern> {
        let result = match self {
            TextPattern::Regex(t) => rewrite_regex(t),
            TextPattern::Not(n) => match n.clause() {
                TextPattern::Not(inner) => Some(inner.clause().clone()),
                _ => None,
            },
            TextPattern::And(clauses) | TextPattern::Or(clauses) | TextPattern::Sequence(clauses)
                if clauses.len() == 1 =>
            {
                clauses.iter().next().cloned()
            }
            TextPattern::Repetition(r) => match r.clause() {
                TextPattern::AnyToken(a) if a.min() == 1 && a.max() == 1 => {
                    Some(TextPattern::AnyToken(AnyToken {
                        min: r.min(),
                        max: r.max(),
                    }))
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(rewritten) = &result {
            debug!("Rewrote {} to {}", self.kind(), rewritten.kind());
        }
        result
    }
}

fn rewrite_regex(t: &TermPattern) -> Option<TextPattern> {
    let (forced, pattern) = split_sensitivity_prefix(&t.value);
    if let Some(sensitivity) = forced {
        let explicit = TermPattern {
            value: pattern.to_string(),
            annotation: t.annotation.clone(),
            sensitivity: Some(sensitivity),
        };
        return Some(rewrite_regex(&explicit).unwrap_or(TextPattern::Regex(explicit)));
    }
    if is_alphanumeric_only(&t.value) {
        return Some(TextPattern::Term(t.clone()));
    }
    None
}

/// Replace a default value, either bare or as the only content of a capture
/// group, with a pattern matching any n-gram.
///
/// Only used for the operands of relation and alignment operators.
pub fn replace_with_any_token(pattern: &TextPattern) -> TextPattern {
    let any_ngram = || {
        TextPattern::AnyToken(AnyToken {
            min: 0,
            max: UNLIMITED,
        })
    };
    match pattern {
        TextPattern::DefaultValue => any_ngram(),
        TextPattern::CaptureGroup(c) if c.clause() == &TextPattern::DefaultValue => {
            let mut replaced = c.clone();
            replaced.clause = Box::new(any_ngram());
            TextPattern::CaptureGroup(replaced)
        }
        other => other.clone(),
    }
}
