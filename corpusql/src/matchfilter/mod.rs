//! Boolean constraints over the annotations of captured tokens.

use corpusql_core::types::MatchSensitivity;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

mod constraint;

pub use constraint::{ConstraintExpr, ConstraintValue, MatchContext};

#[cfg(test)]
mod tests;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Display, EnumIter,
)]
pub enum CompareOperator {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering;
        match self {
            CompareOperator::Equal => ordering == Ordering::Equal,
            CompareOperator::NotEqual => ordering != Ordering::Equal,
            CompareOperator::Less => ordering == Ordering::Less,
            CompareOperator::LessOrEqual => ordering != Ordering::Greater,
            CompareOperator::Greater => ordering == Ordering::Greater,
            CompareOperator::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchFilter {
    And(Box<MatchFilter>, Box<MatchFilter>),
    Or(Box<MatchFilter>, Box<MatchFilter>),
    Not(Box<MatchFilter>),
    /// If the first clause is true, the second one must be true as well
    Implication(Box<MatchFilter>, Box<MatchFilter>),
    Compare {
        left: Box<MatchFilter>,
        right: Box<MatchFilter>,
        operator: CompareOperator,
        sensitivity: Option<MatchSensitivity>,
    },
    Equals {
        left: Box<MatchFilter>,
        right: Box<MatchFilter>,
        sensitivity: Option<MatchSensitivity>,
    },
    /// Two captures have the same value for an annotation
    SameTokens {
        capture_a: String,
        capture_b: String,
        annotation: String,
        sensitivity: Option<MatchSensitivity>,
    },
    StringLiteral(String),
    /// The value of an annotation of a captured token, e.g. `A.word`
    TokenAnnotation { capture: String, annotation: String },
    TokenAnnotationEqualsString {
        capture: String,
        annotation: String,
        value: String,
        sensitivity: Option<MatchSensitivity>,
    },
    /// Registered predicate applied to a capture
    FunctionCall { name: String, capture: String },
}

impl MatchFilter {
    pub fn and(left: MatchFilter, right: MatchFilter) -> MatchFilter {
        MatchFilter::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: MatchFilter, right: MatchFilter) -> MatchFilter {
        MatchFilter::Or(Box::new(left), Box::new(right))
    }

    pub fn not(clause: MatchFilter) -> MatchFilter {
        MatchFilter::Not(Box::new(clause))
    }

    pub fn implication(left: MatchFilter, right: MatchFilter) -> MatchFilter {
        MatchFilter::Implication(Box::new(left), Box::new(right))
    }

    pub fn compare(
        left: MatchFilter,
        right: MatchFilter,
        operator: CompareOperator,
        sensitivity: Option<MatchSensitivity>,
    ) -> MatchFilter {
        MatchFilter::Compare {
            left: Box::new(left),
            right: Box::new(right),
            operator,
            sensitivity,
        }
    }

    pub fn equals(
        left: MatchFilter,
        right: MatchFilter,
        sensitivity: Option<MatchSensitivity>,
    ) -> MatchFilter {
        MatchFilter::Equals {
            left: Box::new(left),
            right: Box::new(right),
            sensitivity,
        }
    }

    pub fn same_tokens(
        capture_a: &str,
        capture_b: &str,
        annotation: &str,
        sensitivity: Option<MatchSensitivity>,
    ) -> MatchFilter {
        MatchFilter::SameTokens {
            capture_a: capture_a.to_string(),
            capture_b: capture_b.to_string(),
            annotation: annotation.to_string(),
            sensitivity,
        }
    }

    pub fn string(value: &str) -> MatchFilter {
        MatchFilter::StringLiteral(value.to_string())
    }

    pub fn token_annotation(capture: &str, annotation: &str) -> MatchFilter {
        MatchFilter::TokenAnnotation {
            capture: capture.to_string(),
            annotation: annotation.to_string(),
        }
    }

    pub fn token_annotation_equals(
        capture: &str,
        annotation: &str,
        value: &str,
        sensitivity: Option<MatchSensitivity>,
    ) -> MatchFilter {
        MatchFilter::TokenAnnotationEqualsString {
            capture: capture.to_string(),
            annotation: annotation.to_string(),
            value: value.to_string(),
            sensitivity,
        }
    }

    pub fn function_call(name: &str, capture: &str) -> MatchFilter {
        MatchFilter::FunctionCall {
            name: name.to_string(),
            capture: capture.to_string(),
        }
    }

    /// All capture names this filter refers to.
    pub fn referenced_captures(&self) -> Vec<&str> {
        let mut result = Vec::new();
        collect_captures(self, &mut result);
        result
    }
}

fn collect_captures<'a>(filter: &'a MatchFilter, result: &mut Vec<&'a str>) {
    match filter {
        MatchFilter::And(a, b) | MatchFilter::Or(a, b) | MatchFilter::Implication(a, b) => {
            collect_captures(a, result);
            collect_captures(b, result);
        }
        MatchFilter::Compare { left, right, .. } | MatchFilter::Equals { left, right, .. } => {
            collect_captures(left, result);
            collect_captures(right, result);
        }
        MatchFilter::Not(c) => collect_captures(c, result),
        MatchFilter::SameTokens {
            capture_a,
            capture_b,
            ..
        } => {
            result.push(capture_a);
            result.push(capture_b);
        }
        MatchFilter::TokenAnnotation { capture, .. }
        | MatchFilter::TokenAnnotationEqualsString { capture, .. }
        | MatchFilter::FunctionCall { capture, .. } => result.push(capture),
        MatchFilter::StringLiteral(_) => {}
    }
}
