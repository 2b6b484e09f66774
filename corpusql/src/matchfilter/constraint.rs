use super::{CompareOperator, MatchFilter};
use crate::context::ExecutionContext;
use crate::engine::{DocId, ForwardIndexAccessor, MatchInfo};
use crate::errors::{QueryError, Result};
use crate::extensions::QueryExtensions;
use corpusql_core::types::MatchSensitivity;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Value of a (sub)expression of a constraint for a single hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintValue {
    Str(String),
    Int(i64),
    Bool(bool),
    /// A referenced capture is missing or has no token
    Undefined,
}

impl ConstraintValue {
    /// Undefined values and empty strings count as false.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConstraintValue::Str(s) => !s.is_empty(),
            ConstraintValue::Int(i) => *i != 0,
            ConstraintValue::Bool(b) => *b,
            ConstraintValue::Undefined => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ConstraintValue::Undefined)
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            ConstraintValue::Int(i) => Some(*i),
            ConstraintValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            ConstraintValue::Str(s) => Some(s.clone()),
            ConstraintValue::Int(i) => Some(i.to_string()),
            ConstraintValue::Bool(b) => Some(b.to_string()),
            ConstraintValue::Undefined => None,
        }
    }

    /// Compare two values, numerically if both are integers.
    fn compare(
        &self,
        other: &ConstraintValue,
        operator: CompareOperator,
        sensitivity: MatchSensitivity,
    ) -> ConstraintValue {
        if self.is_undefined() || other.is_undefined() {
            return ConstraintValue::Undefined;
        }
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return ConstraintValue::Bool(operator.holds(a.cmp(&b)));
        }
        match (self.as_text(), other.as_text()) {
            (Some(a), Some(b)) => {
                let a = sensitivity.desensitize(&a);
                let b = sensitivity.desensitize(&b);
                ConstraintValue::Bool(operator.holds(a.cmp(&b)))
            }
            _ => ConstraintValue::Undefined,
        }
    }
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstraintValue::Str(s) => write!(f, "'{}'", s),
            ConstraintValue::Int(i) => write!(f, "{}", i),
            ConstraintValue::Bool(b) => write!(f, "{}", b),
            ConstraintValue::Undefined => write!(f, "undefined"),
        }
    }
}

/// What a constraint needs to know about a hit to evaluate it.
pub struct MatchContext<'a> {
    pub doc: DocId,
    pub captures: &'a BTreeMap<String, MatchInfo>,
    pub forward_index: &'a dyn ForwardIndexAccessor,
    /// Annotated field the token values are read from
    pub field: &'a str,
    pub extensions: &'a QueryExtensions,
}

impl<'a> MatchContext<'a> {
    /// Value of an annotation for the first token of a capture.
    pub fn token_value(&self, capture: &str, annotation: &str) -> Option<String> {
        let (start, end) = self.captures.get(capture)?.span();
        if start >= end {
            return None;
        }
        self.forward_index
            .token_value(self.doc, self.field, annotation, start)
    }
}

/// A match filter with all defaults resolved, ready to be evaluated for hits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintExpr {
    And(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Or(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Not(Box<ConstraintExpr>),
    Implication(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Compare {
        left: Box<ConstraintExpr>,
        right: Box<ConstraintExpr>,
        operator: CompareOperator,
        sensitivity: MatchSensitivity,
    },
    SameTokens {
        capture_a: String,
        capture_b: String,
        annotation: String,
        sensitivity: MatchSensitivity,
    },
    StringLiteral(String),
    TokenAnnotation {
        capture: String,
        annotation: String,
    },
    TokenAnnotationEqualsString {
        capture: String,
        annotation: String,
        value: String,
        sensitivity: MatchSensitivity,
    },
    FunctionCall {
        name: String,
        capture: String,
    },
}

fn check_annotation(
    context: &ExecutionContext,
    annotation: &str,
    annotations: &mut BTreeSet<String>,
) -> Result<()> {
    if context.field_desc()?.annotation(annotation).is_none() {
        return Err(QueryError::InvalidQuery(format!(
            "unknown annotation '{}' in constraint on field '{}'",
            annotation,
            context.field_name()
        )));
    }
    annotations.insert(annotation.to_string());
    Ok(())
}

impl ConstraintExpr {
    /// Resolve a match filter in the given context.
    ///
    /// All annotations the constraint reads from the forward index are added
    /// to `annotations`.
    pub fn translate(
        filter: &MatchFilter,
        context: &ExecutionContext,
        extensions: &QueryExtensions,
        annotations: &mut BTreeSet<String>,
    ) -> Result<ConstraintExpr> {
        let sub = |f: &MatchFilter, annotations: &mut BTreeSet<String>| {
            ConstraintExpr::translate(f, context, extensions, annotations).map(Box::new)
        };
        let default_sensitivity = context.requested_sensitivity();
        let result = match filter {
            MatchFilter::And(a, b) => ConstraintExpr::And(sub(a, annotations)?, sub(b, annotations)?),
            MatchFilter::Or(a, b) => ConstraintExpr::Or(sub(a, annotations)?, sub(b, annotations)?),
            MatchFilter::Implication(a, b) => {
                ConstraintExpr::Implication(sub(a, annotations)?, sub(b, annotations)?)
            }
            MatchFilter::Not(a) => ConstraintExpr::Not(sub(a, annotations)?),
            MatchFilter::Compare {
                left,
                right,
                operator,
                sensitivity,
            } => ConstraintExpr::Compare {
                left: sub(left, annotations)?,
                right: sub(right, annotations)?,
                operator: *operator,
                sensitivity: sensitivity.unwrap_or(default_sensitivity),
            },
            MatchFilter::Equals {
                left,
                right,
                sensitivity,
            } => ConstraintExpr::Compare {
                left: sub(left, annotations)?,
                right: sub(right, annotations)?,
                operator: CompareOperator::Equal,
                sensitivity: sensitivity.unwrap_or(default_sensitivity),
            },
            MatchFilter::SameTokens {
                capture_a,
                capture_b,
                annotation,
                sensitivity,
            } => {
                check_annotation(context, annotation, annotations)?;
                ConstraintExpr::SameTokens {
                    capture_a: capture_a.clone(),
                    capture_b: capture_b.clone(),
                    annotation: annotation.clone(),
                    sensitivity: sensitivity.unwrap_or(default_sensitivity),
                }
            }
            MatchFilter::StringLiteral(value) => ConstraintExpr::StringLiteral(value.clone()),
            MatchFilter::TokenAnnotation {
                capture,
                annotation,
            } => {
                check_annotation(context, annotation, annotations)?;
                ConstraintExpr::TokenAnnotation {
                    capture: capture.clone(),
                    annotation: annotation.clone(),
                }
            }
            MatchFilter::TokenAnnotationEqualsString {
                capture,
                annotation,
                value,
                sensitivity,
            } => {
                check_annotation(context, annotation, annotations)?;
                ConstraintExpr::TokenAnnotationEqualsString {
                    capture: capture.clone(),
                    annotation: annotation.clone(),
                    value: value.clone(),
                    sensitivity: sensitivity.unwrap_or(default_sensitivity),
                }
            }
            MatchFilter::FunctionCall { name, capture } => {
                if extensions.filter_function(name).is_none() {
                    return Err(QueryError::InvalidQuery(format!(
                        "unknown filter function '{}'",
                        name
                    )));
                }
                ConstraintExpr::FunctionCall {
                    name: name.clone(),
                    capture: capture.clone(),
                }
            }
        };
        Ok(result)
    }

    pub fn evaluate(&self, ctx: &MatchContext) -> ConstraintValue {
        match self {
            ConstraintExpr::And(a, b) => {
                ConstraintValue::Bool(a.evaluate(ctx).is_truthy() && b.evaluate(ctx).is_truthy())
            }
            ConstraintExpr::Or(a, b) => {
                ConstraintValue::Bool(a.evaluate(ctx).is_truthy() || b.evaluate(ctx).is_truthy())
            }
            ConstraintExpr::Implication(a, b) => {
                ConstraintValue::Bool(!a.evaluate(ctx).is_truthy() || b.evaluate(ctx).is_truthy())
            }
            ConstraintExpr::Not(a) => match a.evaluate(ctx) {
                ConstraintValue::Undefined => ConstraintValue::Undefined,
                value => ConstraintValue::Bool(!value.is_truthy()),
            },
            ConstraintExpr::Compare {
                left,
                right,
                operator,
                sensitivity,
            } => left
                .evaluate(ctx)
                .compare(&right.evaluate(ctx), *operator, *sensitivity),
            ConstraintExpr::SameTokens {
                capture_a,
                capture_b,
                annotation,
                sensitivity,
            } => match (
                ctx.token_value(capture_a, annotation),
                ctx.token_value(capture_b, annotation),
            ) {
                (Some(a), Some(b)) => ConstraintValue::Bool(
                    sensitivity.desensitize(&a) == sensitivity.desensitize(&b),
                ),
                _ => ConstraintValue::Undefined,
            },
            ConstraintExpr::StringLiteral(value) => ConstraintValue::Str(value.clone()),
            ConstraintExpr::TokenAnnotation {
                capture,
                annotation,
            } => ctx
                .token_value(capture, annotation)
                .map(ConstraintValue::Str)
                .unwrap_or(ConstraintValue::Undefined),
            ConstraintExpr::TokenAnnotationEqualsString {
                capture,
                annotation,
                value,
                sensitivity,
            } => match ctx.token_value(capture, annotation) {
                Some(actual) => ConstraintValue::Bool(
                    sensitivity.desensitize(&actual) == sensitivity.desensitize(value),
                ),
                None => ConstraintValue::Undefined,
            },
            ConstraintExpr::FunctionCall { name, capture } => {
                match (ctx.extensions.filter_function(name), ctx.captures.get(capture)) {
                    (Some(function), Some(info)) => function(ctx, info),
                    _ => ConstraintValue::Undefined,
                }
            }
        }
    }

    /// Check if a hit satisfies this constraint.
    pub fn matches(&self, ctx: &MatchContext) -> bool {
        self.evaluate(ctx).is_truthy()
    }
}

impl fmt::Display for ConstraintExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstraintExpr::And(a, b) => write!(f, "AND({}, {})", a, b),
            ConstraintExpr::Or(a, b) => write!(f, "OR({}, {})", a, b),
            ConstraintExpr::Implication(a, b) => write!(f, "IMPLIES({}, {})", a, b),
            ConstraintExpr::Not(a) => write!(f, "NOT({})", a),
            ConstraintExpr::Compare {
                left,
                right,
                operator,
                sensitivity,
            } => write!(f, "CMP({}, {}, {}, {})", left, operator, right, sensitivity),
            ConstraintExpr::SameTokens {
                capture_a,
                capture_b,
                annotation,
                sensitivity,
            } => write!(
                f,
                "SAME({}, {}, {}, {})",
                capture_a, capture_b, annotation, sensitivity
            ),
            ConstraintExpr::StringLiteral(value) => write!(f, "'{}'", value),
            ConstraintExpr::TokenAnnotation {
                capture,
                annotation,
            } => write!(f, "{}.{}", capture, annotation),
            ConstraintExpr::TokenAnnotationEqualsString {
                capture,
                annotation,
                value,
                sensitivity,
            } => write!(f, "EQ({}.{}, '{}', {})", capture, annotation, value, sensitivity),
            ConstraintExpr::FunctionCall { name, capture } => write!(f, "{}({})", name, capture),
        }
    }
}
