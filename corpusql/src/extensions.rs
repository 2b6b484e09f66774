//! Registry of named query functions and match-filter predicates.
//!
//! Query functions are called from a pattern (`rel('nsubj', _)`) and build a
//! plan node from their translated arguments. The built-in relation functions
//! are always available; applications can register more.

use crate::context::{CaptureRegistry, ExecutionContext};
use crate::engine::MatchInfo;
use crate::errors::{QueryError, Result};
use crate::matchfilter::{ConstraintValue, MatchContext};
use crate::plan::SpanQuery;
use corpusql_core::{
    types::{RelationDirection, SpanMode},
    util::{
        compile_full_match,
        fieldname::{capture_name_for_relation_type, opt_prepend_default_class, ANY_TYPE_REGEX},
    },
};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Query,
    Str,
    Int,
}

/// Value used when an argument is omitted or given as `_`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DefaultArg {
    /// A query matching any n-gram
    AnyNGram,
    Str(String),
    Int(i64),
}

/// A translated function argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    Query(SpanQuery),
    Str(String),
    Int(i64),
}

/// What a query function can access while building its plan.
pub struct FunctionContext<'c, 'a> {
    pub context: &'c ExecutionContext<'a>,
    pub captures: &'c mut CaptureRegistry,
}

pub type QueryFunction = fn(&mut FunctionContext, &[ArgValue]) -> Result<SpanQuery>;

/// Predicate on a captured match, usable in constraints as `name(A)`.
pub type FilterFunction = fn(&MatchContext, &MatchInfo) -> ConstraintValue;

#[derive(Clone)]
pub struct QueryFunctionSpec {
    pub name: String,
    pub arg_types: Vec<ArgType>,
    /// Default per argument; `None` means the argument is required
    pub defaults: Vec<Option<DefaultArg>>,
    /// The last argument type can be repeated
    pub variadic: bool,
    pub function: QueryFunction,
}

impl QueryFunctionSpec {
    pub fn arg_type(&self, index: usize) -> Option<ArgType> {
        match self.arg_types.get(index) {
            Some(t) => Some(*t),
            None if self.variadic => self.arg_types.last().copied(),
            None => None,
        }
    }

    /// Check and complete a list of arguments: `None` entries and missing
    /// trailing arguments are replaced by their default.
    pub fn complete_args(
        &self,
        args: Vec<Option<ArgValue>>,
        context: &ExecutionContext,
    ) -> Result<Vec<ArgValue>> {
        let expected = if self.variadic {
            args.len().max(self.arg_types.len().saturating_sub(1))
        } else {
            if args.len() > self.arg_types.len() {
                return Err(QueryError::InvalidQuery(format!(
                    "function {} takes at most {} arguments, got {}",
                    self.name,
                    self.arg_types.len(),
                    args.len()
                )));
            }
            self.arg_types.len()
        };
        let mut args = args.into_iter();
        let mut result = Vec::with_capacity(expected);
        for i in 0..expected {
            let value = match args.next().flatten() {
                Some(value) => value,
                None => self.default_arg(i, context)?,
            };
            result.push(value);
        }
        Ok(result)
    }

    fn default_arg(&self, index: usize, context: &ExecutionContext) -> Result<ArgValue> {
        match self.defaults.get(index).cloned().flatten() {
            Some(DefaultArg::AnyNGram) => Ok(ArgValue::Query(SpanQuery::any_ngram(
                &context.field_name(),
            ))),
            Some(DefaultArg::Str(s)) => Ok(ArgValue::Str(s)),
            Some(DefaultArg::Int(i)) => Ok(ArgValue::Int(i)),
            None => Err(QueryError::InvalidQuery(format!(
                "function {}: argument {} is required",
                self.name,
                index + 1
            ))),
        }
    }
}

fn spec(
    name: &str,
    arg_types: Vec<ArgType>,
    defaults: Vec<Option<DefaultArg>>,
    variadic: bool,
    function: QueryFunction,
) -> QueryFunctionSpec {
    QueryFunctionSpec {
        name: name.to_string(),
        arg_types,
        defaults,
        variadic,
        function,
    }
}

fn str_default(value: &str) -> Option<DefaultArg> {
    Some(DefaultArg::Str(value.to_string()))
}

lazy_static! {
    static ref BUILTIN_FUNCTIONS: HashMap<String, QueryFunctionSpec> = {
        let mut functions = HashMap::new();
        let builtins = vec![
            spec(
                "rel",
                vec![ArgType::Str, ArgType::Query, ArgType::Str, ArgType::Str, ArgType::Str],
                vec![
                    str_default(ANY_TYPE_REGEX),
                    Some(DefaultArg::AnyNGram),
                    str_default("source"),
                    str_default(""),
                    str_default("both"),
                ],
                false,
                rel,
            ),
            spec("rmatch", vec![ArgType::Query], vec![], true, rmatch),
            spec(
                "rspan",
                vec![ArgType::Query, ArgType::Str],
                vec![None, str_default("full")],
                false,
                rspan,
            ),
            spec(
                "rcapture",
                vec![ArgType::Query, ArgType::Str, ArgType::Str],
                vec![None, str_default("rels"), str_default(ANY_TYPE_REGEX)],
                false,
                rcapture,
            ),
            spec(
                "rcapture2",
                vec![ArgType::Query, ArgType::Str, ArgType::Str, ArgType::Str],
                vec![None, None, str_default("rels"), str_default(ANY_TYPE_REGEX)],
                false,
                rcapture2,
            ),
        ];
        for f in builtins {
            functions.insert(f.name.clone(), f);
        }
        functions
    };
}

/// Available query functions and filter predicates.
#[derive(Clone)]
pub struct QueryExtensions {
    functions: HashMap<String, QueryFunctionSpec>,
    filters: HashMap<String, FilterFunction>,
}

impl Default for QueryExtensions {
    fn default() -> Self {
        QueryExtensions {
            functions: BUILTIN_FUNCTIONS.clone(),
            filters: HashMap::new(),
        }
    }
}

impl QueryExtensions {
    /// A registry with the built-in relation functions.
    pub fn new() -> QueryExtensions {
        QueryExtensions::default()
    }

    pub fn register(&mut self, function: QueryFunctionSpec) {
        debug!("Registering query function {}", function.name);
        self.functions.insert(function.name.clone(), function);
    }

    pub fn register_filter(&mut self, name: &str, function: FilterFunction) {
        debug!("Registering filter function {}", name);
        self.filters.insert(name.to_string(), function);
    }

    pub fn function(&self, name: &str) -> Option<&QueryFunctionSpec> {
        self.functions.get(name)
    }

    pub fn filter_function(&self, name: &str) -> Option<FilterFunction> {
        self.filters.get(name).copied()
    }
}

fn str_arg<'v>(args: &'v [ArgValue], index: usize) -> Result<&'v str> {
    match args.get(index) {
        Some(ArgValue::Str(s)) => Ok(s),
        _ => Err(QueryError::InvalidQuery(format!(
            "argument {} must be a string",
            index + 1
        ))),
    }
}

fn query_arg(args: &[ArgValue], index: usize) -> Result<SpanQuery> {
    match args.get(index) {
        Some(ArgValue::Query(q)) => Ok(q.clone()),
        _ => Err(QueryError::InvalidQuery(format!(
            "argument {} must be a query",
            index + 1
        ))),
    }
}

fn parse_span_mode(code: &str) -> Result<SpanMode> {
    SpanMode::from_code(code).map_err(|e| QueryError::InvalidQuery(e.to_string()))
}

/// Check that a full relation type regex is a valid regex.
pub(crate) fn check_relation_type(full_type: &str) -> Result<()> {
    compile_full_match(full_type)
        .map(|_| ())
        .map_err(|e| QueryError::InvalidQuery(format!("unresolvable relation type: {}", e)))
}

/// Build the plan for a relation of type `full_type` from the current span.
///
/// Without a target, hits are the relations' spans according to `span_mode`.
/// With a target, the relation target must match it, after which the hit is
/// adjusted to `span_mode`. Relations without an explicit capture name get
/// one derived from their type.
pub(crate) fn relation_query(
    context: &ExecutionContext,
    captures: &mut CaptureRegistry,
    full_type: &str,
    target: Option<SpanQuery>,
    direction: RelationDirection,
    span_mode: SpanMode,
    capture_as: Option<&str>,
) -> Result<SpanQuery> {
    check_relation_type(full_type)?;
    let relations_field = context.with_relation_annotation()?.index_field()?;
    let capture_as = match capture_as.filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => {
            let name = captures.ensure_unique(&capture_name_for_relation_type(full_type));
            debug!("Capturing relation {} as {}", full_type, name);
            name
        }
    };
    let relations = |span_mode| SpanQuery::Relations {
        relations_field: relations_field.clone(),
        type_regex: full_type.to_string(),
        direction,
        span_mode,
        capture_as: capture_as.clone(),
    };
    Ok(match target {
        None => relations(span_mode),
        Some(target) => {
            let matched = SpanQuery::RelationAnd(vec![relations(SpanMode::Target), target]);
            if span_mode == SpanMode::Target {
                matched
            } else {
                SpanQuery::RelationSpanAdjust {
                    clause: Box::new(matched),
                    span_mode,
                }
            }
        }
    })
}

/// Combine relation clauses that must all hold for the same span.
///
/// Clauses matching any n-gram add nothing and are dropped.
pub(crate) fn relation_match_query(field: &str, clauses: Vec<SpanQuery>) -> SpanQuery {
    let mut clauses: Vec<SpanQuery> = clauses.into_iter().filter(|c| !c.is_any_ngram()).collect();
    match clauses.len() {
        0 => SpanQuery::any_ngram(field),
        1 => clauses.remove(0),
        _ => SpanQuery::RelationAnd(clauses),
    }
}

fn rel(fc: &mut FunctionContext, args: &[ArgValue]) -> Result<SpanQuery> {
    let full_type = opt_prepend_default_class(str_arg(args, 0)?, fc.context.default_relation_class());
    let target = Some(query_arg(args, 1)?).filter(|t| !t.is_any_ngram());
    let span_mode = parse_span_mode(str_arg(args, 2)?)?;
    let capture_as = str_arg(args, 3)?;
    let direction = RelationDirection::from_code(str_arg(args, 4)?)
        .map_err(|e| QueryError::InvalidQuery(e.to_string()))?;
    relation_query(
        fc.context,
        fc.captures,
        &full_type,
        target,
        direction,
        span_mode,
        Some(capture_as),
    )
}

fn rmatch(fc: &mut FunctionContext, args: &[ArgValue]) -> Result<SpanQuery> {
    let clauses = (0..args.len())
        .map(|i| query_arg(args, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(relation_match_query(&fc.context.field_name(), clauses))
}

fn rspan(_fc: &mut FunctionContext, args: &[ArgValue]) -> Result<SpanQuery> {
    Ok(SpanQuery::RelationSpanAdjust {
        clause: Box::new(query_arg(args, 0)?),
        span_mode: parse_span_mode(str_arg(args, 1)?)?,
    })
}

fn capture_within(
    fc: &mut FunctionContext,
    clause: SpanQuery,
    within_capture: Option<&str>,
    capture_as: &str,
    type_regex: &str,
) -> Result<SpanQuery> {
    let full_type = opt_prepend_default_class(type_regex, fc.context.default_relation_class());
    check_relation_type(&full_type)?;
    Ok(SpanQuery::CaptureRelationsWithinSpan {
        clause: Box::new(clause),
        within_capture: within_capture.map(String::from),
        relations_field: fc.context.with_relation_annotation()?.index_field()?,
        type_regex: full_type,
        capture_as: fc.captures.ensure_unique(capture_as),
    })
}

fn rcapture(fc: &mut FunctionContext, args: &[ArgValue]) -> Result<SpanQuery> {
    let clause = query_arg(args, 0)?;
    capture_within(fc, clause, None, str_arg(args, 1)?, str_arg(args, 2)?)
}

fn rcapture2(fc: &mut FunctionContext, args: &[ArgValue]) -> Result<SpanQuery> {
    let clause = query_arg(args, 0)?;
    let to_capture = str_arg(args, 1)?;
    capture_within(
        fc,
        clause,
        Some(to_capture),
        str_arg(args, 2)?,
        str_arg(args, 3)?,
    )
}
