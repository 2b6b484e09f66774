//! JSON form of patterns and match filters.
//!
//! Every node is an object with a `type` tag and named fields. Fields with
//! their default value are left out when writing and filled in when reading.

use crate::errors::{QueryError, Result};
use crate::matchfilter::{CompareOperator, MatchFilter};
use crate::textpattern::{
    FunctionArg, MatchValue, RelationOperatorInfo, RelationTarget, TextPattern,
};
use corpusql_core::types::{
    ExpansionDirection, MatchSensitivity, PositionOperation, RelationDirection, SpanMode,
    TagAdjust, UNLIMITED,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;


const KEY_TYPE: &str = "type";

const KEY_ADJUST: &str = "adjust";
const KEY_ADJUST_LEADING: &str = "adjustLeading";
const KEY_ADJUST_TRAILING: &str = "adjustTrailing";
const KEY_ALIGNMENT: &str = "alignment";
const KEY_ANNOTATION: &str = "annotation";
const KEY_ARGS: &str = "args";
const KEY_ATTRIBUTES: &str = "attributes";
const KEY_CAPTURE: &str = "capture";
const KEY_CAPTURES: &str = "captures";
const KEY_CHILDREN: &str = "children";
const KEY_CLAUSE: &str = "clause";
const KEY_CLAUSES: &str = "clauses";
const KEY_CONSTRAINT: &str = "constraint";
const KEY_DIRECTION: &str = "direction";
const KEY_END: &str = "end";
const KEY_FILTER: &str = "filter";
const KEY_INVERT: &str = "invert";
const KEY_MAX: &str = "max";
const KEY_MIN: &str = "min";
const KEY_NAME: &str = "name";
const KEY_NEGATE: &str = "negate";
const KEY_OPERATION: &str = "operation";
const KEY_OPTIONAL: &str = "optional";
const KEY_PARENT: &str = "parent";
const KEY_PRODUCER: &str = "producer";
const KEY_REL_SPAN_MODE: &str = "spanMode";
const KEY_REL_TYPE: &str = "relType";
const KEY_SENSITIVITY: &str = "sensitivity";
const KEY_SETTINGS: &str = "settings";
const KEY_SOURCE_VERSION: &str = "sourceVersion";
const KEY_START: &str = "start";
const KEY_TARGET_VERSION: &str = "targetVersion";
const KEY_TRAILING_EDGE: &str = "trailingEdge";
const KEY_VALUE: &str = "value";
const KEY_VERSION: &str = "version";

const NT_AND: &str = "and";
const NT_ANYTOKEN: &str = "anytoken";
const NT_CALLFUNC: &str = "callfunc";
const NT_CAPTURE: &str = "capture";
const NT_CONSTRAINED: &str = "constrained";
const NT_DEFVAL: &str = "defval";
const NT_DOCVERSION: &str = "docversion";
const NT_EDGE: &str = "edge";
const NT_EXPANSION: &str = "expansion";
const NT_FILTERNGRAMS: &str = "filterngrams";
const NT_FIXEDSPAN: &str = "fixedspan";
const NT_NOT: &str = "not";
const NT_OR: &str = "or";
const NT_POSFILTER: &str = "posfilter";
const NT_REGEX: &str = "regex";
const NT_RELATION_MATCH: &str = "relmatch";
const NT_RELATION_TARGET: &str = "reltarget";
const NT_REPEAT: &str = "repeat";
const NT_SEQUENCE: &str = "sequence";
const NT_SETTINGS: &str = "settings";
const NT_TAGS: &str = "tags";
const NT_TERM: &str = "term";

/// Tags of node kinds that older clients may still send.
const DEPRECATED_TYPES: [&str; 7] = [
    "andnot",
    "prefix",
    "wildcard",
    "fuzzy",
    "sensitivity",
    "intrange",
    "overlapping",
];

const MF_AND: &str = "mf-and";
const MF_CALLFUNC: &str = "mf-callfunc";
const MF_COMPARE: &str = "mf-compare";
const MF_EQUALS: &str = "mf-equals";
const MF_IMPLICATION: &str = "mf-implication";
const MF_NOT: &str = "mf-not";
const MF_OR: &str = "mf-or";
const MF_STRING: &str = "mf-string";
const MF_TOKEN_ANNOTATION: &str = "mf-token-annotation";
const MF_TOKEN_ANNOTATION_EQUAL: &str = "mf-token-annotation-equal";
const MF_TOKEN_ANNOTATION_STRING: &str = "mf-token-annotation-string";

/// Builds the JSON object of one node.
struct ObjectWriter(Map<String, Value>);

impl ObjectWriter {
    fn new(node_type: &str) -> ObjectWriter {
        let mut map = Map::new();
        map.insert(KEY_TYPE.to_string(), Value::from(node_type));
        ObjectWriter(map)
    }

    fn field<V: Into<Value>>(mut self, key: &str, value: V) -> ObjectWriter {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn opt_field<V: Into<Value>>(self, key: &str, value: Option<V>) -> ObjectWriter {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    fn flag(self, key: &str, value: bool) -> ObjectWriter {
        self.opt_field(key, Some(value).filter(|v| *v))
    }

    fn max(self, max: u32) -> ObjectWriter {
        self.opt_field(KEY_MAX, Some(max).filter(|m| *m != UNLIMITED))
    }

    fn sensitivity(self, sensitivity: Option<MatchSensitivity>) -> ObjectWriter {
        self.opt_field(KEY_SENSITIVITY, sensitivity.map(MatchSensitivity::code))
    }

    fn finish(self) -> Value {
        Value::Object(self.0)
    }
}

fn patterns_to_json<'p, I: Iterator<Item = &'p TextPattern>>(patterns: I) -> Value {
    Value::Array(patterns.map(to_json).collect())
}

fn attributes_to_json(attributes: &BTreeMap<String, MatchValue>) -> Value {
    let map = attributes
        .iter()
        .map(|(name, value)| {
            let value = match value {
                MatchValue::Regex(regex) => Value::from(regex.as_str()),
                MatchValue::IntRange { min, max } => ObjectWriter(Map::new())
                    .field(KEY_MIN, *min)
                    .field(KEY_MAX, *max)
                    .finish(),
            };
            (name.clone(), value)
        })
        .collect();
    Value::Object(map)
}

fn relation_target_to_json(target: &RelationTarget) -> Value {
    let operator = target.operator_info();
    ObjectWriter::new(NT_RELATION_TARGET)
        .field(KEY_REL_TYPE, operator.type_regex())
        .field(KEY_CLAUSE, to_json(target.target()))
        .flag(KEY_NEGATE, operator.is_negate())
        .opt_field(
            KEY_REL_SPAN_MODE,
            Some(target.span_mode())
                .filter(|m| *m != SpanMode::default())
                .map(SpanMode::code),
        )
        .opt_field(
            KEY_DIRECTION,
            Some(operator.direction())
                .filter(|d| *d != RelationDirection::default())
                .map(RelationDirection::code),
        )
        .opt_field(KEY_CAPTURE, target.capture_as())
        .opt_field(KEY_SOURCE_VERSION, operator.source_version())
        .opt_field(KEY_TARGET_VERSION, operator.target_version())
        .flag(KEY_ALIGNMENT, operator.is_alignment())
        .flag(KEY_OPTIONAL, operator.is_optional())
        .finish()
}

/// Write a pattern as JSON.
pub fn to_json(pattern: &TextPattern) -> Value {
    match pattern {
        TextPattern::Term(t) | TextPattern::Regex(t) => {
            let node_type = if matches!(pattern, TextPattern::Term(_)) {
                NT_TERM
            } else {
                NT_REGEX
            };
            ObjectWriter::new(node_type)
                .field(KEY_VALUE, t.value())
                .opt_field(KEY_ANNOTATION, t.annotation())
                .sensitivity(t.sensitivity())
                .finish()
        }
        TextPattern::AnyToken(a) => ObjectWriter::new(NT_ANYTOKEN)
            .field(KEY_MIN, a.min())
            .max(a.max())
            .finish(),
        TextPattern::And(clauses) => ObjectWriter::new(NT_AND)
            .field(KEY_CLAUSES, patterns_to_json(clauses.iter()))
            .finish(),
        TextPattern::Or(clauses) => ObjectWriter::new(NT_OR)
            .field(KEY_CLAUSES, patterns_to_json(clauses.iter()))
            .finish(),
        TextPattern::Sequence(clauses) => ObjectWriter::new(NT_SEQUENCE)
            .field(KEY_CLAUSES, patterns_to_json(clauses.iter()))
            .finish(),
        TextPattern::Not(n) => ObjectWriter::new(NT_NOT)
            .field(KEY_CLAUSE, to_json(n.clause()))
            .finish(),
        TextPattern::Repetition(r) => ObjectWriter::new(NT_REPEAT)
            .field(KEY_CLAUSE, to_json(r.clause()))
            .field(KEY_MIN, r.min())
            .max(r.max())
            .finish(),
        TextPattern::Expansion(e) => ObjectWriter::new(NT_EXPANSION)
            .field(KEY_CLAUSE, to_json(e.clause()))
            .field(KEY_DIRECTION, e.direction().code())
            .field(KEY_MIN, e.min())
            .max(e.max())
            .finish(),
        TextPattern::PositionFilter(p) => ObjectWriter::new(NT_POSFILTER)
            .field(KEY_PRODUCER, to_json(p.producer()))
            .field(KEY_FILTER, to_json(p.filter()))
            .field(KEY_OPERATION, p.operation().code())
            .flag(KEY_INVERT, p.invert())
            .opt_field(KEY_ADJUST_LEADING, Some(p.adjust_leading()).filter(|a| *a != 0))
            .opt_field(KEY_ADJUST_TRAILING, Some(p.adjust_trailing()).filter(|a| *a != 0))
            .finish(),
        TextPattern::FilterNGrams(n) => ObjectWriter::new(NT_FILTERNGRAMS)
            .field(KEY_CLAUSE, to_json(n.clause()))
            .field(KEY_OPERATION, n.operation().code())
            .field(KEY_MIN, n.min())
            .max(n.max())
            .finish(),
        TextPattern::CaptureGroup(c) => ObjectWriter::new(NT_CAPTURE)
            .field(KEY_CLAUSE, to_json(c.clause()))
            .field(KEY_CAPTURE, c.capture_as())
            .finish(),
        TextPattern::Constrained(c) => ObjectWriter::new(NT_CONSTRAINED)
            .field(KEY_CLAUSE, to_json(c.clause()))
            .field(KEY_CONSTRAINT, filter_to_json(c.constraint()))
            .finish(),
        TextPattern::Edge(e) => ObjectWriter::new(NT_EDGE)
            .field(KEY_CLAUSE, to_json(e.clause()))
            .field(KEY_TRAILING_EDGE, e.trailing_edge())
            .finish(),
        TextPattern::FixedSpan(s) => ObjectWriter::new(NT_FIXEDSPAN)
            .field(KEY_START, s.start())
            .field(KEY_END, s.end())
            .finish(),
        TextPattern::Tags(t) => ObjectWriter::new(NT_TAGS)
            .field(KEY_NAME, t.element_name())
            .opt_field(
                KEY_ATTRIBUTES,
                Some(t.attributes())
                    .filter(|a| !a.is_empty())
                    .map(attributes_to_json),
            )
            .opt_field(
                KEY_ADJUST,
                Some(t.adjust())
                    .filter(|a| *a != TagAdjust::default())
                    .map(TagAdjust::code),
            )
            .opt_field(KEY_CAPTURE, t.capture_as())
            .finish(),
        TextPattern::RelationTarget(t) => relation_target_to_json(t),
        TextPattern::RelationMatch(m) => ObjectWriter::new(NT_RELATION_MATCH)
            .field(KEY_PARENT, to_json(m.parent()))
            .field(
                KEY_CHILDREN,
                Value::Array(m.children().iter().map(relation_target_to_json).collect()),
            )
            .finish(),
        TextPattern::RootRelationMatch(m) => ObjectWriter::new(NT_RELATION_MATCH)
            .field(
                KEY_CHILDREN,
                Value::Array(m.children().iter().map(relation_target_to_json).collect()),
            )
            .finish(),
        TextPattern::DefaultValue => ObjectWriter::new(NT_DEFVAL).finish(),
        TextPattern::DocVersion(d) => ObjectWriter::new(NT_DOCVERSION)
            .field(KEY_VERSION, d.version())
            .field(KEY_CLAUSE, to_json(d.clause()))
            .finish(),
        TextPattern::QueryFunctionCall(call) => {
            let args: Vec<Value> = call
                .args()
                .iter()
                .map(|arg| match arg {
                    FunctionArg::Pattern(p) => to_json(p),
                    FunctionArg::Str(s) => Value::from(s.as_str()),
                    FunctionArg::Int(i) => Value::from(*i),
                })
                .collect();
            ObjectWriter::new(NT_CALLFUNC)
                .field(KEY_NAME, call.name())
                .field(KEY_ARGS, args)
                .finish()
        }
        TextPattern::Settings(s) => {
            let settings: Map<String, Value> = s
                .settings()
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            ObjectWriter::new(NT_SETTINGS)
                .field(KEY_CLAUSE, to_json(s.clause()))
                .field(KEY_SETTINGS, settings)
                .finish()
        }
    }
}

fn pair_to_json(a: &MatchFilter, b: &MatchFilter) -> Value {
    Value::Array(vec![filter_to_json(a), filter_to_json(b)])
}

/// Write a match filter as JSON.
pub fn filter_to_json(filter: &MatchFilter) -> Value {
    match filter {
        MatchFilter::And(a, b) => ObjectWriter::new(MF_AND)
            .field(KEY_CLAUSES, pair_to_json(a, b))
            .finish(),
        MatchFilter::Or(a, b) => ObjectWriter::new(MF_OR)
            .field(KEY_CLAUSES, pair_to_json(a, b))
            .finish(),
        MatchFilter::Implication(a, b) => ObjectWriter::new(MF_IMPLICATION)
            .field(KEY_CLAUSES, pair_to_json(a, b))
            .finish(),
        MatchFilter::Not(a) => ObjectWriter::new(MF_NOT)
            .field(KEY_CLAUSE, filter_to_json(a))
            .finish(),
        MatchFilter::Compare {
            left,
            right,
            operator,
            sensitivity,
        } => ObjectWriter::new(MF_COMPARE)
            .field(KEY_CLAUSES, pair_to_json(left, right))
            .field(KEY_OPERATION, operator.symbol())
            .sensitivity(*sensitivity)
            .finish(),
        MatchFilter::Equals {
            left,
            right,
            sensitivity,
        } => ObjectWriter::new(MF_EQUALS)
            .field(KEY_CLAUSES, pair_to_json(left, right))
            .sensitivity(*sensitivity)
            .finish(),
        MatchFilter::SameTokens {
            capture_a,
            capture_b,
            annotation,
            sensitivity,
        } => ObjectWriter::new(MF_TOKEN_ANNOTATION_EQUAL)
            .field(KEY_CAPTURES, vec![capture_a.as_str(), capture_b.as_str()])
            .field(KEY_ANNOTATION, annotation.as_str())
            .sensitivity(*sensitivity)
            .finish(),
        MatchFilter::StringLiteral(value) => ObjectWriter::new(MF_STRING)
            .field(KEY_VALUE, value.as_str())
            .finish(),
        MatchFilter::TokenAnnotation {
            capture,
            annotation,
        } => ObjectWriter::new(MF_TOKEN_ANNOTATION)
            .field(KEY_CAPTURE, capture.as_str())
            .field(KEY_ANNOTATION, annotation.as_str())
            .finish(),
        MatchFilter::TokenAnnotationEqualsString {
            capture,
            annotation,
            value,
            sensitivity,
        } => ObjectWriter::new(MF_TOKEN_ANNOTATION_STRING)
            .field(KEY_CAPTURE, capture.as_str())
            .field(KEY_ANNOTATION, annotation.as_str())
            .field(KEY_VALUE, value.as_str())
            .sensitivity(*sensitivity)
            .finish(),
        MatchFilter::FunctionCall { name, capture } => ObjectWriter::new(MF_CALLFUNC)
            .field(KEY_NAME, name.as_str())
            .field(KEY_CAPTURE, capture.as_str())
            .finish(),
    }
}

/// Typed access to the fields of one node object.
struct ObjectReader<'v> {
    node_type: &'v str,
    map: &'v Map<String, Value>,
}

fn invalid(desc: String) -> QueryError {
    QueryError::InvalidJson(desc)
}

impl<'v> ObjectReader<'v> {
    fn new(value: &'v Value) -> Result<ObjectReader<'v>> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid(format!("expected a node object, got {}", value)))?;
        let node_type = map
            .get(KEY_TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("node object without '{}': {}", KEY_TYPE, value)))?;
        Ok(ObjectReader { node_type, map })
    }

    fn wrong_type(&self, key: &str, expected: &str) -> QueryError {
        invalid(format!(
            "{}: field '{}' must be {}",
            self.node_type, key, expected
        ))
    }

    fn value(&self, key: &str) -> Result<&'v Value> {
        self.map
            .get(key)
            .ok_or_else(|| invalid(format!("{}: missing field '{}'", self.node_type, key)))
    }

    fn opt_value(&self, key: &str) -> Option<&'v Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn str(&self, key: &str) -> Result<&'v str> {
        self.value(key)?
            .as_str()
            .ok_or_else(|| self.wrong_type(key, "a string"))
    }

    fn opt_str(&self, key: &str) -> Result<Option<&'v str>> {
        match self.opt_value(key) {
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, "a string")),
            None => Ok(None),
        }
    }

    fn int(&self, value: &Value, key: &str) -> Result<i64> {
        value
            .as_i64()
            .ok_or_else(|| self.wrong_type(key, "an integer"))
    }

    fn bound(&self, value: &Value, key: &str) -> Result<u32> {
        let n = self.int(value, key)?;
        if n < 0 {
            return Err(QueryError::construction(
                "bounds",
                format!("{}: field '{}' must not be negative", self.node_type, key),
            ));
        }
        u32::try_from(n).map_err(|_| self.wrong_type(key, "a 32-bit integer"))
    }

    fn u32(&self, key: &str) -> Result<u32> {
        self.bound(self.value(key)?, key)
    }

    fn max(&self) -> Result<u32> {
        match self.opt_value(KEY_MAX) {
            Some(v) => self.bound(v, KEY_MAX),
            None => Ok(UNLIMITED),
        }
    }

    fn opt_i32(&self, key: &str) -> Result<i32> {
        match self.opt_value(key) {
            Some(v) => i32::try_from(self.int(v, key)?)
                .map_err(|_| self.wrong_type(key, "a 32-bit integer")),
            None => Ok(0),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.opt_value(key) {
            Some(v) => v.as_bool().ok_or_else(|| self.wrong_type(key, "a boolean")),
            None => Ok(default),
        }
    }

    fn array(&self, key: &str) -> Result<&'v Vec<Value>> {
        self.value(key)?
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "an array"))
    }

    fn pair(&self, key: &str) -> Result<(&'v Value, &'v Value)> {
        match self.array(key)?.as_slice() {
            [a, b] => Ok((a, b)),
            other => Err(invalid(format!(
                "{}: field '{}' must have exactly 2 elements, has {}",
                self.node_type,
                key,
                other.len()
            ))),
        }
    }

    fn pattern(&self, key: &str) -> Result<TextPattern> {
        from_json(self.value(key)?)
    }

    fn patterns(&self, key: &str) -> Result<Vec<TextPattern>> {
        self.array(key)?.iter().map(from_json).collect()
    }

    fn filter(&self, key: &str) -> Result<MatchFilter> {
        filter_from_json(self.value(key)?)
    }

    fn filter_pair(&self, key: &str) -> Result<(MatchFilter, MatchFilter)> {
        let (a, b) = self.pair(key)?;
        Ok((filter_from_json(a)?, filter_from_json(b)?))
    }

    /// Parse an optional code field, using `default` if it is missing.
    fn code<T, F>(&self, key: &str, default: T, parse: F) -> Result<T>
    where
        F: Fn(&str) -> corpusql_core::errors::Result<T>,
    {
        match self.opt_str(key)? {
            Some(code) => parse(code).map_err(|e| invalid(format!("{}: {}", self.node_type, e))),
            None => Ok(default),
        }
    }

    fn required_code<T, F>(&self, key: &str, parse: F) -> Result<T>
    where
        F: Fn(&str) -> corpusql_core::errors::Result<T>,
    {
        let code = self.str(key)?;
        parse(code).map_err(|e| invalid(format!("{}: {}", self.node_type, e)))
    }

    fn sensitivity(&self) -> Result<Option<MatchSensitivity>> {
        match self.opt_str(KEY_SENSITIVITY)? {
            Some(code) => MatchSensitivity::from_code(code)
                .map(Some)
                .map_err(|e| invalid(format!("{}: {}", self.node_type, e))),
            None => Ok(None),
        }
    }

    fn attributes(&self) -> Result<BTreeMap<String, MatchValue>> {
        let map = match self.opt_value(KEY_ATTRIBUTES) {
            Some(v) => v
                .as_object()
                .ok_or_else(|| self.wrong_type(KEY_ATTRIBUTES, "an object"))?,
            None => return Ok(BTreeMap::new()),
        };
        let mut result = BTreeMap::new();
        for (name, value) in map.iter() {
            let value = match value {
                Value::String(regex) => MatchValue::Regex(regex.clone()),
                Value::Object(range) => {
                    let bound = |key: &str| {
                        range
                            .get(key)
                            .and_then(Value::as_i64)
                            .ok_or_else(|| self.wrong_type(KEY_ATTRIBUTES, "strings or integer ranges"))
                    };
                    MatchValue::int_range(bound(KEY_MIN)?, bound(KEY_MAX)?)?
                }
                _ => return Err(self.wrong_type(KEY_ATTRIBUTES, "strings or integer ranges")),
            };
            result.insert(name.clone(), value);
        }
        Ok(result)
    }

    fn settings(&self) -> Result<BTreeMap<String, String>> {
        let map = self
            .value(KEY_SETTINGS)?
            .as_object()
            .ok_or_else(|| self.wrong_type(KEY_SETTINGS, "an object"))?;
        Ok(map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k.clone(), s.clone()),
                other => (k.clone(), other.to_string()),
            })
            .collect())
    }

    fn function_args(&self) -> Result<Vec<FunctionArg>> {
        self.array(KEY_ARGS)?
            .iter()
            .map(|arg| match arg {
                Value::String(s) => Ok(FunctionArg::Str(s.clone())),
                Value::Number(_) => Ok(FunctionArg::Int(self.int(arg, KEY_ARGS)?)),
                Value::Object(_) => Ok(FunctionArg::Pattern(from_json(arg)?)),
                _ => Err(self.wrong_type(KEY_ARGS, "patterns, strings or integers")),
            })
            .collect()
    }
}

fn relation_target_from_json(value: &Value) -> Result<RelationTarget> {
    let reader = ObjectReader::new(value)?;
    if reader.node_type != NT_RELATION_TARGET {
        return Err(invalid(format!(
            "relation match children must be '{}' nodes, got '{}'",
            NT_RELATION_TARGET, reader.node_type
        )));
    }
    let operator = RelationOperatorInfo::new(
        reader.opt_str(KEY_REL_TYPE)?.unwrap_or(""),
        reader.code(KEY_DIRECTION, RelationDirection::default(), RelationDirection::from_code)?,
        reader.opt_str(KEY_TARGET_VERSION)?,
        reader.bool_or(KEY_NEGATE, false)?,
        reader.bool_or(KEY_ALIGNMENT, false)?,
        reader.bool_or(KEY_OPTIONAL, false)?,
    )?
    .with_source_version(reader.opt_str(KEY_SOURCE_VERSION)?);
    RelationTarget::new(
        operator,
        reader.pattern(KEY_CLAUSE)?,
        reader.code(KEY_REL_SPAN_MODE, SpanMode::default(), SpanMode::from_code)?,
        reader.opt_str(KEY_CAPTURE)?,
    )
}

/// Read a pattern from JSON.
pub fn from_json(value: &Value) -> Result<TextPattern> {
    let r = ObjectReader::new(value)?;
    let pattern = match r.node_type {
        NT_TERM => TextPattern::term_with(r.str(KEY_VALUE)?, r.opt_str(KEY_ANNOTATION)?, r.sensitivity()?),
        NT_REGEX => {
            TextPattern::regex_with(r.str(KEY_VALUE)?, r.opt_str(KEY_ANNOTATION)?, r.sensitivity()?)
        }
        NT_ANYTOKEN => TextPattern::any_token(r.u32(KEY_MIN)?, r.max()?)?,
        NT_AND => TextPattern::and(r.patterns(KEY_CLAUSES)?)?,
        NT_OR => TextPattern::or(r.patterns(KEY_CLAUSES)?)?,
        NT_SEQUENCE => TextPattern::sequence(r.patterns(KEY_CLAUSES)?)?,
        NT_NOT => TextPattern::not(r.pattern(KEY_CLAUSE)?)?,
        NT_REPEAT => TextPattern::repetition(r.pattern(KEY_CLAUSE)?, r.u32(KEY_MIN)?, r.max()?)?,
        NT_EXPANSION => TextPattern::expansion(
            r.pattern(KEY_CLAUSE)?,
            r.required_code(KEY_DIRECTION, ExpansionDirection::from_code)?,
            r.u32(KEY_MIN)?,
            r.max()?,
        )?,
        NT_POSFILTER => TextPattern::position_filter_adjusted(
            r.pattern(KEY_PRODUCER)?,
            r.pattern(KEY_FILTER)?,
            r.required_code(KEY_OPERATION, PositionOperation::from_code)?,
            r.bool_or(KEY_INVERT, false)?,
            r.opt_i32(KEY_ADJUST_LEADING)?,
            r.opt_i32(KEY_ADJUST_TRAILING)?,
        ),
        NT_FILTERNGRAMS => TextPattern::filter_ngrams(
            r.pattern(KEY_CLAUSE)?,
            r.required_code(KEY_OPERATION, PositionOperation::from_code)?,
            r.u32(KEY_MIN)?,
            r.max()?,
        )?,
        NT_CAPTURE => TextPattern::capture(r.pattern(KEY_CLAUSE)?, r.str(KEY_CAPTURE)?)?,
        NT_CONSTRAINED => {
            TextPattern::constrained(r.pattern(KEY_CLAUSE)?, r.filter(KEY_CONSTRAINT)?)
        }
        NT_EDGE => TextPattern::edge(r.pattern(KEY_CLAUSE)?, r.bool_or(KEY_TRAILING_EDGE, false)?),
        NT_FIXEDSPAN => TextPattern::fixed_span(r.u32(KEY_START)?, r.u32(KEY_END)?)?,
        NT_TAGS => TextPattern::tags(
            r.str(KEY_NAME)?,
            r.attributes()?,
            r.code(KEY_ADJUST, TagAdjust::default(), TagAdjust::from_code)?,
            r.opt_str(KEY_CAPTURE)?,
        )?,
        NT_RELATION_TARGET => TextPattern::relation_target(relation_target_from_json(value)?),
        NT_RELATION_MATCH => {
            let children = r
                .array(KEY_CHILDREN)?
                .iter()
                .map(relation_target_from_json)
                .collect::<Result<Vec<_>>>()?;
            match r.opt_value(KEY_PARENT) {
                Some(parent) => TextPattern::relation_match(from_json(parent)?, children)?,
                None => TextPattern::root_relation_match(children)?,
            }
        }
        NT_DEFVAL => TextPattern::default_value(),
        NT_DOCVERSION => TextPattern::doc_version(r.pattern(KEY_CLAUSE)?, r.str(KEY_VERSION)?)?,
        NT_CALLFUNC => TextPattern::function_call(r.str(KEY_NAME)?, r.function_args()?)?,
        NT_SETTINGS => TextPattern::settings(r.pattern(KEY_CLAUSE)?, r.settings()?),
        other if DEPRECATED_TYPES.contains(&other) => {
            return Err(invalid(format!(
                "node type '{}' is deprecated and no longer supported",
                other
            )))
        }
        other => return Err(invalid(format!("unknown node type '{}'", other))),
    };
    Ok(pattern)
}

/// Read a match filter from JSON.
pub fn filter_from_json<'a>(value: &'a Value) -> Result<MatchFilter> {
    let r = ObjectReader::new(value)?;
    let filter = match r.node_type {
        MF_AND => {
            let (a, b) = r.filter_pair(KEY_CLAUSES)?;
            MatchFilter::and(a, b)
        }
        MF_OR => {
            let (a, b) = r.filter_pair(KEY_CLAUSES)?;
            MatchFilter::or(a, b)
        }
        MF_IMPLICATION => {
            let (a, b) = r.filter_pair(KEY_CLAUSES)?;
            MatchFilter::implication(a, b)
        }
        MF_NOT => MatchFilter::not(r.filter(KEY_CLAUSE)?),
        MF_COMPARE => {
            let (a, b) = r.filter_pair(KEY_CLAUSES)?;
            let symbol = r.str(KEY_OPERATION)?;
            let operator = CompareOperator::from_str(symbol).map_err(|_| {
                invalid(format!("{}: unknown comparison operator '{}'", r.node_type, symbol))
            })?;
            MatchFilter::compare(a, b, operator, r.sensitivity()?)
        }
        MF_EQUALS => {
            let (a, b) = r.filter_pair(KEY_CLAUSES)?;
            MatchFilter::equals(a, b, r.sensitivity()?)
        }
        MF_TOKEN_ANNOTATION_EQUAL => {
            let (a, b) = r.pair(KEY_CAPTURES)?;
            let capture = |v: &'a Value| -> Result<&'a str> {
                v.as_str()
                    .ok_or_else(|| r.wrong_type(KEY_CAPTURES, "an array of strings"))
            };
            MatchFilter::same_tokens(
                capture(a)?,
                capture(b)?,
                r.str(KEY_ANNOTATION)?,
                r.sensitivity()?,
            )
        }
        MF_STRING => MatchFilter::string(r.str(KEY_VALUE)?),
        MF_TOKEN_ANNOTATION => {
            MatchFilter::token_annotation(r.str(KEY_CAPTURE)?, r.str(KEY_ANNOTATION)?)
        }
        MF_TOKEN_ANNOTATION_STRING => MatchFilter::token_annotation_equals(
            r.str(KEY_CAPTURE)?,
            r.str(KEY_ANNOTATION)?,
            r.str(KEY_VALUE)?,
            r.sensitivity()?,
        ),
        MF_CALLFUNC => MatchFilter::function_call(r.str(KEY_NAME)?, r.str(KEY_CAPTURE)?),
        other => return Err(invalid(format!("unknown match filter type '{}'", other))),
    };
    Ok(filter)
}
