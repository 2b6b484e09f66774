//! Compile a [`TextPattern`] into a [`SpanQuery`] plan.

use crate::config::{CompilerConfiguration, LimitsConfiguration};
use crate::context::{CaptureRegistry, ExecutionContext};
use crate::errors::{QueryError, Result};
use crate::extensions::{
    relation_match_query, relation_query, ArgType, ArgValue, FunctionContext, QueryExtensions,
};
use crate::matchfilter::ConstraintExpr;
use crate::plan::{AlignmentTarget, ForwardIndexRequest, SpanQuery};
use crate::textpattern::{
    rewrite::replace_with_any_token, Constrained, FunctionArg, MatchValue, QueryFunctionCall,
    RelationTarget, Tags, TermPattern, TextPattern,
};
use corpusql_core::{
    types::PositionOperation,
    util::{
        desensitize_regex, fieldname::capture_name_for_relation_type,
        fieldname::full_type_regex, fieldname::CLASS_INLINE_TAG, regex_full_match,
        split_sensitivity_prefix, strip_anchors,
    },
};
use std::collections::BTreeSet;


/// A translation session.
///
/// The capture names used in the plan are tracked per call to
/// [`translate`](Translator::translate); a translator can be reused for
/// several queries, but not concurrently.
pub struct Translator<'e> {
    extensions: &'e QueryExtensions,
    limits: LimitsConfiguration,
    captures: CaptureRegistry,
    rewrite: bool,
    depth: usize,
}

/// Translate a pattern using the built-in query extensions.
pub fn translate(
    pattern: &TextPattern,
    context: &ExecutionContext,
    config: &CompilerConfiguration,
) -> Result<SpanQuery> {
    let extensions = QueryExtensions::default();
    Translator::new(&extensions, &config.limits).translate(pattern, context)
}

impl<'e> Translator<'e> {
    pub fn new(extensions: &'e QueryExtensions, limits: &LimitsConfiguration) -> Translator<'e> {
        Translator {
            extensions,
            limits: limits.clone(),
            captures: CaptureRegistry::new(),
            rewrite: true,
            depth: 0,
        }
    }

    /// Translate nodes as they are, without simplifying them first.
    pub fn without_rewriting(mut self) -> Translator<'e> {
        self.rewrite = false;
        self
    }

    pub fn translate(
        &mut self,
        pattern: &TextPattern,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        self.captures = CaptureRegistry::new();
        self.depth = 0;
        for name in pattern.explicit_capture_names() {
            self.captures.reserve(&name);
        }
        let result = self.translate_node(pattern, context)?;
        debug!("Translated {} to {}", pattern.kind(), result);
        Ok(result)
    }

    fn translate_node(
        &mut self,
        pattern: &TextPattern,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        if self.rewrite {
            if let Some(rewritten) = pattern.rewrite() {
                return self.translate_node(&rewritten, context);
            }
        }
        self.depth += 1;
        if self.depth > self.limits.max_pattern_depth {
            return Err(QueryError::PatternTooLarge(format!(
                "pattern is nested more than {} levels deep",
                self.limits.max_pattern_depth
            )));
        }
        trace!("Translating {} (depth {})", pattern.kind(), self.depth);
        let result = self.translate_kind(pattern, context);
        self.depth -= 1;
        result
    }

    fn translate_all<'p, I>(&mut self, clauses: I, context: &ExecutionContext) -> Result<Vec<SpanQuery>>
    where
        I: Iterator<Item = &'p TextPattern>,
    {
        clauses.map(|c| self.translate_node(c, context)).collect()
    }

    fn translate_kind(
        &mut self,
        pattern: &TextPattern,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        let field = context.field_name();
        let result = match pattern {
            TextPattern::Term(t) => {
                let context = term_context(t, context)?;
                SpanQuery::Term {
                    field: context.index_field()?,
                    value: context.desensitize(t.value())?,
                }
            }
            TextPattern::Regex(t) => self.translate_regex(t, context)?,
            TextPattern::AnyToken(a) => SpanQuery::AnyToken {
                field,
                min: a.min(),
                max: a.max(),
            },
            TextPattern::And(clauses) => SpanQuery::And(self.translate_all(clauses.iter(), context)?),
            TextPattern::Or(clauses) => SpanQuery::Or(self.translate_all(clauses.iter(), context)?),
            TextPattern::Sequence(clauses) => {
                SpanQuery::Sequence(self.translate_all(clauses.iter(), context)?)
            }
            TextPattern::Not(n) => SpanQuery::Not {
                field,
                clause: Box::new(self.translate_node(n.clause(), context)?),
            },
            TextPattern::Repetition(r) => SpanQuery::Repetition {
                field,
                clause: Box::new(self.translate_node(r.clause(), context)?),
                min: r.min(),
                max: r.max(),
            },
            TextPattern::Expansion(e) => SpanQuery::Expansion {
                field,
                clause: Box::new(self.translate_node(e.clause(), context)?),
                direction: e.direction(),
                min: e.min(),
                max: e.max(),
            },
            TextPattern::PositionFilter(p) => SpanQuery::PositionFilter {
                producer: Box::new(self.translate_node(p.producer(), context)?),
                filter: Box::new(self.translate_node(p.filter(), context)?),
                operation: p.operation(),
                invert: p.invert(),
                adjust_leading: p.adjust_leading(),
                adjust_trailing: p.adjust_trailing(),
            },
            TextPattern::FilterNGrams(n) => SpanQuery::FilterNGrams {
                field,
                clause: Box::new(self.translate_node(n.clause(), context)?),
                operation: n.operation(),
                min: n.min(),
                max: n.max(),
            },
            TextPattern::CaptureGroup(c) => SpanQuery::CaptureGroup {
                clause: Box::new(self.translate_node(c.clause(), context)?),
                name: c.capture_as().to_string(),
            },
            TextPattern::Constrained(c) => self.translate_constrained(c, context)?,
            TextPattern::Edge(e) => SpanQuery::Edge {
                clause: Box::new(self.translate_node(e.clause(), context)?),
                trailing: e.trailing_edge(),
            },
            TextPattern::FixedSpan(s) => SpanQuery::FixedSpan {
                field,
                start: s.start(),
                end: s.end(),
            },
            TextPattern::Tags(t) => self.translate_tags(t, context)?,
            TextPattern::RelationTarget(t) => {
                if t.operator_info().is_alignment() {
                    return Err(QueryError::InvalidQuery(
                        "alignment operator needs a source to align from".to_string(),
                    ));
                }
                let relation = self.translate_relation_target(t, context)?;
                if t.operator_info().is_negate() {
                    negated_relation(SpanQuery::AnyToken { field, min: 1, max: 1 }, relation)
                } else {
                    relation
                }
            }
            TextPattern::RelationMatch(m) => {
                let parent = self.translate_node(m.parent(), context)?;
                self.translate_relation_children(parent, m.children(), context)?
            }
            TextPattern::RootRelationMatch(m) => {
                let parent = SpanQuery::any_ngram(&field);
                self.translate_relation_children(parent, m.children(), context)?
            }
            TextPattern::DefaultValue => {
                return Err(QueryError::InvalidQuery(
                    "default value '_' is only allowed as a relation or function operand"
                        .to_string(),
                ))
            }
            TextPattern::DocVersion(d) => {
                let context = context.with_doc_version(Some(d.version()))?;
                self.translate_node(d.clause(), &context)?
            }
            TextPattern::QueryFunctionCall(call) => self.translate_function_call(call, context)?,
            TextPattern::Settings(s) => self.translate_node(s.clause(), context)?,
        };
        Ok(result)
    }

    /// Validate a regex against the configured limits.
    fn check_regex(&self, pattern: &str) -> Result<()> {
        let nest_limit = self.limits.regex_nest_limit;
        let mut parser = regex_syntax::ParserBuilder::new()
            .nest_limit(nest_limit)
            .build();
        if let Err(e) = parser.parse(pattern) {
            return Err(match &e {
                regex_syntax::Error::Parse(ast_error)
                    if matches!(
                        ast_error.kind(),
                        regex_syntax::ast::ErrorKind::NestLimitExceeded(_)
                    ) =>
                {
                    QueryError::PatternTooLarge(format!(
                        "regular expression is nested more than {} levels deep",
                        nest_limit
                    ))
                }
                _ => QueryError::InvalidQuery(format!("invalid regular expression: {}", e)),
            });
        }
        let compiled = regex::RegexBuilder::new(&regex_full_match(pattern))
            .size_limit(self.limits.regex_size_limit)
            .build();
        match compiled {
            Ok(_) => Ok(()),
            Err(regex::Error::CompiledTooBig(limit)) => Err(QueryError::PatternTooLarge(format!(
                "regular expression exceeds the size limit of {} bytes",
                limit
            ))),
            Err(e) => Err(QueryError::InvalidQuery(format!(
                "invalid regular expression: {}",
                e
            ))),
        }
    }

    fn translate_regex(&self, t: &TermPattern, context: &ExecutionContext) -> Result<SpanQuery> {
        let mut context = term_context(t, context)?;
        let (forced, pattern) = split_sensitivity_prefix(t.value());
        if forced.is_some() {
            context = context.with_annotation_and_sensitivity(None, forced)?;
        }
        let pattern = strip_anchors(pattern);
        self.check_regex(pattern)?;
        Ok(SpanQuery::Regex {
            field: context.index_field()?,
            pattern: desensitize_regex(pattern, context.sensitivity()?),
        })
    }

    fn translate_constrained(
        &mut self,
        c: &Constrained,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        let clause = self.translate_node(c.clause(), context)?;
        let defined = clause.capture_names();
        for name in c.constraint().referenced_captures() {
            if !defined.contains(name) {
                return Err(QueryError::InvalidQuery(format!(
                    "constraint refers to unknown capture '{}'",
                    name
                )));
            }
        }
        let mut annotations = BTreeSet::new();
        let constraint =
            ConstraintExpr::translate(c.constraint(), context, self.extensions, &mut annotations)?;
        Ok(SpanQuery::Constrained {
            clause: Box::new(clause),
            constraint,
            forward_index: ForwardIndexRequest {
                field: context.field_name(),
                annotations,
            },
        })
    }

    fn translate_tags(&mut self, t: &Tags, context: &ExecutionContext) -> Result<SpanQuery> {
        for value in t.attributes().values() {
            if let MatchValue::Regex(regex) = value {
                self.check_regex(regex)?;
            }
        }
        let relations_field = context.with_relation_annotation()?.index_field()?;
        let capture_as = match t.capture_as() {
            Some(c) => c.to_string(),
            None => {
                let name = self.captures.ensure_unique(t.element_name());
                debug!("Capturing tag {} as {}", t.element_name(), name);
                name
            }
        };
        Ok(SpanQuery::Tags {
            relations_field,
            type_regex: full_type_regex(CLASS_INLINE_TAG, t.element_name()),
            attributes: t.attributes().clone(),
            adjust: t.adjust(),
            capture_as,
        })
    }

    fn source_context<'a>(
        t: &RelationTarget,
        context: &ExecutionContext<'a>,
    ) -> Result<ExecutionContext<'a>> {
        match t.operator_info().source_version() {
            Some(version) => context.with_doc_version(Some(version)),
            None => Ok(context.clone()),
        }
    }

    fn target_context<'a>(
        t: &RelationTarget,
        context: &ExecutionContext<'a>,
    ) -> Result<ExecutionContext<'a>> {
        match t.operator_info().target_version() {
            Some(version) => context.with_doc_version(Some(version)),
            None => Ok(context.clone()),
        }
    }

    fn translate_relation_target(
        &mut self,
        t: &RelationTarget,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        let source_context = Self::source_context(t, context)?;
        let target_context = Self::target_context(t, &source_context)?;
        let target = self.translate_node(&replace_with_any_token(t.target()), &target_context)?;
        let operator = t.operator_info();
        relation_query(
            &source_context,
            &mut self.captures,
            &operator.full_type_regex(source_context.default_relation_class()),
            Some(target).filter(|q| !q.is_any_ngram()),
            operator.direction(),
            t.span_mode(),
            t.capture_as(),
        )
    }

    fn translate_alignment_target(
        &mut self,
        t: &RelationTarget,
        context: &ExecutionContext,
    ) -> Result<AlignmentTarget> {
        let source_context = Self::source_context(t, context)?;
        let target_context = Self::target_context(t, &source_context)?;
        let target = self.translate_node(&replace_with_any_token(t.target()), &target_context)?;
        let operator = t.operator_info();
        let type_regex = operator.full_type_regex(source_context.default_relation_class());
        crate::extensions::check_relation_type(&type_regex)?;
        let capture_as = match t.capture_as() {
            Some(c) => c.to_string(),
            None => {
                let name = self
                    .captures
                    .ensure_unique(&capture_name_for_relation_type(operator.type_regex()));
                debug!("Capturing alignment {} as {}", type_regex, name);
                name
            }
        };
        Ok(AlignmentTarget {
            relations_field: source_context.with_relation_annotation()?.index_field()?,
            type_regex,
            target: Box::new(target),
            target_field: target_context.field_name(),
            capture_as,
            optional: operator.is_optional(),
        })
    }

    /// Combine a parent span with the relations that must (or must not) start in it.
    fn translate_relation_children(
        &mut self,
        parent: SpanQuery,
        children: &[RelationTarget],
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        let mut clauses = vec![parent];
        let mut negated = Vec::new();
        let mut alignments = Vec::new();
        for child in children {
            if child.operator_info().is_alignment() {
                alignments.push(self.translate_alignment_target(child, context)?);
            } else if child.operator_info().is_negate() {
                negated.push(self.translate_relation_target(child, context)?);
            } else {
                clauses.push(self.translate_relation_target(child, context)?);
            }
        }
        let mut result = relation_match_query(&context.field_name(), clauses);
        for relation in negated {
            result = negated_relation(result, relation);
        }
        if !alignments.is_empty() {
            result = SpanQuery::CaptureRelationsBetweenSpans {
                source: Box::new(result),
                targets: alignments,
            };
        }
        Ok(result)
    }

    fn translate_function_call(
        &mut self,
        call: &QueryFunctionCall,
        context: &ExecutionContext,
    ) -> Result<SpanQuery> {
        let extensions = self.extensions;
        let function = extensions.function(call.name()).ok_or_else(|| {
            QueryError::InvalidQuery(format!("unknown function '{}'", call.name()))
        })?;
        let mut args = Vec::with_capacity(call.args().len());
        for (i, arg) in call.args().iter().enumerate() {
            let expected = function.arg_type(i).ok_or_else(|| {
                QueryError::InvalidQuery(format!(
                    "too many arguments for function {}",
                    call.name()
                ))
            })?;
            let value = match (arg, expected) {
                (FunctionArg::Pattern(TextPattern::DefaultValue), _) => None,
                (FunctionArg::Pattern(p), ArgType::Query) => {
                    Some(ArgValue::Query(self.translate_node(p, context)?))
                }
                (FunctionArg::Str(s), ArgType::Str) => Some(ArgValue::Str(s.clone())),
                (FunctionArg::Int(n), ArgType::Int) => Some(ArgValue::Int(*n)),
                (FunctionArg::Int(n), ArgType::Str) => Some(ArgValue::Str(n.to_string())),
                (FunctionArg::Str(s), ArgType::Int) => {
                    Some(ArgValue::Int(s.trim().parse().map_err(|_| {
                        QueryError::InvalidQuery(format!(
                            "function {}: argument {} must be an integer",
                            call.name(),
                            i + 1
                        ))
                    })?))
                }
                (_, expected) => {
                    return Err(QueryError::InvalidQuery(format!(
                        "function {}: argument {} has the wrong type, expected {:?}",
                        call.name(),
                        i + 1,
                        expected
                    )))
                }
            };
            args.push(value);
        }
        let args = function.complete_args(args, context)?;
        let mut function_context = FunctionContext {
            context,
            captures: &mut self.captures,
        };
        (function.function)(&mut function_context, &args)
    }
}

/// Parent spans that are not the source of the given relation.
fn negated_relation(parent: SpanQuery, relation: SpanQuery) -> SpanQuery {
    SpanQuery::PositionFilter {
        producer: Box::new(parent),
        filter: Box::new(relation),
        operation: PositionOperation::Matches,
        invert: true,
        adjust_leading: 0,
        adjust_trailing: 0,
    }
}

fn term_context<'a>(t: &TermPattern, context: &ExecutionContext<'a>) -> Result<ExecutionContext<'a>> {
    context.with_annotation_and_sensitivity(t.annotation(), t.sensitivity())
}
