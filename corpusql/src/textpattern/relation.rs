use super::TextPattern;
use crate::errors::{QueryError, Result};
use corpusql_core::{
    types::{RelationDirection, SpanMode},
    util::fieldname::{
        class_and_type, full_type_regex, parallel_field_version, ANY_TYPE_REGEX,
    },
};

/// Describes a relation operator like `-nsubj->`, `!-obj->`, `^-->` or `=al=>nl?`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationOperatorInfo {
    type_regex: String,
    direction: RelationDirection,
    source_version: Option<String>,
    target_version: Option<String>,
    negate: bool,
    alignment: bool,
    optional: bool,
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl RelationOperatorInfo {
    pub fn new(
        type_regex: &str,
        direction: RelationDirection,
        target_version: Option<&str>,
        negate: bool,
        alignment: bool,
        optional: bool,
    ) -> Result<RelationOperatorInfo> {
        if alignment && negate {
            return Err(QueryError::construction(
                "relation operator",
                "alignment operator cannot be negated",
            ));
        }
        if optional && !alignment {
            return Err(QueryError::construction(
                "relation operator",
                "only alignment operators can be optional",
            ));
        }
        if direction == RelationDirection::Root && (alignment || negate) {
            return Err(QueryError::construction(
                "relation operator",
                "root relation operator cannot be negated or an alignment operator",
            ));
        }
        let type_regex = if type_regex.is_empty() {
            ANY_TYPE_REGEX
        } else {
            type_regex
        };
        Ok(RelationOperatorInfo {
            type_regex: type_regex.to_string(),
            direction,
            source_version: None,
            target_version: target_version.filter(|v| !v.is_empty()).map(String::from),
            negate,
            alignment,
            optional,
        })
    }

    /// Operator for a regular (non-negated, non-alignment) relation of the given type.
    pub fn of_type(type_regex: &str) -> RelationOperatorInfo {
        RelationOperatorInfo {
            type_regex: if type_regex.is_empty() {
                ANY_TYPE_REGEX.to_string()
            } else {
                type_regex.to_string()
            },
            direction: RelationDirection::Both,
            source_version: None,
            target_version: None,
            negate: false,
            alignment: false,
            optional: false,
        }
    }

    pub fn with_source_version(mut self, version: Option<&str>) -> RelationOperatorInfo {
        self.source_version = version.filter(|v| !v.is_empty()).map(String::from);
        self
    }

    /// Parse an operator string.
    ///
    /// A trailing `?` marks an optional match, a leading `^` a root relation
    /// and a leading `!` a negated relation. The relation type regex is given
    /// between the dashes (or equal signs for alignment operators), the target
    /// version after the `>`.
    pub fn from_operator(operator: &str) -> Result<RelationOperatorInfo> {
        let mut op = operator;
        let optional = if let Some(rest) = op.strip_suffix('?') {
            op = rest;
            true
        } else {
            false
        };
        let direction = if let Some(rest) = op.strip_prefix('^') {
            op = rest;
            RelationDirection::Root
        } else {
            RelationDirection::Both
        };
        let alignment = op.contains("=>");
        let negate = if let Some(rest) = op.strip_prefix('!') {
            op = rest;
            true
        } else {
            false
        };

        let invalid = || QueryError::InvalidQuery(format!("invalid relation operator: {}", operator));
        if !(op.starts_with('-') || op.starts_with('=')) {
            return Err(invalid());
        }
        let arrow = op.rfind('>').ok_or_else(invalid)?;
        let target_version = &op[arrow + 1..];
        if arrow < 2 || !target_version.chars().all(is_version_char) {
            return Err(invalid());
        }
        let before_arrow = &op[..arrow];
        if !(before_arrow.ends_with('-') || before_arrow.ends_with('=')) {
            return Err(invalid());
        }
        let type_regex = &before_arrow[1..before_arrow.len() - 1];

        RelationOperatorInfo::new(
            type_regex,
            direction,
            Some(target_version),
            negate,
            alignment,
            optional,
        )
    }

    pub fn type_regex(&self) -> &str {
        &self.type_regex
    }

    pub fn direction(&self) -> RelationDirection {
        self.direction
    }

    pub fn source_version(&self) -> Option<&str> {
        self.source_version.as_deref()
    }

    pub fn target_version(&self) -> Option<&str> {
        self.target_version.as_deref()
    }

    pub fn is_negate(&self) -> bool {
        self.negate
    }

    pub fn is_alignment(&self) -> bool {
        self.alignment
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_root(&self) -> bool {
        self.direction == RelationDirection::Root
    }

    /// Get the full relation type regex (class and type).
    ///
    /// Types without a class get `default_class`, usually the regex matching
    /// any class that is not internal. A target version is added to the
    /// relation class.
    pub fn full_type_regex(&self, default_class: &str) -> String {
        let (relation_class, relation_type) = match class_and_type(&self.type_regex) {
            (Some(relation_class), relation_type) => (relation_class, relation_type),
            (None, relation_type) => (default_class, relation_type),
        };
        match &self.target_version {
            Some(version) => {
                full_type_regex(&parallel_field_version(relation_class, version), relation_type)
            }
            None => full_type_regex(relation_class, relation_type),
        }
    }

    /// Write this operator in query language syntax.
    pub fn to_operator(&self) -> String {
        let mut result = String::new();
        if self.is_root() {
            result.push('^');
        } else if self.negate {
            result.push('!');
        }
        let dash = if self.alignment { '=' } else { '-' };
        result.push(dash);
        if self.type_regex != ANY_TYPE_REGEX {
            result.push_str(&self.type_regex);
        }
        result.push(dash);
        result.push('>');
        if let Some(version) = &self.target_version {
            result.push_str(version);
        }
        if self.optional {
            result.push('?');
        }
        result
    }
}

/// A relation from the current span to a target matching a pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationTarget {
    operator_info: RelationOperatorInfo,
    target: Box<TextPattern>,
    span_mode: SpanMode,
    capture_as: Option<String>,
}

impl RelationTarget {
    pub fn new(
        operator_info: RelationOperatorInfo,
        target: TextPattern,
        span_mode: SpanMode,
        capture_as: Option<&str>,
    ) -> Result<RelationTarget> {
        if operator_info.is_root() && span_mode == SpanMode::Source {
            return Err(QueryError::construction(
                "relation target",
                "root relations have no source span",
            ));
        }
        Ok(RelationTarget {
            operator_info,
            target: Box::new(target),
            span_mode,
            capture_as: capture_as.filter(|c| !c.is_empty()).map(String::from),
        })
    }

    pub fn operator_info(&self) -> &RelationOperatorInfo {
        &self.operator_info
    }

    pub fn target(&self) -> &TextPattern {
        &self.target
    }

    pub fn span_mode(&self) -> SpanMode {
        self.span_mode
    }

    pub fn capture_as(&self) -> Option<&str> {
        self.capture_as.as_deref()
    }
}
