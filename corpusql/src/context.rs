//! Defaults that are resolved while translating a pattern.

use crate::config::CompilerConfiguration;
use crate::errors::{QueryError, Result};
use crate::metadata::{AnnotatedFieldDesc, IndexMetadata};
use corpusql_core::{
    types::MatchSensitivity,
    util::fieldname::{annotation_field, parallel_field_version, RELATION_ANNOTATION},
};
use std::collections::BTreeSet;

/// The field, annotation, sensitivity and document version that apply to
/// the part of the pattern currently being translated.
///
/// Contexts are cheap to derive from each other; nested nodes that change a
/// default (an explicit annotation, a document version, ...) translate their
/// children in a derived context.
#[derive(Clone)]
pub struct ExecutionContext<'a> {
    index: &'a dyn IndexMetadata,
    field: String,
    version: Option<String>,
    annotation: String,
    sensitivity: MatchSensitivity,
    relation_annotation: bool,
    default_relation_class: String,
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("field", &self.field)
            .field("version", &self.version)
            .field("annotation", &self.annotation)
            .field("sensitivity", &self.sensitivity)
            .field("relation_annotation", &self.relation_annotation)
            .field("default_relation_class", &self.default_relation_class)
            .finish_non_exhaustive()
    }
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        index: &'a dyn IndexMetadata,
        field: &str,
        annotation: &str,
        sensitivity: MatchSensitivity,
    ) -> Result<ExecutionContext<'a>> {
        let context = ExecutionContext {
            index,
            field: field.to_string(),
            version: None,
            annotation: annotation.to_string(),
            sensitivity,
            relation_annotation: false,
            default_relation_class: crate::config::DefaultsConfiguration::default().relation_class,
        };
        context.check_annotation(annotation)?;
        Ok(context)
    }

    pub fn from_config(
        index: &'a dyn IndexMetadata,
        config: &CompilerConfiguration,
    ) -> Result<ExecutionContext<'a>> {
        let defaults = &config.defaults;
        let context = ExecutionContext::new(
            index,
            &defaults.field,
            &defaults.annotation,
            defaults.sensitivity,
        )?;
        Ok(context.with_default_relation_class(&defaults.relation_class))
    }

    pub fn index(&self) -> &'a dyn IndexMetadata {
        self.index
    }

    /// Name of the annotated field, including the document version (if any).
    pub fn field_name(&self) -> String {
        match &self.version {
            Some(version) => parallel_field_version(&self.field, version),
            None => self.field.clone(),
        }
    }

    /// Name of the annotated field without document version.
    pub fn base_field(&self) -> &str {
        &self.field
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn annotation(&self) -> &str {
        if self.relation_annotation {
            RELATION_ANNOTATION
        } else {
            &self.annotation
        }
    }

    pub fn requested_sensitivity(&self) -> MatchSensitivity {
        self.sensitivity
    }

    pub fn default_relation_class(&self) -> &str {
        &self.default_relation_class
    }

    pub fn field_desc(&self) -> Result<&'a AnnotatedFieldDesc> {
        let name = self.field_name();
        self.index
            .annotated_field(&name)
            .ok_or_else(|| QueryError::InvalidQuery(format!("unknown field '{}'", name)))
    }

    fn check_annotation(&self, annotation: &str) -> Result<()> {
        let field = self.field_desc()?;
        if field.annotation(annotation).is_none() {
            return Err(QueryError::InvalidQuery(format!(
                "unknown annotation '{}' in field '{}'",
                annotation,
                self.field_name()
            )));
        }
        Ok(())
    }

    /// The sensitivity that is actually used: the requested one if the
    /// annotation supports it, otherwise the closest alternative.
    pub fn sensitivity(&self) -> Result<MatchSensitivity> {
        if self.relation_annotation {
            return Ok(MatchSensitivity::Sensitive);
        }
        let field = self.field_desc()?;
        Ok(match field.annotation(&self.annotation) {
            Some(desc) => desc.resolve_sensitivity(self.sensitivity),
            None => self.sensitivity,
        })
    }

    /// Name of the index field that is searched, e.g. `contents%word@i`.
    pub fn index_field(&self) -> Result<String> {
        Ok(annotation_field(
            &self.field_name(),
            self.annotation(),
            self.sensitivity()?,
        ))
    }

    /// Convert a value to the form it is indexed in for the current sensitivity.
    pub fn desensitize(&self, value: &str) -> Result<String> {
        Ok(self.sensitivity()?.desensitize(value))
    }

    /// Derive a context with a different annotation and/or sensitivity.
    pub fn with_annotation_and_sensitivity(
        &self,
        annotation: Option<&str>,
        sensitivity: Option<MatchSensitivity>,
    ) -> Result<ExecutionContext<'a>> {
        let mut result = self.clone();
        if let Some(annotation) = annotation {
            result.check_annotation(annotation)?;
            result.annotation = annotation.to_string();
            result.relation_annotation = false;
        }
        if let Some(sensitivity) = sensitivity {
            result.sensitivity = sensitivity;
        }
        Ok(result)
    }

    /// Derive a context that searches the relations of the current field.
    pub fn with_relation_annotation(&self) -> Result<ExecutionContext<'a>> {
        if !self.field_desc()?.relations {
            return Err(QueryError::InvalidQuery(format!(
                "field '{}' has no relations",
                self.field_name()
            )));
        }
        let mut result = self.clone();
        result.relation_annotation = true;
        Ok(result)
    }

    /// Derive a context for another version of the document (parallel corpora).
    ///
    /// `None` or an empty version selects the unversioned field.
    pub fn with_doc_version(&self, version: Option<&str>) -> Result<ExecutionContext<'a>> {
        let mut result = self.clone();
        result.version = version.filter(|v| !v.is_empty()).map(String::from);
        result.field_desc()?;
        Ok(result)
    }

    pub fn with_default_relation_class(&self, relation_class: &str) -> ExecutionContext<'a> {
        let mut result = self.clone();
        result.default_relation_class = relation_class.to_string();
        result
    }
}

/// Capture names used in one translation.
///
/// Automatically generated capture names are made unique by appending a
/// number, e.g. `nsubj`, `nsubj2`, `nsubj3`.
#[derive(Clone, Debug, Default)]
pub struct CaptureRegistry {
    used: BTreeSet<String>,
}

impl CaptureRegistry {
    pub fn new() -> CaptureRegistry {
        CaptureRegistry::default()
    }

    /// Mark an explicit capture name as taken.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Register and return a capture name based on `base` that was not used before.
    pub fn ensure_unique(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
