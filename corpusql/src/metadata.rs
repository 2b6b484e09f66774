//! Contract towards the catalog of annotated fields, annotations and their sensitivities.

use crate::errors::Result;
use corpusql_core::types::MatchSensitivity;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Access to the structure of an index: which annotated fields exist and
/// which annotations (with which sensitivities) they offer.
pub trait IndexMetadata {
    /// Get the description of an annotated field, including parallel
    /// versions like `contents__nl`.
    fn annotated_field(&self, name: &str) -> Option<&AnnotatedFieldDesc>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotatedFieldDesc {
    /// Whether relations and inline tags are indexed for this field.
    #[serde(default)]
    pub relations: bool,
    #[serde(default)]
    pub annotations: BTreeMap<String, AnnotationDesc>,
}

impl AnnotatedFieldDesc {
    pub fn annotation(&self, name: &str) -> Option<&AnnotationDesc> {
        self.annotations.get(name)
    }

    pub fn with_annotation(mut self, name: &str, desc: AnnotationDesc) -> Self {
        self.annotations.insert(name.to_string(), desc);
        self
    }

    pub fn with_relations(mut self) -> Self {
        self.relations = true;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationDesc {
    #[serde(default = "default_sensitivities")]
    pub sensitivities: BTreeSet<MatchSensitivity>,
}

fn default_sensitivities() -> BTreeSet<MatchSensitivity> {
    let mut result = BTreeSet::new();
    result.insert(MatchSensitivity::Sensitive);
    result.insert(MatchSensitivity::Insensitive);
    result
}

impl Default for AnnotationDesc {
    fn default() -> Self {
        AnnotationDesc {
            sensitivities: default_sensitivities(),
        }
    }
}

impl AnnotationDesc {
    pub fn new<I: IntoIterator<Item = MatchSensitivity>>(sensitivities: I) -> AnnotationDesc {
        AnnotationDesc {
            sensitivities: sensitivities.into_iter().collect(),
        }
    }

    pub fn has_sensitivity(&self, sensitivity: MatchSensitivity) -> bool {
        self.sensitivities.contains(&sensitivity)
    }

    /// Find the closest sensitivity this annotation offers for the requested one.
    pub fn resolve_sensitivity(&self, requested: MatchSensitivity) -> MatchSensitivity {
        if self.has_sensitivity(requested) {
            return requested;
        }
        let fallbacks: &[MatchSensitivity] = match requested {
            MatchSensitivity::Insensitive => &[MatchSensitivity::Sensitive],
            MatchSensitivity::Sensitive => &[MatchSensitivity::Insensitive],
            MatchSensitivity::DiacriticsInsensitive | MatchSensitivity::CaseInsensitive => {
                &[MatchSensitivity::Sensitive, MatchSensitivity::Insensitive]
            }
        };
        fallbacks
            .iter()
            .copied()
            .find(|s| self.has_sensitivity(*s))
            .or_else(|| self.sensitivities.iter().next().copied())
            .unwrap_or(requested)
    }
}

/// Index structure described by a TOML file.
///
/// ```toml
/// [fields.contents]
/// relations = true
///
/// [fields.contents.annotations.word]
/// sensitivities = ["s", "i"]
///
/// [fields.contents.annotations.pos]
/// sensitivities = ["s"]
/// ```
///
/// Parallel versions of a field are listed as separate fields, e.g. `contents__nl`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStructure {
    #[serde(default)]
    pub fields: BTreeMap<String, AnnotatedFieldDesc>,
}

impl IndexStructure {
    pub fn new() -> IndexStructure {
        IndexStructure::default()
    }

    pub fn with_field(mut self, name: &str, desc: AnnotatedFieldDesc) -> Self {
        self.fields.insert(name.to_string(), desc);
        self
    }

    pub fn from_toml(content: &str) -> Result<IndexStructure> {
        let structure = toml::from_str(content)?;
        Ok(structure)
    }

    pub fn load_from_file(path: &Path) -> Result<IndexStructure> {
        debug!("Loading index structure from {}", path.to_string_lossy());
        let content = std::fs::read_to_string(path)?;
        IndexStructure::from_toml(&content)
    }
}

impl IndexMetadata for IndexStructure {
    fn annotated_field(&self, name: &str) -> Option<&AnnotatedFieldDesc> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_index_structure() {
        let structure = IndexStructure::from_toml(
            r#"
[fields.contents]
relations = true

[fields.contents.annotations.word]
sensitivities = ["s", "i"]

[fields.contents.annotations.pos]
sensitivities = ["s"]

[fields.contents__nl.annotations.word]
"#,
        )
        .unwrap();
        let contents = structure.annotated_field("contents").unwrap();
        assert!(contents.relations);
        assert_eq!(2, contents.annotations.len());
        let nl = structure.annotated_field("contents__nl").unwrap();
        assert!(!nl.relations);
        assert_eq!(&AnnotationDesc::default(), nl.annotation("word").unwrap());
        assert!(structure.annotated_field("metadata").is_none());
    }

    #[test]
    fn sensitivity_fallback() {
        let only_sensitive = AnnotationDesc::new(vec![MatchSensitivity::Sensitive]);
        assert_eq!(
            MatchSensitivity::Sensitive,
            only_sensitive.resolve_sensitivity(MatchSensitivity::Insensitive)
        );
        assert_eq!(
            MatchSensitivity::Sensitive,
            only_sensitive.resolve_sensitivity(MatchSensitivity::DiacriticsInsensitive)
        );

        let only_insensitive = AnnotationDesc::new(vec![MatchSensitivity::Insensitive]);
        assert_eq!(
            MatchSensitivity::Insensitive,
            only_insensitive.resolve_sensitivity(MatchSensitivity::Sensitive)
        );
        assert_eq!(
            MatchSensitivity::Insensitive,
            only_insensitive.resolve_sensitivity(MatchSensitivity::CaseInsensitive)
        );

        let all = AnnotationDesc::new(vec![
            MatchSensitivity::Sensitive,
            MatchSensitivity::Insensitive,
            MatchSensitivity::CaseInsensitive,
            MatchSensitivity::DiacriticsInsensitive,
        ]);
        assert_eq!(
            MatchSensitivity::CaseInsensitive,
            all.resolve_sensitivity(MatchSensitivity::CaseInsensitive)
        );
    }
}
