use crate::errors::Result;
use corpusql_core::{types::MatchSensitivity, util::fieldname::CLASS_ANY_REGEX};
use std::path::Path;

/// Configuration of the query compiler, usually read from a TOML file.
///
/// ```toml
/// [defaults]
/// field = "contents"
/// annotation = "lemma"
///
/// [limits]
/// regex_nest_limit = 50
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CompilerConfiguration {
    #[serde(default)]
    pub defaults: DefaultsConfiguration,
    #[serde(default)]
    pub limits: LimitsConfiguration,
}

/// Values used when a pattern does not specify them itself.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultsConfiguration {
    /// The annotated field that is searched.
    pub field: String,
    /// Annotation used for terms without an explicit annotation.
    pub annotation: String,
    /// Sensitivity used for terms without an explicit sensitivity.
    pub sensitivity: MatchSensitivity,
    /// Relation class used for relation types without a class.
    pub relation_class: String,
}

impl Default for DefaultsConfiguration {
    fn default() -> Self {
        DefaultsConfiguration {
            field: "contents".to_string(),
            annotation: "word".to_string(),
            sensitivity: MatchSensitivity::Insensitive,
            relation_class: CLASS_ANY_REGEX.to_string(),
        }
    }
}

/// Resource limits for translating a single query.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfiguration {
    /// Maximum size in bytes of a compiled regular expression.
    pub regex_size_limit: usize,
    /// Maximum nesting depth of a regular expression.
    pub regex_nest_limit: u32,
    /// Maximum nesting depth of the pattern tree.
    pub max_pattern_depth: usize,
}

impl Default for LimitsConfiguration {
    fn default() -> Self {
        LimitsConfiguration {
            regex_size_limit: 1024 * 1024,
            regex_nest_limit: 100,
            max_pattern_depth: 250,
        }
    }
}

impl CompilerConfiguration {
    pub fn from_toml(content: &str) -> Result<CompilerConfiguration> {
        let config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<CompilerConfiguration> {
        debug!("Loading compiler configuration from {}", path.to_string_lossy());
        let content = std::fs::read_to_string(path)?;
        CompilerConfiguration::from_toml(&content)
    }
}
