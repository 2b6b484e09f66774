//! Naming conventions for annotated fields, parallel versions and relation types.

use crate::types::MatchSensitivity;

/// Separates the annotated field from the annotation, as in `contents%word`.
pub const ANNOT_SEPARATOR: char = '%';
/// Separates the annotation from the sensitivity code, as in `contents%word@i`.
pub const SENSITIVITY_SEPARATOR: char = '@';
/// Separates the base name of a parallel field from its version, as in `contents__nl`.
pub const PARALLEL_VERSION_SEPARATOR: &str = "__";

/// Annotation that holds the relations and inline tags of a field.
pub const RELATION_ANNOTATION: &str = "_relation";

/// Relation class used for inline tags.
pub const CLASS_INLINE_TAG: &str = "__tag";
/// Any relation class except the internal ones (e.g. inline tags).
pub const CLASS_ANY_REGEX: &str = "[^_].*";
pub const ANY_TYPE_REGEX: &str = ".*";
pub const CLASS_TYPE_SEPARATOR: &str = "::";

/// Name of the index field for an annotation searched with the given sensitivity.
pub fn annotation_field(field: &str, annotation: &str, sensitivity: MatchSensitivity) -> String {
    let mut result = String::with_capacity(field.len() + annotation.len() + 4);
    result.push_str(field);
    result.push(ANNOT_SEPARATOR);
    result.push_str(annotation);
    result.push(SENSITIVITY_SEPARATOR);
    result.push_str(sensitivity.code());
    result
}

/// Split a parallel field name into its base name and version (if any).
pub fn split_parallel_field(name: &str) -> (&str, Option<&str>) {
    // Names starting with the separator (e.g. "__tag") are not versioned.
    match name.rfind(PARALLEL_VERSION_SEPARATOR) {
        Some(pos) if pos > 0 => (
            &name[..pos],
            Some(&name[pos + PARALLEL_VERSION_SEPARATOR.len()..]),
        ),
        _ => (name, None),
    }
}

/// Replace or add the version of a (parallel) field or relation class.
///
/// An empty version removes the version suffix.
pub fn parallel_field_version(name: &str, version: &str) -> String {
    let (base, _) = split_parallel_field(name);
    if version.is_empty() {
        base.to_string()
    } else {
        format!("{}{}{}", base, PARALLEL_VERSION_SEPARATOR, version)
    }
}

/// Put parentheses around a regular expression unless it is already
/// parenthesized or matches any character sequence.
pub fn opt_par(expr: &str) -> String {
    let already_grouped = expr.starts_with('(') && expr.ends_with(')');
    let is_any = expr.len() == 2
        && expr.starts_with('.')
        && matches!(expr.chars().nth(1), Some('*') | Some('+') | Some('?'));
    if already_grouped || is_any {
        expr.to_string()
    } else {
        format!("({})", expr)
    }
}

/// Combine a relation class regex and relation type regex into a full type regex.
pub fn full_type_regex(relation_class: &str, relation_type: &str) -> String {
    format!(
        "{}{}{}",
        opt_par(relation_class),
        CLASS_TYPE_SEPARATOR,
        opt_par(relation_type)
    )
}

/// Split a full relation type (regex) into its class and type part.
///
/// Types without a class yield `None` as class.
pub fn class_and_type(full_type: &str) -> (Option<&str>, &str) {
    match full_type.find(CLASS_TYPE_SEPARATOR) {
        Some(pos) => (
            Some(&full_type[..pos]),
            &full_type[pos + CLASS_TYPE_SEPARATOR.len()..],
        ),
        None => (None, full_type),
    }
}

/// Make sure a relation type regex has a relation class, using `default_class`
/// if it has none.
pub fn opt_prepend_default_class(type_regex: &str, default_class: &str) -> String {
    if type_regex.contains(CLASS_TYPE_SEPARATOR) {
        type_regex.to_string()
    } else {
        full_type_regex(default_class, type_regex)
    }
}

/// Capture name derived from a relation type regex, e.g. `nsubj` for `dep::nsubj`.
///
/// Only letters are kept; if none remain, `rel` is used.
pub fn capture_name_for_relation_type(type_regex: &str) -> String {
    let type_part = match type_regex.rfind(CLASS_TYPE_SEPARATOR) {
        Some(pos) => &type_regex[pos + CLASS_TYPE_SEPARATOR.len()..],
        None => type_regex,
    };
    let name: String = type_part.chars().filter(|c| c.is_alphabetic()).collect();
    if name.is_empty() {
        "rel".to_string()
    } else {
        name
    }
}
