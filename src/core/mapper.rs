//! Field kind resolution and the fixed Java type table.
//!
//! The mapper is a pure lookup: string→String, date→LocalDate or
//! LocalDateTime (chosen from the resolved pattern), boolean→Boolean,
//! integer→Integer, number→BigDecimal, lookup→String, list-of-T→List<T>,
//! nested→the referenced format's class. Presentation attributes influence
//! the choice but never appear in the mapped type's public shape. Unknown
//! kinds fail with Unsupported-Tag; the mapper never guesses.

use super::error::{GenError, Result};
use super::types::{Field, JavaType};
use indexmap::IndexMap;
use std::fmt;

/// Resolved source tag kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Boolean,
    Integer,
    Number,
    Lookup,
    List,
    Nested,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "string"),
            Self::Date => write!(f, "date"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Lookup => write!(f, "lookup"),
            Self::List => write!(f, "list"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

/// Resolve a raw source tag. Returns None for anything outside the table.
pub fn parse_kind(kind: &str) -> Option<FieldKind> {
    match kind {
        "string" => Some(FieldKind::Text),
        "date" => Some(FieldKind::Date),
        "boolean" => Some(FieldKind::Boolean),
        "integer" => Some(FieldKind::Integer),
        "number" => Some(FieldKind::Number),
        "lookup" => Some(FieldKind::Lookup),
        "list" => Some(FieldKind::List),
        "nested" => Some(FieldKind::Nested),
        _ => None,
    }
}

/// True when a date pattern carries an hour, minute, or second component.
/// 'M' is month and 'S' is a fraction; neither promotes to a date-time on
/// its own.
fn has_time_component(pattern: &str) -> bool {
    pattern
        .chars()
        .any(|c| matches!(c, 'H' | 'h' | 'k' | 'K' | 'm' | 's'))
}

fn date_type(pattern: Option<&str>) -> JavaType {
    match pattern {
        Some(p) if has_time_component(p) => {
            JavaType::imported("LocalDateTime", "java.time.LocalDateTime")
        }
        _ => JavaType::imported("LocalDate", "java.time.LocalDate"),
    }
}

/// Resolve a list element or nested reference to its DTO class.
///
/// `classes` maps every format id to its class name, or None for
/// transparent formats (which must never be referenced as an element).
fn element_class(
    entity: &str,
    field: &Field,
    classes: &IndexMap<String, Option<String>>,
) -> Result<JavaType> {
    let target = field.format.as_deref().ok_or_else(|| {
        GenError::malformed(entity.to_string(), format!("field '{}' needs a format", field.id))
    })?;
    match classes.get(target) {
        Some(Some(class)) => Ok(JavaType::plain(class.clone())),
        Some(None) => Err(GenError::malformed(
            entity.to_string(),
            format!(
                "transparent format '{}' cannot be referenced as a value by field '{}'",
                target, field.id
            ),
        )),
        None => Err(GenError::dangling(
            format!("{} field '{}'", entity, field.id),
            format!("format '{}'", target),
        )),
    }
}

/// Map one field descriptor to its Java type. Deterministic: the result is
/// a pure function of (kind, relevant presentation attributes).
pub fn map_field(
    entity: &str,
    field: &Field,
    classes: &IndexMap<String, Option<String>>,
) -> Result<JavaType> {
    let kind = parse_kind(&field.kind).ok_or_else(|| GenError::UnsupportedTag {
        entity: format!("{} field '{}'", entity, field.id),
        kind: field.kind.clone(),
    })?;

    match kind {
        FieldKind::Text | FieldKind::Lookup => Ok(JavaType::plain("String")),
        FieldKind::Boolean => Ok(JavaType::plain("Boolean")),
        FieldKind::Integer => Ok(JavaType::plain("Integer")),
        FieldKind::Number => Ok(JavaType::imported("BigDecimal", "java.math.BigDecimal")),
        FieldKind::Date => Ok(date_type(field.pattern.as_deref())),
        FieldKind::Nested => element_class(entity, field, classes),
        FieldKind::List => {
            let of = field.of.as_deref().ok_or_else(|| {
                GenError::malformed(
                    entity.to_string(),
                    format!("list field '{}' needs an element kind", field.id),
                )
            })?;
            let elem_kind = parse_kind(of).ok_or_else(|| GenError::UnsupportedTag {
                entity: format!("{} field '{}'", entity, field.id),
                kind: of.to_string(),
            })?;
            let elem = match elem_kind {
                FieldKind::List => {
                    return Err(GenError::malformed(
                        entity.to_string(),
                        format!("list field '{}' cannot hold nested collections", field.id),
                    ))
                }
                FieldKind::Nested => element_class(entity, field, classes)?,
                FieldKind::Text | FieldKind::Lookup => JavaType::plain("String"),
                FieldKind::Boolean => JavaType::plain("Boolean"),
                FieldKind::Integer => JavaType::plain("Integer"),
                FieldKind::Number => JavaType::imported("BigDecimal", "java.math.BigDecimal"),
                FieldKind::Date => date_type(field.pattern.as_deref()),
            };
            let mut imports = vec!["java.util.List"];
            imports.extend(elem.imports);
            Ok(JavaType {
                name: format!("List<{}>", elem.name),
                imports,
            })
        }
    }
}
