//! Pipeline error kinds.
//!
//! Five terminal kinds: the first four abort only the unit being processed,
//! Emission-IO aborts the whole run. None are retried — they indicate a
//! defect in the input or the mapping table, not a transient condition.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    /// Structural defect in the input schema.
    #[error("malformed schema in {entity}: {message}")]
    MalformedSchema { entity: String, message: String },

    /// No known mapping for a field kind. The mapper never guesses.
    #[error("unsupported tag kind '{kind}' on {entity}")]
    UnsupportedTag { entity: String, kind: String },

    /// A format, step, or context id referenced but not defined.
    #[error("{entity} references undefined {target}")]
    DanglingReference { entity: String, target: String },

    /// One outcome code with more than one destination in a step.
    #[error("ambiguous routing in {entity}: outcome {code} maps to more than one destination")]
    AmbiguousRouting { entity: String, code: i64 },

    /// Output could not be written; nothing further can be emitted.
    #[error("cannot write {path}: {source}")]
    EmissionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    pub fn malformed(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSchema {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn dangling(entity: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DanglingReference {
            entity: entity.into(),
            target: target.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_entity() {
        let e = GenError::malformed("format/Person", "duplicate field 'city'");
        assert_eq!(
            e.to_string(),
            "malformed schema in format/Person: duplicate field 'city'"
        );
    }

    #[test]
    fn test_unsupported_tag_display() {
        let e = GenError::UnsupportedTag {
            entity: "format/Person field 'age'".to_string(),
            kind: "money".to_string(),
        };
        assert!(e.to_string().contains("'money'"));
        assert!(e.to_string().contains("format/Person field 'age'"));
    }

    #[test]
    fn test_ambiguous_routing_display() {
        let e = GenError::AmbiguousRouting {
            entity: "operation/Payment step 'validate'".to_string(),
            code: 7,
        };
        assert!(e.to_string().contains("outcome 7"));
    }
}
