//! Schema parsing and validation.
//!
//! Parses fragua.yaml and collects structural constraints before any unit
//! is built:
//! - Version must be "1.0"; name and package must be well-formed
//! - Identifier shapes (type ids, member ids, step ids)
//! - request/response/context/next references must exist
//! - Outcome codes must be unambiguous within a step
//! - Field kinds must be mappable; nested/list targets must resolve

use super::error::{GenError, Result};
use super::mapper::{self, FieldKind};
use super::resolver;
use super::types::*;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Validation error, tagged with the entity it concerns: "schema",
/// "format/X", "operation/X", or "context/X".
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub entity: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

/// Parse a fragua.yaml file from disk.
pub fn parse_schema_file(path: &Path) -> Result<ServiceSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GenError::malformed("schema", format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_schema(&content)
}

/// Parse a fragua.yaml from a string.
pub fn parse_schema(yaml: &str) -> Result<ServiceSchema> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| GenError::malformed("schema", format!("YAML parse error: {}", e)))
}

static TYPE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap());
static MEMBER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][A-Za-z0-9]*$").unwrap());
static STEP_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());
static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").unwrap());

/// Validate a parsed schema. Returns a list of errors (empty = valid).
pub fn validate_schema(schema: &ServiceSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if schema.version != "1.0" {
        errors.push(err(
            "schema",
            format!("version must be \"1.0\", got \"{}\"", schema.version),
        ));
    }
    if schema.name.is_empty() {
        errors.push(err("schema", "name must not be empty"));
    }
    if !PACKAGE_RE.is_match(&schema.java_package) {
        errors.push(err(
            "schema",
            format!("package '{}' is not a valid Java package", schema.java_package),
        ));
    }

    validate_formats(schema, &mut errors);
    validate_roles(schema, &mut errors);
    validate_contexts(schema, &mut errors);
    validate_operations(schema, &mut errors);

    errors
}

fn err(entity: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError {
        entity: entity.into(),
        message: message.into(),
    }
}

fn validate_formats(schema: &ServiceSchema, errors: &mut Vec<ValidationError>) {
    for (id, format) in &schema.formats {
        let entity = format!("format/{}", id);
        if !TYPE_ID_RE.is_match(id) {
            errors.push(err(&entity, format!("id '{}' is not a valid type name", id)));
        }
        validate_fields(schema, &entity, &format.fields, errors);
    }

    // Reference cycles poison their members; report them once per member.
    let (_, cycle) = resolver::format_order(schema);
    if !cycle.is_empty() {
        let members = cycle.join(", ");
        for id in &cycle {
            errors.push(err(
                format!("format/{}", id),
                format!("format reference cycle involving: {}", members),
            ));
        }
    } else {
        // Flattening is only well-defined on an acyclic graph.
        for (id, format) in &schema.formats {
            if format.transparent {
                continue;
            }
            if let Err(e) = resolver::flatten_fields(schema, id) {
                errors.push(err(format!("format/{}", id), e.to_string()));
            }
        }
    }
}

fn validate_fields(
    schema: &ServiceSchema,
    entity: &str,
    fields: &[Field],
    errors: &mut Vec<ValidationError>,
) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for field in fields {
        if !MEMBER_ID_RE.is_match(&field.id) {
            errors.push(err(
                entity,
                format!("field id '{}' is not a valid member name", field.id),
            ));
        }
        if !seen.insert(field.id.as_str()) {
            errors.push(err(entity, format!("duplicate field '{}'", field.id)));
        }

        let Some(kind) = mapper::parse_kind(&field.kind) else {
            errors.push(err(
                entity,
                format!("field '{}' has unknown kind '{}'", field.id, field.kind),
            ));
            continue;
        };

        match kind {
            FieldKind::Nested => check_format_ref(schema, entity, field, false, errors),
            FieldKind::List => {
                let Some(of) = field.of.as_deref() else {
                    errors.push(err(
                        entity,
                        format!("list field '{}' needs an element kind", field.id),
                    ));
                    continue;
                };
                match mapper::parse_kind(of) {
                    None => errors.push(err(
                        entity,
                        format!("field '{}' has unknown element kind '{}'", field.id, of),
                    )),
                    Some(FieldKind::List) => errors.push(err(
                        entity,
                        format!("list field '{}' cannot hold nested collections", field.id),
                    )),
                    Some(FieldKind::Nested) => {
                        check_format_ref(schema, entity, field, true, errors)
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }
}

fn check_format_ref(
    schema: &ServiceSchema,
    entity: &str,
    field: &Field,
    as_element: bool,
    errors: &mut Vec<ValidationError>,
) {
    let Some(target) = field.format.as_deref() else {
        errors.push(err(entity, format!("field '{}' needs a format", field.id)));
        return;
    };
    match schema.formats.get(target) {
        None => errors.push(err(
            entity,
            format!("field '{}' references undefined format '{}'", field.id, target),
        )),
        Some(f) if as_element && f.transparent => errors.push(err(
            entity,
            format!(
                "transparent format '{}' cannot be a collection element (field '{}')",
                target, field.id
            ),
        )),
        Some(_) => {}
    }
}

/// Check request/response roles: references resolve, transparent formats
/// stay unnamed, and no format serves conflicting roles.
fn validate_roles(schema: &ServiceSchema, errors: &mut Vec<ValidationError>) {
    let mut roles: HashMap<&str, (&str, &str)> = HashMap::new(); // format → (role, op)
    for (op_id, op) in &schema.operations {
        let entity = format!("operation/{}", op_id);
        for (role, format_id) in [("request", op.request.as_str()), ("response", op.response.as_str())]
        {
            match schema.formats.get(format_id) {
                None => errors.push(err(
                    &entity,
                    format!("references undefined {} format '{}'", role, format_id),
                )),
                Some(f) if f.transparent => errors.push(err(
                    format!("format/{}", format_id),
                    format!("transparent format cannot be the {} of operation '{}'", role, op_id),
                )),
                Some(_) => match roles.get(format_id).copied() {
                    None => {
                        roles.insert(format_id, (role, op_id));
                    }
                    Some((prev_role, prev_op))
                        if prev_op != op_id.as_str() || prev_role != role =>
                    {
                        errors.push(err(
                            format!("format/{}", format_id),
                            format!(
                                "serves as {} of operation '{}' and {} of operation '{}'",
                                prev_role, prev_op, role, op_id
                            ),
                        ));
                    }
                    Some(_) => {}
                },
            }
        }
    }
}

fn validate_contexts(schema: &ServiceSchema, errors: &mut Vec<ValidationError>) {
    for (id, ctx) in &schema.contexts {
        let entity = format!("context/{}", id);
        if !TYPE_ID_RE.is_match(id) {
            errors.push(err(&entity, format!("id '{}' is not a valid type name", id)));
        }
        validate_fields(schema, &entity, &ctx.fields, errors);
        if let Err(e) = resolver::flatten_field_list(schema, &entity, &ctx.fields) {
            errors.push(err(&entity, e.to_string()));
        }

        if let Some(parent) = ctx.parent.as_deref() {
            if !schema.contexts.contains_key(parent) {
                errors.push(err(
                    &entity,
                    format!("references undefined parent context '{}'", parent),
                ));
            }
        }

        // Parent chain must be acyclic.
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        visited.insert(id.as_str());
        let mut current = ctx.parent.as_deref();
        while let Some(parent) = current {
            if !visited.insert(parent) {
                errors.push(err(&entity, format!("parent chain cycle through '{}'", parent)));
                break;
            }
            current = schema
                .contexts
                .get(parent)
                .and_then(|p| p.parent.as_deref());
        }
    }

    // A context belongs to at most one operation.
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for (op_id, op) in &schema.operations {
        if let Some(ctx_id) = op.context.as_deref() {
            if let Some(prev) = owners.insert(ctx_id, op_id) {
                errors.push(err(
                    format!("context/{}", ctx_id),
                    format!("referenced by operations '{}' and '{}'", prev, op_id),
                ));
            }
        }
    }
}

fn validate_operations(schema: &ServiceSchema, errors: &mut Vec<ValidationError>) {
    // An implementation id belongs to one operation: its skeleton is typed
    // against that operation's context.
    let mut impl_owner: HashMap<&str, &str> = HashMap::new();
    let mut impl_params: HashMap<&str, Vec<&str>> = HashMap::new();

    for (op_id, op) in &schema.operations {
        let entity = format!("operation/{}", op_id);
        if !TYPE_ID_RE.is_match(op_id) {
            errors.push(err(&entity, format!("id '{}' is not a valid type name", op_id)));
        }
        if op.steps.is_empty() {
            errors.push(err(&entity, "declares no steps"));
        }
        if let Some(ctx_id) = op.context.as_deref() {
            if !schema.contexts.contains_key(ctx_id) {
                errors.push(err(
                    &entity,
                    format!("references undefined context '{}'", ctx_id),
                ));
            }
        } else if schema.contexts.contains_key(op_id.as_str()) {
            errors.push(err(
                &entity,
                format!(
                    "would synthesize context '{}Context' which collides with declared context '{}'",
                    op_id, op_id
                ),
            ));
        }

        for (step_id, step) in &op.steps {
            if !STEP_ID_RE.is_match(step_id) {
                errors.push(err(
                    &entity,
                    format!("step id '{}' is not a valid step name", step_id),
                ));
            }

            match step.implementation.as_deref() {
                Some(impl_id) => {
                    if !TYPE_ID_RE.is_match(impl_id) {
                        errors.push(err(
                            &entity,
                            format!(
                                "step '{}' implementation '{}' is not a valid type name",
                                step_id, impl_id
                            ),
                        ));
                    }
                    let params: Vec<&str> =
                        step.attributes.keys().map(String::as_str).collect();
                    if let Some(owner) = impl_owner.get(impl_id) {
                        if *owner != op_id.as_str() {
                            errors.push(err(
                                &entity,
                                format!(
                                    "implementation '{}' is already used by operation '{}'",
                                    impl_id, owner
                                ),
                            ));
                        } else if impl_params.get(impl_id) != Some(&params) {
                            errors.push(err(
                                &entity,
                                format!(
                                    "steps sharing implementation '{}' declare different attributes",
                                    impl_id
                                ),
                            ));
                        }
                    } else {
                        impl_owner.insert(impl_id, op_id);
                        impl_params.insert(impl_id, params);
                    }
                }
                None => {
                    // Only immediate termination is allowed; compiled to an
                    // explicit failure signal, never a silent pass-through.
                    let routes_on = step
                        .routes
                        .iter()
                        .find(|r| matches!(r.target, RouteTarget::Next { .. }));
                    if let Some(route) = routes_on {
                        let RouteTarget::Next { next } = &route.target else {
                            unreachable!()
                        };
                        errors.push(err(
                            &entity,
                            format!(
                                "step '{}' has no implementation but routes to '{}'",
                                step_id, next
                            ),
                        ));
                    }
                }
            }

            for key in step.attributes.keys() {
                if !MEMBER_ID_RE.is_match(key) {
                    errors.push(err(
                        &entity,
                        format!("step '{}' attribute '{}' is not a valid member name", step_id, key),
                    ));
                }
            }

            let mut codes: FxHashSet<i64> = FxHashSet::default();
            for route in &step.routes {
                if !codes.insert(route.code) {
                    errors.push(err(
                        &entity,
                        format!(
                            "step '{}' declares outcome {} more than once",
                            step_id, route.code
                        ),
                    ));
                }
                if let RouteTarget::Next { next } = &route.target {
                    if !op.steps.contains_key(next) {
                        errors.push(err(
                            &entity,
                            format!("step '{}' routes to undefined step '{}'", step_id, next),
                        ));
                    }
                }
            }
            if let Some(RouteTarget::Next { next }) = &step.other {
                if !op.steps.contains_key(next) {
                    errors.push(err(
                        &entity,
                        format!("step '{}' routes to undefined step '{}'", step_id, next),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: "1.0"
name: payments
package: com.acme.payments
formats:
  PaymentRq:
    fields:
      - id: account
        kind: string
      - id: amount
        kind: number
  PaymentRs:
    fields:
      - id: status
        kind: lookup
        table: PaymentStatus
contexts:
  Payment:
    fields:
      - id: attemptCount
        kind: integer
operations:
  Payment:
    request: PaymentRq
    response: PaymentRs
    context: Payment
    steps:
      validate-account:
        implementation: ValidateAccountStep
        attributes:
          strictMode: "true"
        routes:
          - code: 0
            next: post-entry
          - code: 1
            done: failure
        other:
          done: failure
      post-entry:
        implementation: PostEntryStep
        routes:
          - code: 0
            done: success
        other:
          done: failure
"#;

    #[test]
    fn test_parse_valid() {
        let schema = parse_schema(VALID).unwrap();
        let errors = validate_schema(&schema);
        assert!(
            errors.is_empty(),
            "unexpected errors: {:?}",
            errors.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(parse_schema("not: [valid: yaml: {{").is_err());
    }

    #[test]
    fn test_bad_version() {
        let schema = parse_schema(&VALID.replace("\"1.0\"", "\"2.0\"")).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors.iter().any(|e| e.message.contains("version")));
    }

    #[test]
    fn test_bad_package() {
        let schema = parse_schema(&VALID.replace("com.acme.payments", "Com.Acme")).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("not a valid Java package")));
    }

    #[test]
    fn test_undefined_request_format() {
        let schema = parse_schema(&VALID.replace("request: PaymentRq", "request: Ghost")).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("undefined request format 'Ghost'")));
    }

    #[test]
    fn test_undefined_next_step() {
        let schema = parse_schema(&VALID.replace("next: post-entry", "next: ghost-step")).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("undefined step 'ghost-step'")));
    }

    #[test]
    fn test_duplicate_outcome_code() {
        let yaml = VALID.replace("- code: 1\n            done: failure", "- code: 0\n            done: failure");
        let schema = parse_schema(&yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("outcome 0 more than once")));
    }

    #[test]
    fn test_transparent_request_rejected() {
        let yaml = VALID.replace("  PaymentRq:\n", "  PaymentRq:\n    transparent: true\n");
        let schema = parse_schema(&yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("transparent format cannot be the request")));
    }

    #[test]
    fn test_unknown_field_kind() {
        let schema = parse_schema(&VALID.replace("kind: number", "kind: money")).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("unknown kind 'money'")));
    }

    #[test]
    fn test_step_without_impl_cannot_continue() {
        let yaml = VALID.replace("        implementation: ValidateAccountStep\n", "");
        let schema = parse_schema(&yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("no implementation but routes to 'post-entry'")));
    }

    #[test]
    fn test_impl_shared_across_operations_rejected() {
        let yaml = format!(
            "{}
  Refund:
    request: PaymentRq
    response: PaymentRs
    steps:
      validate:
        implementation: ValidateAccountStep
        attributes:
          strictMode: \"false\"
        routes:
          - code: 0
            done: success
",
            VALID
        );
        let schema = parse_schema(&yaml).unwrap();
        let errors = validate_schema(&schema);
        // Refund both reuses the implementation and collides on the request
        // role; the implementation reuse must be among the findings.
        assert!(errors
            .iter()
            .any(|e| e.message.contains("already used by operation 'Payment'")));
    }

    #[test]
    fn test_context_shared_across_operations_rejected() {
        let yaml = format!(
            "{}
  Refund:
    request: PaymentRs
    response: PaymentRq
    context: Payment
    steps:
      refund:
        implementation: RefundStep
        routes:
          - code: 0
            done: success
",
            VALID
        );
        let schema = parse_schema(&yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("referenced by operations 'Payment' and 'Refund'")));
    }

    #[test]
    fn test_parent_chain_cycle() {
        let yaml = r#"
version: "1.0"
name: t
package: com.acme
contexts:
  A:
    parent: B
  B:
    parent: A
"#;
        let schema = parse_schema(yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors.iter().any(|e| e.message.contains("parent chain cycle")));
    }

    #[test]
    fn test_synthesized_context_collision() {
        let yaml = r#"
version: "1.0"
name: t
package: com.acme
formats:
  Rq:
    fields: []
  Rs:
    fields: []
contexts:
  Pay: {}
operations:
  Pay:
    request: Rq
    response: Rs
    steps:
      go:
        implementation: GoStep
        routes:
          - code: 0
            done: success
"#;
        let schema = parse_schema(yaml).unwrap();
        let errors = validate_schema(&schema);
        assert!(errors.iter().any(|e| e.message.contains("collides")));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragua.yaml");
        std::fs::write(&path, VALID).unwrap();
        let schema = parse_schema_file(&path).unwrap();
        assert_eq!(schema.name, "payments");
    }

    #[test]
    fn test_missing_file() {
        let result = parse_schema_file(Path::new("/nonexistent/fragua.yaml"));
        assert!(result.is_err());
    }
}
