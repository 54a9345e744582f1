//! Format reference resolution — topological ordering, reachability, and
//! transparent-field flattening.
//!
//! Builds a reference graph from nested/list fields and computes a
//! deterministic topological order using Kahn's algorithm with alphabetical
//! tie-breaking. Formats caught in a reference cycle are reported as a
//! group so the rest of the schema still generates.

use super::error::{GenError, Result};
use super::types::{Field, ServiceSchema};
use rustc_hash::FxHashSet;
use std::collections::{HashMap, VecDeque};

/// Format ids a field refers to (nested fields and list-of-nested elements).
fn field_ref(field: &Field) -> Option<&str> {
    field.format.as_deref()
}

/// All format ids referenced by a format's fields, in field order.
pub fn collect_refs(schema: &ServiceSchema, format_id: &str) -> Vec<String> {
    let mut refs = Vec::new();
    if let Some(format) = schema.formats.get(format_id) {
        for field in &format.fields {
            if let Some(target) = field_ref(field) {
                refs.push(target.to_string());
            }
        }
    }
    refs
}

/// Topological order of all formats plus the members of any reference
/// cycle. Cycle members are excluded from the order and sorted for
/// deterministic reporting; they poison only the units that reach them.
pub fn format_order(schema: &ServiceSchema) -> (Vec<String>, Vec<String>) {
    let ids: Vec<String> = schema.formats.keys().cloned().collect();
    let mut in_degree: HashMap<String, usize> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

    for id in &ids {
        in_degree.insert(id.clone(), 0);
        dependents.insert(id.clone(), Vec::new());
    }

    // Edge target → referrer: a format is ready once its references are.
    for id in &ids {
        for target in collect_refs(schema, id) {
            if !schema.formats.contains_key(&target) {
                continue; // dangling refs are the validator's concern
            }
            dependents.get_mut(&target).unwrap().push(id.clone());
            *in_degree.get_mut(id).unwrap() += 1;
        }
    }

    let mut queue: VecDeque<String> = VecDeque::new();
    let mut ready: Vec<String> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| id.clone())
        .collect();
    ready.sort();
    queue.extend(ready);

    let mut order = Vec::new();
    while let Some(current) = queue.pop_front() {
        order.push(current.clone());

        let mut next_ready = Vec::new();
        if let Some(referrers) = dependents.get(&current) {
            for referrer in referrers {
                let degree = in_degree.get_mut(referrer).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    next_ready.push(referrer.clone());
                }
            }
        }
        next_ready.sort();
        queue.extend(next_ready);
    }

    let ordered: FxHashSet<&String> = order.iter().collect();
    let mut cycle: Vec<String> = ids
        .iter()
        .filter(|id| !ordered.contains(id))
        .cloned()
        .collect();
    cycle.sort();

    (order, cycle)
}

/// Format ids transitively reachable from a starting set (the starting ids
/// included when they are formats).
pub fn reachable<'a>(
    schema: &ServiceSchema,
    start: impl IntoIterator<Item = &'a str>,
) -> FxHashSet<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut stack: Vec<String> = start
        .into_iter()
        .filter(|id| schema.formats.contains_key(*id))
        .map(str::to_string)
        .collect();

    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        for target in collect_refs(schema, &id) {
            if schema.formats.contains_key(&target) && !seen.contains(&target) {
                stack.push(target);
            }
        }
    }
    seen
}

/// Flatten a format's fields: a nested field whose target is transparent is
/// replaced in place by the target's (recursively flattened) fields, in
/// original order. Opaque references stay as single fields.
pub fn flatten_fields(schema: &ServiceSchema, format_id: &str) -> Result<Vec<Field>> {
    let entity = format!("format/{}", format_id);
    let format = schema
        .formats
        .get(format_id)
        .ok_or_else(|| GenError::dangling(entity.clone(), format!("format '{}'", format_id)))?;
    flatten_field_list(schema, &entity, &format.fields)
}

/// Flatten an arbitrary field list (formats and contexts share the hoisting
/// rule).
pub fn flatten_field_list(
    schema: &ServiceSchema,
    entity: &str,
    fields: &[Field],
) -> Result<Vec<Field>> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    for field in fields {
        let hoist = field.kind == "nested"
            && field_ref(field)
                .and_then(|t| schema.formats.get(t))
                .is_some_and(|f| f.transparent);
        if hoist {
            let target = field_ref(field).unwrap();
            flatten_into(schema, entity, target, &mut out, &mut stack)?;
        } else {
            out.push(field.clone());
        }
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for field in &out {
        if !seen.insert(field.id.as_str()) {
            return Err(GenError::malformed(
                entity.to_string(),
                format!("duplicate field '{}' after flattening", field.id),
            ));
        }
    }
    Ok(out)
}

fn flatten_into(
    schema: &ServiceSchema,
    entity: &str,
    format_id: &str,
    out: &mut Vec<Field>,
    stack: &mut Vec<String>,
) -> Result<()> {
    if stack.iter().any(|id| id == format_id) {
        return Err(GenError::malformed(
            entity.to_string(),
            format!("format reference cycle through '{}'", format_id),
        ));
    }
    let format = schema
        .formats
        .get(format_id)
        .ok_or_else(|| GenError::dangling(entity.to_string(), format!("format '{}'", format_id)))?;

    stack.push(format_id.to_string());
    for field in &format.fields {
        let hoist = field.kind == "nested"
            && field_ref(field)
                .and_then(|t| schema.formats.get(t))
                .is_some_and(|f| f.transparent);
        if hoist {
            let target = field_ref(field).unwrap();
            flatten_into(schema, entity, target, out, stack)?;
        } else {
            out.push(field.clone());
        }
    }
    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser;

    fn schema(yaml: &str) -> ServiceSchema {
        parser::parse_schema(yaml).unwrap()
    }

    #[test]
    fn test_order_linear() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Person:
    fields:
      - id: address
        kind: nested
        format: Addr
  Addr:
    fields:
      - id: city
        kind: string
"#,
        );
        let (order, cycle) = format_order(&s);
        assert!(cycle.is_empty());
        assert_eq!(order, vec!["Addr", "Person"]);
    }

    #[test]
    fn test_order_alphabetical_tie_break() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Beta:
    fields: []
  Alpha:
    fields: []
"#,
        );
        let (order, _) = format_order(&s);
        assert_eq!(order, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_order_cycle_isolated() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  A:
    fields:
      - id: b
        kind: nested
        format: B
  B:
    fields:
      - id: a
        kind: nested
        format: A
  Clean:
    fields:
      - id: x
        kind: string
"#,
        );
        let (order, cycle) = format_order(&s);
        assert_eq!(order, vec!["Clean"]);
        assert_eq!(cycle, vec!["A", "B"]);
    }

    #[test]
    fn test_reachable() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Person:
    fields:
      - id: address
        kind: nested
        format: Addr
  Addr:
    fields:
      - id: country
        kind: nested
        format: Country
  Country:
    fields:
      - id: code
        kind: string
  Unrelated:
    fields: []
"#,
        );
        let r = reachable(&s, ["Person"]);
        assert!(r.contains("Person"));
        assert!(r.contains("Addr"));
        assert!(r.contains("Country"));
        assert!(!r.contains("Unrelated"));
    }

    #[test]
    fn test_flatten_transparent_in_order() {
        // The Person/Addr example: transparent Addr hoists city before name.
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Addr:
    transparent: true
    fields:
      - id: city
        kind: string
  Person:
    fields:
      - id: address
        kind: nested
        format: Addr
      - id: name
        kind: string
"#,
        );
        let fields = flatten_fields(&s, "Person").unwrap();
        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["city", "name"]);
    }

    #[test]
    fn test_flatten_recursive_transparent() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Inner:
    transparent: true
    fields:
      - id: a
        kind: string
  Middle:
    transparent: true
    fields:
      - id: inner
        kind: nested
        format: Inner
      - id: b
        kind: string
  Outer:
    fields:
      - id: middle
        kind: nested
        format: Middle
      - id: c
        kind: string
"#,
        );
        let fields = flatten_fields(&s, "Outer").unwrap();
        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_flatten_keeps_opaque_refs() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Addr:
    fields:
      - id: city
        kind: string
  Person:
    fields:
      - id: address
        kind: nested
        format: Addr
"#,
        );
        let fields = flatten_fields(&s, "Person").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id, "address");
        assert_eq!(fields[0].kind, "nested");
    }

    #[test]
    fn test_flatten_duplicate_after_hoist() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  Addr:
    transparent: true
    fields:
      - id: name
        kind: string
  Person:
    fields:
      - id: address
        kind: nested
        format: Addr
      - id: name
        kind: string
"#,
        );
        let err = flatten_fields(&s, "Person").unwrap_err();
        assert!(err.to_string().contains("duplicate field 'name'"));
    }

    #[test]
    fn test_flatten_cycle_errors() {
        let s = schema(
            r#"
version: "1.0"
name: t
package: com.acme
formats:
  A:
    transparent: true
    fields:
      - id: b
        kind: nested
        format: B
  B:
    transparent: true
    fields:
      - id: a
        kind: nested
        format: A
  Root:
    fields:
      - id: a
        kind: nested
        format: A
"#,
        );
        let err = flatten_fields(&s, "Root").unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
