//! Structure building — assembles Java declarations from the entity graph.
//!
//! Produces one DTO per opaque format, one service per operation (public
//! entry operation plus private outcome-code routing), one skeleton per
//! unique step implementation id, one context carrier per context, and the
//! shared support pair. Failures are isolated per top-level unit: a failed
//! unit is recorded and the rest of the schema still builds.

use super::error::{GenError, Result};
use super::mapper;
use super::parser::{self, ValidationError};
use super::resolver;
use super::types::*;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::collections::HashMap;

/// Builder output: assembled units plus per-unit failures.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub units: Vec<BuiltUnit>,
    pub failures: Vec<UnitFailure>,
}

/// PascalCase a schema id ("validate-account" → "ValidateAccount").
pub fn pascal_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for segment in id.split(['-', '_']) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// lowerCamelCase a schema id ("post-entry" → "postEntry").
pub fn camel_case(id: &str) -> String {
    let pascal = pascal_case(id);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

/// Class name for every format: None for transparent formats, the
/// role-derived name otherwise. Request/response formats follow the owning
/// operation's id (the same id that names the service); every other opaque
/// format is `{id}Dto`.
pub fn class_names(schema: &ServiceSchema) -> IndexMap<String, Option<String>> {
    let mut roles: HashMap<&str, String> = HashMap::new();
    for (op_id, op) in &schema.operations {
        roles
            .entry(op.request.as_str())
            .or_insert_with(|| format!("{}RqDto", op_id));
        roles
            .entry(op.response.as_str())
            .or_insert_with(|| format!("{}RsDto", op_id));
    }

    let mut classes = IndexMap::new();
    for (id, format) in &schema.formats {
        let class = if format.transparent {
            None
        } else {
            Some(
                roles
                    .get(id.as_str())
                    .cloned()
                    .unwrap_or_else(|| format!("{}Dto", id)),
            )
        };
        classes.insert(id.clone(), class);
    }
    classes
}

/// Build all units. Errs only on schema-level defects (which abort the
/// whole run); everything else degrades to per-unit failures.
pub fn build_declarations(schema: &ServiceSchema) -> Result<BuildOutput> {
    let errors = parser::validate_schema(schema);
    if let Some(e) = errors.iter().find(|e| e.entity == "schema") {
        return Err(GenError::malformed("schema", e.message.clone()));
    }

    let by_entity = group_errors(&errors);
    let failed_formats = poisoned_formats(schema, &by_entity);
    let classes = class_names(schema);

    let mut units = Vec::new();
    let mut failures = Vec::new();

    for (id, format) in &schema.formats {
        if format.transparent {
            continue;
        }
        let unit_id = format!("format/{}", id);
        if failed_formats.contains(id.as_str()) {
            failures.push(UnitFailure {
                unit: unit_id.clone(),
                error: format_failure_reason(id, &by_entity, &failed_formats, schema),
            });
            continue;
        }
        match build_dto(schema, id, &classes) {
            Ok(dto) => units.push(BuiltUnit {
                id: unit_id,
                kind: UnitKind::Format,
                decls: vec![Declaration::Dto(dto)],
            }),
            Err(e) => failures.push(UnitFailure {
                unit: unit_id,
                error: e.to_string(),
            }),
        }
    }

    let owners: HashMap<&str, &str> = schema
        .operations
        .iter()
        .filter_map(|(op_id, op)| op.context.as_deref().map(|c| (c, op_id.as_str())))
        .collect();

    let mut any_operation = false;
    for (op_id, op) in &schema.operations {
        let unit_id = format!("operation/{}", op_id);
        if let Some(reason) = operation_failure_reason(schema, op_id, op, &by_entity, &failed_formats)
        {
            failures.push(UnitFailure {
                unit: unit_id,
                error: reason,
            });
            continue;
        }
        match build_operation(schema, op_id, op, &classes) {
            Ok(decls) => {
                any_operation = true;
                units.push(BuiltUnit {
                    id: unit_id,
                    kind: UnitKind::Operation,
                    decls,
                });
            }
            Err(e) => failures.push(UnitFailure {
                unit: unit_id,
                error: e.to_string(),
            }),
        }
    }

    for (ctx_id, ctx) in &schema.contexts {
        if owners.contains_key(ctx_id.as_str()) {
            continue; // emitted inside the owning operation's unit
        }
        let unit_id = format!("context/{}", ctx_id);
        if let Some(reason) = context_failure_reason(schema, ctx_id, &by_entity, &failed_formats) {
            failures.push(UnitFailure {
                unit: unit_id,
                error: reason,
            });
            continue;
        }
        match build_context_fields(schema, ctx_id, ctx, &classes) {
            Ok(fields) => units.push(BuiltUnit {
                id: unit_id,
                kind: UnitKind::Context,
                decls: vec![Declaration::Context(ContextDecl {
                    class_name: format!("{}Context", ctx_id),
                    parent_class: ctx.parent.as_deref().map(|p| format!("{}Context", p)),
                    request_class: None,
                    response_class: None,
                    fields,
                })],
            }),
            Err(e) => failures.push(UnitFailure {
                unit: unit_id,
                error: e.to_string(),
            }),
        }
    }

    if any_operation {
        units.push(BuiltUnit {
            id: "support".to_string(),
            kind: UnitKind::Support,
            decls: vec![Declaration::StepInterface, Declaration::FailureException],
        });
    }

    Ok(BuildOutput { units, failures })
}

fn group_errors(errors: &[ValidationError]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for e in errors {
        map.entry(e.entity.clone()).or_default().push(e.message.clone());
    }
    map
}

/// Formats with their own defects, plus every format that reaches one.
fn poisoned_formats(
    schema: &ServiceSchema,
    by_entity: &HashMap<String, Vec<String>>,
) -> FxHashSet<String> {
    let mut failed: FxHashSet<String> = schema
        .formats
        .keys()
        .filter(|id| by_entity.contains_key(&format!("format/{}", id)))
        .cloned()
        .collect();

    loop {
        let mut grew = false;
        for id in schema.formats.keys() {
            if failed.contains(id) {
                continue;
            }
            if resolver::collect_refs(schema, id)
                .iter()
                .any(|t| failed.contains(t))
            {
                failed.insert(id.clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    failed
}

fn format_failure_reason(
    id: &str,
    by_entity: &HashMap<String, Vec<String>>,
    failed: &FxHashSet<String>,
    schema: &ServiceSchema,
) -> String {
    if let Some(own) = by_entity.get(&format!("format/{}", id)) {
        return own[0].clone();
    }
    let culprit = resolver::collect_refs(schema, id)
        .into_iter()
        .find(|t| failed.contains(t))
        .unwrap_or_default();
    format!("depends on failed format '{}'", culprit)
}

fn operation_failure_reason(
    schema: &ServiceSchema,
    op_id: &str,
    op: &Operation,
    by_entity: &HashMap<String, Vec<String>>,
    failed_formats: &FxHashSet<String>,
) -> Option<String> {
    if let Some(own) = by_entity.get(&format!("operation/{}", op_id)) {
        return Some(own[0].clone());
    }
    let start = [op.request.as_str(), op.response.as_str()];
    if let Some(bad) = resolver::reachable(schema, start)
        .iter()
        .find(|f| failed_formats.contains(f.as_str()))
    {
        return Some(format!("depends on failed format '{}'", bad));
    }
    if let Some(ctx_id) = op.context.as_deref() {
        if let Some(reason) = context_failure_reason(schema, ctx_id, by_entity, failed_formats) {
            return Some(format!("context '{}' is unusable: {}", ctx_id, reason));
        }
    }
    None
}

/// Walks the parent chain; any defective or format-poisoned context in the
/// chain makes the whole carrier unusable.
fn context_failure_reason(
    schema: &ServiceSchema,
    ctx_id: &str,
    by_entity: &HashMap<String, Vec<String>>,
    failed_formats: &FxHashSet<String>,
) -> Option<String> {
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut current = Some(ctx_id);
    while let Some(id) = current {
        if !visited.insert(id) {
            return Some(format!("parent chain cycle through '{}'", id));
        }
        if let Some(own) = by_entity.get(&format!("context/{}", id)) {
            return Some(own[0].clone());
        }
        let ctx = schema.contexts.get(id)?;
        let refs: Vec<&str> = ctx.fields.iter().filter_map(|f| f.format.as_deref()).collect();
        if let Some(bad) = resolver::reachable(schema, refs)
            .iter()
            .find(|f| failed_formats.contains(f.as_str()))
        {
            return Some(format!("depends on failed format '{}'", bad));
        }
        current = ctx.parent.as_deref();
    }
    None
}

fn build_dto(
    schema: &ServiceSchema,
    format_id: &str,
    classes: &IndexMap<String, Option<String>>,
) -> Result<DtoDecl> {
    let entity = format!("format/{}", format_id);
    let class_name = classes
        .get(format_id)
        .and_then(Clone::clone)
        .ok_or_else(|| GenError::dangling(entity.clone(), format!("format '{}'", format_id)))?;

    let mut fields = Vec::new();
    for field in resolver::flatten_fields(schema, format_id)? {
        let ty = mapper::map_field(&entity, &field, classes)?;
        fields.push(JavaField {
            name: field.id.clone(),
            ty,
        });
    }
    Ok(DtoDecl { class_name, fields })
}

fn class_of(
    classes: &IndexMap<String, Option<String>>,
    format_id: &str,
    entity: &str,
) -> Result<String> {
    classes
        .get(format_id)
        .and_then(Clone::clone)
        .ok_or_else(|| GenError::dangling(entity.to_string(), format!("format '{}'", format_id)))
}

fn build_operation(
    schema: &ServiceSchema,
    op_id: &str,
    op: &Operation,
    classes: &IndexMap<String, Option<String>>,
) -> Result<Vec<Declaration>> {
    let entity = format!("operation/{}", op_id);
    let request_class = class_of(classes, &op.request, &entity)?;
    let response_class = class_of(classes, &op.response, &entity)?;

    let context_decl = build_operation_context(
        schema,
        op_id,
        op,
        classes,
        &request_class,
        &response_class,
    )?;
    let context_class = context_decl.class_name.clone();

    let mut step_decls: Vec<StepDecl> = Vec::new();
    let mut seen_impls: FxHashSet<&str> = FxHashSet::default();
    let mut bindings = Vec::new();
    let mut dispatches = Vec::new();

    for (step_id, step) in &op.steps {
        let step_entity = format!("{} step '{}'", entity, step_id);
        let method_name = format!("run{}", pascal_case(step_id));
        let field_name = camel_case(step_id);

        match step.implementation.as_deref() {
            Some(impl_id) => {
                if seen_impls.insert(impl_id) {
                    step_decls.push(StepDecl {
                        class_name: impl_id.to_string(),
                        context_class: context_class.clone(),
                        params: step.attributes.keys().cloned().collect(),
                    });
                }
                bindings.push(StepBinding {
                    step_id: step_id.clone(),
                    field_name: field_name.clone(),
                    step_class: Some(impl_id.to_string()),
                    ctor_args: step.attributes.values().cloned().collect(),
                });
            }
            None => bindings.push(StepBinding {
                step_id: step_id.clone(),
                field_name: field_name.clone(),
                step_class: None,
                ctor_args: Vec::new(),
            }),
        }

        let mut cases = Vec::new();
        let mut codes: FxHashSet<i64> = FxHashSet::default();
        for route in &step.routes {
            if !codes.insert(route.code) {
                return Err(GenError::AmbiguousRouting {
                    entity: step_entity.clone(),
                    code: route.code,
                });
            }
            cases.push(DispatchCase {
                code: route.code,
                action: dispatch_action(&route.target, op, &step_entity)?,
            });
        }
        let default = step
            .other
            .as_ref()
            .map(|t| dispatch_action(t, op, &step_entity))
            .transpose()?;

        dispatches.push(Dispatch {
            step_id: step_id.clone(),
            method_name,
            field_name,
            has_impl: step.implementation.is_some(),
            cases,
            default,
        });
    }

    let entry_method = dispatches
        .first()
        .map(|d| d.method_name.clone())
        .ok_or_else(|| GenError::malformed(entity.clone(), "declares no steps"))?;

    let service = ServiceDecl {
        class_name: format!("{}Service", op_id),
        request_class,
        response_class,
        context_class,
        bindings,
        entry_method,
        dispatches,
    };

    let mut decls = vec![
        Declaration::Service(service),
        Declaration::Context(context_decl),
    ];
    decls.extend(step_decls.into_iter().map(Declaration::StepImpl));
    Ok(decls)
}

fn dispatch_action(
    target: &RouteTarget,
    op: &Operation,
    step_entity: &str,
) -> Result<DispatchAction> {
    match target {
        RouteTarget::Next { next } => {
            if !op.steps.contains_key(next) {
                return Err(GenError::dangling(
                    step_entity.to_string(),
                    format!("step '{}'", next),
                ));
            }
            Ok(DispatchAction::Continue {
                method: format!("run{}", pascal_case(next)),
            })
        }
        RouteTarget::Done { done: Terminal::Success } => Ok(DispatchAction::ReturnResponse),
        RouteTarget::Done { done: Terminal::Failure } => Ok(DispatchAction::Fail),
    }
}

fn build_operation_context(
    schema: &ServiceSchema,
    op_id: &str,
    op: &Operation,
    classes: &IndexMap<String, Option<String>>,
    request_class: &str,
    response_class: &str,
) -> Result<ContextDecl> {
    let (class_name, parent_class, fields) = match op.context.as_deref() {
        Some(ctx_id) => {
            let entity = format!("operation/{}", op_id);
            let ctx = schema
                .contexts
                .get(ctx_id)
                .ok_or_else(|| GenError::dangling(entity, format!("context '{}'", ctx_id)))?;
            (
                format!("{}Context", ctx_id),
                ctx.parent.as_deref().map(|p| format!("{}Context", p)),
                build_context_fields(schema, ctx_id, ctx, classes)?,
            )
        }
        // No declared carrier: synthesize an empty one named after the
        // operation so the step capability signature stays uniform.
        None => (format!("{}Context", op_id), None, Vec::new()),
    };

    Ok(ContextDecl {
        class_name,
        parent_class,
        request_class: Some(request_class.to_string()),
        response_class: Some(response_class.to_string()),
        fields,
    })
}

fn build_context_fields(
    schema: &ServiceSchema,
    ctx_id: &str,
    ctx: &ContextDef,
    classes: &IndexMap<String, Option<String>>,
) -> Result<Vec<JavaField>> {
    let entity = format!("context/{}", ctx_id);
    let mut fields = Vec::new();
    for field in resolver::flatten_field_list(schema, &entity, &ctx.fields)? {
        let ty = mapper::map_field(&entity, &field, classes)?;
        fields.push(JavaField {
            name: field.id.clone(),
            ty,
        });
    }
    Ok(fields)
}
