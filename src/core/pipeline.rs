//! Pipeline orchestration for a generation run:
//! parse → validate/build → render → plan → write → manifest + events.
//!
//! Unit failures are reported and skipped; the rest of the schema still
//! emits. Emission-IO aborts the whole run — nothing further can be
//! written.

use super::builder;
use super::error::{GenError, Result};
use super::manifest;
use super::parser;
use super::planner;
use super::types::*;
use crate::audit::{eventlog, hasher};
use crate::emit;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::time::Instant;

/// Configuration for a generate run.
pub struct GenerateConfig<'a> {
    pub schema_path: &'a Path,
    pub out_dir: &'a Path,
    pub force: bool,
    pub dry_run: bool,
    /// Restrict the run to one operation (plus the formats it reaches and
    /// the support pair)
    pub operation: Option<&'a str>,
}

/// Build and render every unit of a schema. Returns the rendered files in
/// deterministic unit order plus the per-unit failures.
pub fn render_units(
    schema: &ServiceSchema,
    operation: Option<&str>,
) -> Result<(Vec<RenderedFile>, Vec<UnitFailure>)> {
    let output = builder::build_declarations(schema)?;
    let (units, failures) = match operation {
        Some(op) => filter_units(schema, output, op)?,
        None => (output.units, output.failures),
    };

    let mut files = Vec::new();
    let mut seen_paths: FxHashSet<String> = FxHashSet::default();
    for unit in &units {
        for decl in &unit.decls {
            let file = emit::render(decl, &schema.java_package, &unit.id);
            if !seen_paths.insert(file.rel_path.clone()) {
                return Err(GenError::malformed(
                    "schema",
                    format!("duplicate generated file path '{}'", file.rel_path),
                ));
            }
            files.push(file);
        }
    }
    Ok((files, failures))
}

/// Keep one operation's unit, the formats it reaches, and the support pair.
fn filter_units(
    schema: &ServiceSchema,
    output: builder::BuildOutput,
    operation: &str,
) -> Result<(Vec<BuiltUnit>, Vec<UnitFailure>)> {
    let op = schema.operations.get(operation).ok_or_else(|| {
        GenError::dangling("schema", format!("operation '{}'", operation))
    })?;

    let mut start: Vec<&str> = vec![op.request.as_str(), op.response.as_str()];
    if let Some(ctx_id) = op.context.as_deref() {
        if let Some(ctx) = schema.contexts.get(ctx_id) {
            start.extend(ctx.fields.iter().filter_map(|f| f.format.as_deref()));
        }
    }
    let formats = crate::core::resolver::reachable(schema, start);

    let keep = |unit_id: &str| -> bool {
        unit_id == "support"
            || unit_id == format!("operation/{}", operation)
            || unit_id
                .strip_prefix("format/")
                .is_some_and(|f| formats.contains(f))
    };

    let units = output.units.into_iter().filter(|u| keep(&u.id)).collect();
    let failures = output
        .failures
        .into_iter()
        .filter(|f| keep(&f.unit))
        .collect();
    Ok((units, failures))
}

/// Preview a run: the plan and failures, with no writes.
pub fn preview(
    schema_path: &Path,
    out_dir: &Path,
    force: bool,
    operation: Option<&str>,
) -> Result<(EmitPlan, Vec<UnitFailure>)> {
    let schema = parser::parse_schema_file(schema_path)?;
    let (files, failures) = render_units(&schema, operation)?;
    Ok((planner::plan(&schema.name, &files, out_dir, force), failures))
}

/// Execute a generate run.
pub fn generate(cfg: &GenerateConfig) -> Result<GenReport> {
    let start = Instant::now();

    let schema = parser::parse_schema_file(cfg.schema_path)?;
    let (files, failures) = render_units(&schema, cfg.operation)?;
    let plan = planner::plan(&schema.name, &files, cfg.out_dir, cfg.force);
    let run_id = eventlog::generate_run_id();

    if cfg.dry_run {
        return Ok(GenReport {
            name: schema.name,
            run_id,
            files_written: 0,
            files_unchanged: plan.unchanged,
            skeletons_kept: plan.kept,
            failures,
            dry_run: true,
            total_duration: start.elapsed(),
            plan,
        });
    }

    eventlog::append_event(
        cfg.out_dir,
        GenEvent::GenerateStarted {
            name: schema.name.clone(),
            run_id: run_id.clone(),
            fragua_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )?;

    let mut files_written = 0u32;
    for (file, planned) in files.iter().zip(&plan.files) {
        match planned.action {
            FileAction::Create | FileAction::Update => {
                write_atomic(cfg.out_dir, &file.rel_path, &file.text)?;
                files_written += 1;
            }
            FileAction::NoOp | FileAction::Keep => {}
        }
    }

    let mut lock = manifest::load_manifest(cfg.out_dir)?
        .unwrap_or_else(|| manifest::new_manifest(&schema.name));
    lock.name = schema.name.clone();
    lock.generated_at = eventlog::now_iso8601();
    lock.generator = format!("fragua {}", env!("CARGO_PKG_VERSION"));
    for file in &files {
        lock.files.insert(
            file.rel_path.clone(),
            FileRecord {
                unit: file.unit.clone(),
                role: if file.managed {
                    FileRole::Managed
                } else {
                    FileRole::Skeleton
                },
                hash: hasher::hash_string(&file.text),
            },
        );
    }
    manifest::save_manifest(cfg.out_dir, &lock)?;

    let mut per_unit: IndexMap<&str, u32> = IndexMap::new();
    for file in &files {
        *per_unit.entry(file.unit.as_str()).or_insert(0) += 1;
    }
    for (unit, count) in &per_unit {
        eventlog::append_event(
            cfg.out_dir,
            GenEvent::UnitEmitted {
                run_id: run_id.clone(),
                unit: (*unit).to_string(),
                files: *count,
            },
        )?;
    }
    for failure in &failures {
        eventlog::append_event(
            cfg.out_dir,
            GenEvent::UnitFailed {
                run_id: run_id.clone(),
                unit: failure.unit.clone(),
                error: failure.error.clone(),
            },
        )?;
    }
    eventlog::append_event(
        cfg.out_dir,
        GenEvent::GenerateCompleted {
            run_id: run_id.clone(),
            files_written,
            files_unchanged: plan.unchanged,
            units_failed: failures.len() as u32,
            total_seconds: start.elapsed().as_secs_f64(),
        },
    )?;

    Ok(GenReport {
        name: schema.name,
        run_id,
        files_written,
        files_unchanged: plan.unchanged,
        skeletons_kept: plan.kept,
        failures,
        dry_run: false,
        total_duration: start.elapsed(),
        plan,
    })
}

/// Atomic write: ensure parent dirs, write to temp, rename into place.
fn write_atomic(out_dir: &Path, rel_path: &str, text: &str) -> Result<()> {
    let path = out_dir.join(rel_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GenError::EmissionIo {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let tmp_path = path.with_extension("java.tmp");
    std::fs::write(&tmp_path, text).map_err(|e| GenError::EmissionIo {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, &path).map_err(|e| GenError::EmissionIo { path, source: e })?;
    Ok(())
}
