//! CLI subcommands — init, validate, preview, generate, check, status,
//! completions.

use crate::audit::{drift, eventlog};
use crate::core::error::GenError;
use crate::core::types::{EmitPlan, FileAction, FileRole, GenEvent, UnitFailure};
use crate::core::{manifest, parser, pipeline};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "fragua",
    version,
    about = "Declarative service schemas to Java sources — deterministic codegen, BLAKE3 manifests, drift tracking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new fragua project with a sample schema
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate fragua.yaml without generating anything
    Validate {
        /// Path to fragua.yaml
        #[arg(short, long, default_value = "fragua.yaml")]
        file: PathBuf,
    },

    /// Show the emission plan (diff rendered output vs the output tree)
    Preview {
        /// Path to fragua.yaml
        #[arg(short, long, default_value = "fragua.yaml")]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "generated")]
        out_dir: PathBuf,

        /// Restrict to one operation
        #[arg(long)]
        operation: Option<String>,
    },

    /// Generate Java sources from the schema
    Generate {
        /// Path to fragua.yaml
        #[arg(short, long, default_value = "fragua.yaml")]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "generated")]
        out_dir: PathBuf,

        /// Restrict to one operation
        #[arg(long)]
        operation: Option<String>,

        /// Rewrite managed files even when unchanged
        #[arg(long)]
        force: bool,

        /// Show what would be written without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Detect hand-edits to managed generated files
    Check {
        /// Output directory
        #[arg(short, long, default_value = "generated")]
        out_dir: PathBuf,

        /// Exit non-zero on any drift (for CI/cron)
        #[arg(long)]
        strict: bool,
    },

    /// Show manifest state for an output directory
    Status {
        /// Output directory
        #[arg(short, long, default_value = "generated")]
        out_dir: PathBuf,
    },

    /// Emit shell completions
    Completions {
        /// Shell to target
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), GenError> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Preview {
            file,
            out_dir,
            operation,
        } => cmd_preview(&file, &out_dir, operation.as_deref()),
        Commands::Generate {
            file,
            out_dir,
            operation,
            force,
            dry_run,
        } => cmd_generate(&file, &out_dir, operation.as_deref(), force, dry_run),
        Commands::Check { out_dir, strict } => cmd_check(&out_dir, strict),
        Commands::Status { out_dir } => cmd_status(&out_dir),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

const SCHEMA_TEMPLATE: &str = r#"version: "1.0"
name: my-service
package: com.example.myservice

formats:
  TransferRq:
    fields:
      - id: account
        kind: string
      - id: amount
        kind: number
      - id: valueDate
        kind: date
        pattern: dd.MM.yyyy
  TransferRs:
    fields:
      - id: status
        kind: lookup
        table: TransferStatus

contexts:
  Transfer:
    fields:
      - id: attemptCount
        kind: integer

operations:
  Transfer:
    request: TransferRq
    response: TransferRs
    context: Transfer
    steps:
      validate-account:
        implementation: ValidateAccountStep
        attributes:
          strictMode: "true"
        routes:
          - code: 0
            next: post-transfer
          - code: 1
            done: failure
        other:
          done: failure
      post-transfer:
        implementation: PostTransferStep
        routes:
          - code: 0
            done: success
        other:
          done: failure
"#;

fn cmd_init(path: &Path) -> Result<(), GenError> {
    let schema_path = path.join("fragua.yaml");
    if schema_path.exists() {
        return Err(GenError::malformed(
            "schema",
            format!("{} already exists", schema_path.display()),
        ));
    }
    std::fs::create_dir_all(path).map_err(|e| GenError::EmissionIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(&schema_path, SCHEMA_TEMPLATE).map_err(|e| GenError::EmissionIo {
        path: schema_path.clone(),
        source: e,
    })?;

    println!("created {}", schema_path.display());
    println!("next steps:");
    println!("  fragua validate -f {}", schema_path.display());
    println!("  fragua generate -f {}", schema_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), GenError> {
    let schema = parser::parse_schema_file(file)?;
    let errors = parser::validate_schema(&schema);
    if errors.is_empty() {
        println!(
            "{}: {} formats, {} contexts, {} operations — OK",
            schema.name,
            schema.formats.len(),
            schema.contexts.len(),
            schema.operations.len()
        );
        return Ok(());
    }
    for e in &errors {
        eprintln!("  {}", e);
    }
    Err(GenError::malformed(
        "schema",
        format!("{} validation error(s)", errors.len()),
    ))
}

fn print_plan(plan: &EmitPlan) {
    for file in &plan.files {
        if file.action != FileAction::NoOp {
            println!("  {:6} {}", file.action.to_string(), file.rel_path);
        }
    }
    println!(
        "plan for {}: {} to create, {} to update, {} unchanged, {} skeletons kept",
        plan.name, plan.to_create, plan.to_update, plan.unchanged, plan.kept
    );
}

fn print_failures(failures: &[UnitFailure]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("failed units:");
    for f in failures {
        eprintln!("  {}: {}", f.unit, f.error);
    }
}

fn cmd_preview(file: &Path, out_dir: &Path, operation: Option<&str>) -> Result<(), GenError> {
    let (plan, failures) = pipeline::preview(file, out_dir, false, operation)?;
    print_plan(&plan);
    print_failures(&failures);
    Ok(())
}

fn cmd_generate(
    file: &Path,
    out_dir: &Path,
    operation: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<(), GenError> {
    let report = pipeline::generate(&pipeline::GenerateConfig {
        schema_path: file,
        out_dir,
        force,
        dry_run,
        operation,
    })?;

    if report.dry_run {
        print_plan(&report.plan);
        print_failures(&report.failures);
        return Ok(());
    }

    println!(
        "{} ({}): {} written, {} unchanged, {} skeletons kept in {:.2}s",
        report.name,
        report.run_id,
        report.files_written,
        report.files_unchanged,
        report.skeletons_kept,
        report.total_duration.as_secs_f64()
    );
    print_failures(&report.failures);
    if !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(out_dir: &Path, strict: bool) -> Result<(), GenError> {
    let Some(lock) = manifest::load_manifest(out_dir)? else {
        return Err(GenError::malformed(
            "manifest",
            format!("no manifest in {} — run generate first", out_dir.display()),
        ));
    };

    let findings = drift::detect_drift(&lock, out_dir);
    if findings.is_empty() {
        println!("{}: no drift ({} files tracked)", lock.name, lock.files.len());
        return Ok(());
    }

    for f in &findings {
        println!("  DRIFT {} ({})", f.rel_path, f.detail);
        eventlog::append_event(
            out_dir,
            GenEvent::DriftDetected {
                file: f.rel_path.clone(),
                expected_hash: f.expected_hash.clone(),
                actual_hash: f.actual_hash.clone(),
            },
        )?;
    }
    println!("{} drifted file(s)", findings.len());
    if strict {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_status(out_dir: &Path) -> Result<(), GenError> {
    let Some(lock) = manifest::load_manifest(out_dir)? else {
        println!("no manifest in {}", out_dir.display());
        return Ok(());
    };

    let managed = lock
        .files
        .values()
        .filter(|r| r.role == FileRole::Managed)
        .count();
    let skeletons = lock.files.len() - managed;

    println!("{} — generated at {} by {}", lock.name, lock.generated_at, lock.generator);
    println!("{} managed files, {} skeletons", managed, skeletons);
    for (path, record) in &lock.files {
        let short_hash = record.hash.get(..15).unwrap_or(&record.hash);
        println!("  {} {} ({})", short_hash, path, record.unit);
    }
    Ok(())
}
