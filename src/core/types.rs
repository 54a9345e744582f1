//! All schema, declaration, plan, manifest, and event types.
//!
//! Defines the YAML schema types for formats, fields, operations, steps, and
//! contexts, the assembled Java declaration model the emitter renders, and
//! the manifest/plan/report types shared across the pipeline. All schema
//! types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level fragua.yaml
// ============================================================================

/// Root schema — the declarative service definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSchema {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable schema name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Java package for every generated declaration
    #[serde(rename = "package")]
    pub java_package: String,

    /// Format declarations (order-preserving)
    #[serde(default)]
    pub formats: IndexMap<String, Format>,

    /// Context declarations
    #[serde(default)]
    pub contexts: IndexMap<String, ContextDef>,

    /// Operation declarations
    #[serde(default)]
    pub operations: IndexMap<String, Operation>,
}

// ============================================================================
// Formats and fields
// ============================================================================

/// A declarative structure definition.
///
/// Transparent formats are hoisted into their containing structure and never
/// become a named type; opaque formats emit one DTO class each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub transparent: bool,

    /// Ordered member fields
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A typed, named member of a Format (or Context).
///
/// `kind` is kept as the raw source tag; the mapper resolves it against the
/// fixed table and rejects anything unknown. Presentation attributes
/// (`pattern`, `grouping`, `table`) influence mapping but never appear in
/// the generated type's public shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Member name (lowerCamel)
    pub id: String,

    /// Source tag kind: string, date, boolean, integer, number, lookup,
    /// list, nested
    pub kind: String,

    /// Date presentation pattern (e.g. "dd.MM.yyyy HH:mm")
    #[serde(default)]
    pub pattern: Option<String>,

    /// Thousands-grouping presentation flag on numbers
    #[serde(default)]
    pub grouping: Option<bool>,

    /// Lookup table name
    #[serde(default)]
    pub table: Option<String>,

    /// Referenced format id (nested fields and list-of-nested elements)
    #[serde(default)]
    pub format: Option<String>,

    /// Element kind for list fields
    #[serde(default)]
    pub of: Option<String>,
}

// ============================================================================
// Operations and steps
// ============================================================================

/// A named service definition: ordered steps plus one request and one
/// response format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Request format id
    pub request: String,

    /// Response format id
    pub response: String,

    /// Context id; when absent an empty carrier named after the operation
    /// is synthesized
    #[serde(default)]
    pub context: Option<String>,

    /// Ordered steps (first entry is the entry step)
    pub steps: IndexMap<String, Step>,
}

/// A unit of work with an outcome-code routing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Implementation class identifier; a step without one may only
    /// terminate and compiles to an explicit failure signal
    #[serde(default)]
    pub implementation: Option<String>,

    /// Custom attributes, captured as constructor parameters of the
    /// implementation class
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Outcome-code routes, in source order
    #[serde(default)]
    pub routes: Vec<Route>,

    /// Catch-all policy for undeclared outcome codes
    #[serde(default)]
    pub other: Option<RouteTarget>,
}

/// One outcome-code route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub code: i64,
    #[serde(flatten)]
    pub target: RouteTarget,
}

/// Route destination — continue to a named step, or terminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteTarget {
    Next { next: String },
    Done { done: Terminal },
}

/// Termination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Return the built response
    Success,
    /// Raise the operation-failure signal
    Failure,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// A mutable per-invocation carrier shared across a chain of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDef {
    /// Parent context id — generated as a delegation accessor, never as
    /// Java inheritance
    #[serde(default)]
    pub parent: Option<String>,

    /// Extra carried fields
    #[serde(default)]
    pub fields: Vec<Field>,
}

// ============================================================================
// Declarations (builder output, emitter input)
// ============================================================================

/// A resolved Java type with the imports it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaType {
    pub name: String,
    pub imports: Vec<&'static str>,
}

impl JavaType {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
        }
    }

    pub fn imported(name: impl Into<String>, import: &'static str) -> Self {
        Self {
            name: name.into(),
            imports: vec![import],
        }
    }
}

/// A mapped member of a generated class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaField {
    pub name: String,
    pub ty: JavaType,
}

/// One DTO class (one per opaque format).
#[derive(Debug, Clone)]
pub struct DtoDecl {
    pub class_name: String,
    pub fields: Vec<JavaField>,
}

/// One context carrier class.
#[derive(Debug, Clone)]
pub struct ContextDecl {
    pub class_name: String,
    pub parent_class: Option<String>,
    pub request_class: Option<String>,
    pub response_class: Option<String>,
    pub fields: Vec<JavaField>,
}

/// One step implementation skeleton (one per unique implementation id).
#[derive(Debug, Clone)]
pub struct StepDecl {
    pub class_name: String,
    pub context_class: String,
    /// Constructor parameter names, in attribute declaration order
    pub params: Vec<String>,
}

/// How a service wires one step: field, construction arguments.
#[derive(Debug, Clone)]
pub struct StepBinding {
    pub step_id: String,
    pub field_name: String,
    /// None for steps without an implementation
    pub step_class: Option<String>,
    /// Raw attribute values, emitted as escaped string literals
    pub ctor_args: Vec<String>,
}

/// What one dispatch arm does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Invoke the named private routing method of the next step
    Continue { method: String },
    /// Terminate returning the built response
    ReturnResponse,
    /// Terminate raising the operation-failure signal
    Fail,
}

/// One dispatch arm for a declared outcome code.
#[derive(Debug, Clone)]
pub struct DispatchCase {
    pub code: i64,
    pub action: DispatchAction,
}

/// The discrete dispatch compiled for one step.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub step_id: String,
    pub method_name: String,
    pub field_name: String,
    /// False compiles the whole method to an explicit failure signal
    pub has_impl: bool,
    /// Cases in source order, one per distinct declared code (no coalescing)
    pub cases: Vec<DispatchCase>,
    /// Present iff an `other` policy was declared
    pub default: Option<DispatchAction>,
}

/// One service class (one per operation).
#[derive(Debug, Clone)]
pub struct ServiceDecl {
    pub class_name: String,
    pub request_class: String,
    pub response_class: String,
    pub context_class: String,
    pub bindings: Vec<StepBinding>,
    pub entry_method: String,
    pub dispatches: Vec<Dispatch>,
}

/// Everything the emitter knows how to render.
#[derive(Debug, Clone)]
pub enum Declaration {
    Dto(DtoDecl),
    Service(ServiceDecl),
    StepImpl(StepDecl),
    Context(ContextDecl),
    /// Shared single-method step capability interface
    StepInterface,
    /// Shared operation-failure exception
    FailureException,
}

// ============================================================================
// Units
// ============================================================================

/// Top-level transformation unit kind. Failures are isolated per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Format,
    Operation,
    Context,
    Support,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "format"),
            Self::Operation => write!(f, "operation"),
            Self::Context => write!(f, "context"),
            Self::Support => write!(f, "support"),
        }
    }
}

/// A successfully assembled unit.
#[derive(Debug, Clone)]
pub struct BuiltUnit {
    /// "format/Person", "operation/Payment", "context/Session", "support"
    pub id: String,
    pub kind: UnitKind,
    pub decls: Vec<Declaration>,
}

/// A unit that failed to assemble; the rest of the run continues.
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub unit: String,
    pub error: String,
}

// ============================================================================
// Rendered files and plan
// ============================================================================

/// One rendered source file, relative to the output root.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub rel_path: String,
    pub unit: String,
    /// Managed files are owned by the generator; skeletons are generated
    /// once and handed over to the consumer
    pub managed: bool,
    pub text: String,
}

/// Action to take for one planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Create,
    Update,
    NoOp,
    /// Existing skeleton left untouched
    Keep,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::NoOp => write!(f, "NO-OP"),
            Self::Keep => write!(f, "KEEP"),
        }
    }
}

/// A single planned emission.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub rel_path: String,
    pub unit: String,
    pub action: FileAction,
}

/// Full emission plan.
#[derive(Debug, Clone)]
pub struct EmitPlan {
    pub name: String,
    pub files: Vec<PlannedFile>,
    pub to_create: u32,
    pub to_update: u32,
    pub unchanged: u32,
    pub kept: u32,
}

// ============================================================================
// Manifest
// ============================================================================

/// Whether a generated file stays under generator ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Managed,
    Skeleton,
}

/// Per-file manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub unit: String,
    pub role: FileRole,
    /// BLAKE3 of the rendered content
    pub hash: String,
}

/// The generation manifest (fragua.lock.yaml in the output directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version
    pub schema: String,

    /// Source schema name
    pub name: String,

    /// When the manifest was written
    pub generated_at: String,

    /// Generator version string
    pub generator: String,

    /// Per-file records, keyed by path relative to the output root
    pub files: IndexMap<String, FileRecord>,
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenEvent {
    GenerateStarted {
        name: String,
        run_id: String,
        fragua_version: String,
    },
    UnitEmitted {
        run_id: String,
        unit: String,
        files: u32,
    },
    UnitFailed {
        run_id: String,
        unit: String,
        error: String,
    },
    GenerateCompleted {
        run_id: String,
        files_written: u32,
        files_unchanged: u32,
        units_failed: u32,
        total_seconds: f64,
    },
    DriftDetected {
        file: String,
        expected_hash: String,
        actual_hash: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: GenEvent,
}

// ============================================================================
// Generation report
// ============================================================================

/// Result of one generate run.
#[derive(Debug, Clone)]
pub struct GenReport {
    pub name: String,
    pub run_id: String,
    pub plan: EmitPlan,
    pub files_written: u32,
    pub files_unchanged: u32,
    pub skeletons_kept: u32,
    pub failures: Vec<UnitFailure>,
    pub dry_run: bool,
    pub total_duration: std::time::Duration,
}

// ============================================================================
// Tests
// ============================================================================
