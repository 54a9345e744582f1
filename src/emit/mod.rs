//! Java renderers — one module per declaration kind.
//!
//! Rendering is deterministic and whitespace-stable: the same declaration
//! graph always yields byte-identical files (4-space indent, sorted imports,
//! single trailing newline), so generated trees diff cleanly.

pub mod context;
pub mod dto;
pub mod service;
pub mod step;
pub mod support;

use crate::core::types::{Declaration, JavaField, RenderedFile};

/// Header for files the generator owns outright.
pub const GENERATED_HEADER: &str = "// Generated by fragua. Do not edit.";

/// Header for one-shot skeletons handed over to the consumer.
pub const SKELETON_HEADER: &str =
    "// Generated by fragua as a skeleton. Implement execute() and keep this file.";

pub const INDENT: &str = "    ";

/// Render one declaration into a file relative to the output root.
pub fn render(decl: &Declaration, package: &str, unit: &str) -> RenderedFile {
    let (class_name, managed, text) = match decl {
        Declaration::Dto(d) => (d.class_name.as_str(), true, dto::render(d, package)),
        Declaration::Service(s) => (s.class_name.as_str(), true, service::render(s, package)),
        Declaration::Context(c) => (c.class_name.as_str(), true, context::render(c, package)),
        Declaration::StepImpl(s) => (s.class_name.as_str(), false, step::render(s, package)),
        Declaration::StepInterface => ("ServiceStep", true, support::render_interface(package)),
        Declaration::FailureException => (
            "OperationFailedException",
            true,
            support::render_exception(package),
        ),
    };
    RenderedFile {
        rel_path: rel_path(package, class_name),
        unit: unit.to_string(),
        managed,
        text,
    }
}

/// Path of a class file under the output root: package dirs + ClassName.java.
pub fn rel_path(package: &str, class_name: &str) -> String {
    format!("{}/{}.java", package.replace('.', "/"), class_name)
}

/// Uppercase the first character (accessor derivation).
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escape a raw attribute value into a Java string literal body.
pub fn escape_java(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Deduplicated, sorted import lines (empty string when nothing to import).
pub(crate) fn import_block(fields: &[JavaField]) -> String {
    let mut imports: Vec<&'static str> = fields
        .iter()
        .flat_map(|f| f.ty.imports.iter().copied())
        .collect();
    imports.sort_unstable();
    imports.dedup();
    if imports.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for import in imports {
        out.push_str("import ");
        out.push_str(import);
        out.push_str(";\n");
    }
    out.push('\n');
    out
}

/// Getter + setter pair for one member, appended with surrounding blank
/// lines handled by the caller.
pub(crate) fn push_accessors(out: &mut String, field: &JavaField) {
    let pascal = upper_first(&field.name);
    out.push_str(&format!(
        "{i}public {ty} get{p}() {{\n{i}{i}return {n};\n{i}}}\n",
        i = INDENT,
        ty = field.ty.name,
        p = pascal,
        n = field.name,
    ));
    out.push('\n');
    out.push_str(&format!(
        "{i}public void set{p}({ty} {n}) {{\n{i}{i}this.{n} = {n};\n{i}}}\n",
        i = INDENT,
        ty = field.ty.name,
        p = pascal,
        n = field.name,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::JavaType;
    use proptest::prelude::*;

    #[test]
    fn test_rel_path() {
        assert_eq!(
            rel_path("com.acme.payments", "PaymentService"),
            "com/acme/payments/PaymentService.java"
        );
    }

    #[test]
    fn test_upper_first() {
        assert_eq!(upper_first("account"), "Account");
        assert_eq!(upper_first(""), "");
    }

    #[test]
    fn test_escape_java() {
        assert_eq!(escape_java(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_java("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_java(r"back\slash"), r"back\\slash");
    }

    #[test]
    fn test_import_block_sorted_deduped() {
        let fields = vec![
            JavaField {
                name: "a".to_string(),
                ty: JavaType::imported("LocalDate", "java.time.LocalDate"),
            },
            JavaField {
                name: "b".to_string(),
                ty: JavaType::imported("BigDecimal", "java.math.BigDecimal"),
            },
            JavaField {
                name: "c".to_string(),
                ty: JavaType::imported("BigDecimal", "java.math.BigDecimal"),
            },
        ];
        assert_eq!(
            import_block(&fields),
            "import java.math.BigDecimal;\nimport java.time.LocalDate;\n\n"
        );
    }

    #[test]
    fn test_import_block_empty() {
        assert_eq!(import_block(&[]), "");
    }

    proptest! {
        /// Escaped literals never contain a raw quote or line break.
        #[test]
        fn prop_escape_is_literal_safe(s in "\\PC{0,40}") {
            let escaped = escape_java(&s);
            let mut prev = ' ';
            for c in escaped.chars() {
                prop_assert!(c != '\n' && c != '\r');
                if c == '"' {
                    prop_assert_eq!(prev, '\\');
                }
                prev = c;
            }
        }
    }
}
