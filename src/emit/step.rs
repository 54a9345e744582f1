//! Step skeleton renderer — one class per unique implementation id.
//!
//! Skeletons are generated once: the consumer fills in `execute` and keeps
//! the file, so the planner never overwrites an existing one. Custom step
//! attributes arrive as constructor parameters and final fields — there are
//! no post-construction mutators.

use super::{INDENT, SKELETON_HEADER};
use crate::core::types::StepDecl;

pub fn render(decl: &StepDecl, package: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("package {};\n\n", package));
    out.push_str(SKELETON_HEADER);
    out.push('\n');
    out.push_str(&format!(
        "public class {} implements ServiceStep<{}> {{\n",
        decl.class_name, decl.context_class
    ));

    if !decl.params.is_empty() {
        out.push('\n');
        for param in &decl.params {
            out.push_str(&format!("{}private final String {};\n", INDENT, param));
        }
        out.push('\n');
        let args = decl
            .params
            .iter()
            .map(|p| format!("String {}", p))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{}public {}({}) {{\n", INDENT, decl.class_name, args));
        for param in &decl.params {
            out.push_str(&format!("{i}{i}this.{p} = {p};\n", i = INDENT, p = param));
        }
        out.push_str(&format!("{}}}\n", INDENT));
    }

    out.push('\n');
    out.push_str(&format!(
        "{i}@Override\n\
         {i}public int execute({ctx} context) {{\n\
         {i}{i}throw new UnsupportedOperationException(\"{class}.execute is not implemented\");\n\
         {i}}}\n",
        i = INDENT,
        ctx = decl.context_class,
        class = decl.class_name,
    ));
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_attributes() {
        let decl = StepDecl {
            class_name: "ValidateAccountStep".to_string(),
            context_class: "PaymentContext".to_string(),
            params: vec!["strictMode".to_string(), "region".to_string()],
        };
        let expected = "\
package com.acme.payments;

// Generated by fragua as a skeleton. Implement execute() and keep this file.
public class ValidateAccountStep implements ServiceStep<PaymentContext> {

    private final String strictMode;
    private final String region;

    public ValidateAccountStep(String strictMode, String region) {
        this.strictMode = strictMode;
        this.region = region;
    }

    @Override
    public int execute(PaymentContext context) {
        throw new UnsupportedOperationException(\"ValidateAccountStep.execute is not implemented\");
    }
}
";
        assert_eq!(render(&decl, "com.acme.payments"), expected);
    }

    #[test]
    fn test_render_no_attributes() {
        let decl = StepDecl {
            class_name: "PostEntryStep".to_string(),
            context_class: "PaymentContext".to_string(),
            params: vec![],
        };
        let text = render(&decl, "com.acme");
        assert!(!text.contains("private final"));
        assert!(!text.contains("public PostEntryStep("));
        assert!(text.contains("implements ServiceStep<PaymentContext>"));
    }

    #[test]
    fn test_no_setters_for_attributes() {
        let decl = StepDecl {
            class_name: "CheckStep".to_string(),
            context_class: "C".to_string(),
            params: vec!["mode".to_string()],
        };
        let text = render(&decl, "com.acme");
        assert!(!text.contains("setMode"));
    }
}
