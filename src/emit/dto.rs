//! DTO renderer — one bean-style class per opaque format.

use super::{import_block, push_accessors, GENERATED_HEADER, INDENT};
use crate::core::types::DtoDecl;

/// Render a DTO class: private fields in source order, then a getter/setter
/// pair per field.
pub fn render(decl: &DtoDecl, package: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("package {};\n\n", package));
    out.push_str(&import_block(&decl.fields));
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    out.push_str(&format!("public class {} {{\n", decl.class_name));

    if !decl.fields.is_empty() {
        out.push('\n');
        for field in &decl.fields {
            out.push_str(&format!(
                "{}private {} {};\n",
                INDENT, field.ty.name, field.name
            ));
        }
        for field in &decl.fields {
            out.push('\n');
            push_accessors(&mut out, field);
        }
    }

    out.push_str("}\n");
    out
}
