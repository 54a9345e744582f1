//! Context renderer — one mutable carrier class per context.
//!
//! Member order is fixed: parent delegation first, then request/response,
//! then the declared custom fields. The parent is an accessor holding the
//! parent carrier instance, not a Java superclass.

use super::{import_block, push_accessors, GENERATED_HEADER, INDENT};
use crate::core::types::{ContextDecl, JavaField, JavaType};

pub fn render(decl: &ContextDecl, package: &str) -> String {
    let mut members: Vec<JavaField> = Vec::new();
    if let Some(parent) = &decl.parent_class {
        members.push(JavaField {
            name: "parent".to_string(),
            ty: JavaType::plain(parent.clone()),
        });
    }
    if let Some(request) = &decl.request_class {
        members.push(JavaField {
            name: "request".to_string(),
            ty: JavaType::plain(request.clone()),
        });
    }
    if let Some(response) = &decl.response_class {
        members.push(JavaField {
            name: "response".to_string(),
            ty: JavaType::plain(response.clone()),
        });
    }
    members.extend(decl.fields.iter().cloned());

    let mut out = String::new();
    out.push_str(&format!("package {};\n\n", package));
    out.push_str(&import_block(&decl.fields));
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    out.push_str(&format!("public class {} {{\n", decl.class_name));

    if !members.is_empty() {
        out.push('\n');
        for member in &members {
            out.push_str(&format!(
                "{}private {} {};\n",
                INDENT, member.ty.name, member.name
            ));
        }
        for member in &members {
            out.push('\n');
            push_accessors(&mut out, member);
        }
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_operation_context() {
        let decl = ContextDecl {
            class_name: "PaymentContext".to_string(),
            parent_class: Some("SessionContext".to_string()),
            request_class: Some("PaymentRqDto".to_string()),
            response_class: Some("PaymentRsDto".to_string()),
            fields: vec![JavaField {
                name: "attemptCount".to_string(),
                ty: JavaType::plain("Integer"),
            }],
        };
        let text = render(&decl, "com.acme");
        assert!(text.contains("private SessionContext parent;"));
        assert!(text.contains("private PaymentRqDto request;"));
        assert!(text.contains("private PaymentRsDto response;"));
        assert!(text.contains("private Integer attemptCount;"));
        assert!(text.contains("public SessionContext getParent()"));
        assert!(text.contains("public void setRequest(PaymentRqDto request)"));
        // Delegation, not inheritance.
        assert!(!text.contains("extends"));
    }

    #[test]
    fn test_member_order() {
        let decl = ContextDecl {
            class_name: "C".to_string(),
            parent_class: Some("P".to_string()),
            request_class: Some("Rq".to_string()),
            response_class: Some("Rs".to_string()),
            fields: vec![],
        };
        let text = render(&decl, "com.acme");
        let parent = text.find("private P parent;").unwrap();
        let request = text.find("private Rq request;").unwrap();
        let response = text.find("private Rs response;").unwrap();
        assert!(parent < request && request < response);
    }

    #[test]
    fn test_standalone_context() {
        let decl = ContextDecl {
            class_name: "SessionContext".to_string(),
            parent_class: None,
            request_class: None,
            response_class: None,
            fields: vec![JavaField {
                name: "traceId".to_string(),
                ty: JavaType::plain("String"),
            }],
        };
        let text = render(&decl, "com.acme");
        assert!(!text.contains("request"));
        assert!(text.contains("private String traceId;"));
    }
}
