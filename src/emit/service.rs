//! Service renderer — one class per operation.
//!
//! The public entry operation builds the context and hands it to the first
//! step's private routing method. Each routing method executes its step and
//! dispatches on the outcome: one case per declared code in source order
//! (equal destinations stay separate cases), a default arm iff an `other`
//! policy was declared, and a trailing failure throw otherwise. A step
//! without an implementation compiles to an explicit failure signal.

use super::{escape_java, GENERATED_HEADER, INDENT};
use crate::core::types::{Dispatch, DispatchAction, ServiceDecl};

pub fn render(decl: &ServiceDecl, package: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("package {};\n\n", package));
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    out.push_str(&format!("public class {} {{\n", decl.class_name));

    let wired: Vec<_> = decl
        .bindings
        .iter()
        .filter(|b| b.step_class.is_some())
        .collect();

    if !wired.is_empty() {
        out.push('\n');
        for binding in &wired {
            out.push_str(&format!(
                "{}private final {} {};\n",
                INDENT,
                binding.step_class.as_deref().unwrap(),
                binding.field_name
            ));
        }
        out.push('\n');
        out.push_str(&format!("{}public {}() {{\n", INDENT, decl.class_name));
        for binding in &wired {
            let args = binding
                .ctor_args
                .iter()
                .map(|v| format!("\"{}\"", escape_java(v)))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{i}{i}this.{field} = new {class}({args});\n",
                i = INDENT,
                field = binding.field_name,
                class = binding.step_class.as_deref().unwrap(),
                args = args,
            ));
        }
        out.push_str(&format!("{}}}\n", INDENT));
    }

    out.push('\n');
    out.push_str(&format!(
        "{i}public {rs} execute({rq} request) {{\n\
         {i}{i}{ctx} context = new {ctx}();\n\
         {i}{i}context.setRequest(request);\n\
         {i}{i}context.setResponse(new {rs}());\n\
         {i}{i}return {entry}(context);\n\
         {i}}}\n",
        i = INDENT,
        rs = decl.response_class,
        rq = decl.request_class,
        ctx = decl.context_class,
        entry = decl.entry_method,
    ));

    for dispatch in &decl.dispatches {
        out.push('\n');
        render_dispatch(&mut out, decl, dispatch);
    }

    out.push_str("}\n");
    out
}

fn render_dispatch(out: &mut String, decl: &ServiceDecl, dispatch: &Dispatch) {
    out.push_str(&format!(
        "{i}private {rs} {method}({ctx} context) {{\n",
        i = INDENT,
        rs = decl.response_class,
        method = dispatch.method_name,
        ctx = decl.context_class,
    ));

    if !dispatch.has_impl {
        // Explicit failure signal, never a silent pass-through.
        out.push_str(&format!(
            "{i}{i}throw new OperationFailedException(\"{step}\", -1);\n{i}}}\n",
            i = INDENT,
            step = escape_java(&dispatch.step_id),
        ));
        return;
    }

    out.push_str(&format!(
        "{i}{i}int outcome = {field}.execute(context);\n",
        i = INDENT,
        field = dispatch.field_name,
    ));

    if dispatch.cases.is_empty() && dispatch.default.is_none() {
        out.push_str(&format!(
            "{i}{i}throw new OperationFailedException(\"{step}\", outcome);\n{i}}}\n",
            i = INDENT,
            step = escape_java(&dispatch.step_id),
        ));
        return;
    }

    out.push_str(&format!("{i}{i}switch (outcome) {{\n", i = INDENT));
    for case in &dispatch.cases {
        out.push_str(&format!("{i}{i}{i}case {}:\n", case.code, i = INDENT));
        out.push_str(&action_line(&case.action, &dispatch.step_id, 4));
    }
    if let Some(default) = &dispatch.default {
        out.push_str(&format!("{i}{i}{i}default:\n", i = INDENT));
        out.push_str(&action_line(default, &dispatch.step_id, 4));
    }
    out.push_str(&format!("{i}{i}}}\n", i = INDENT));

    // With a default arm every path already terminates; a trailing throw
    // would be unreachable and javac rejects it.
    if dispatch.default.is_none() {
        out.push_str(&format!(
            "{i}{i}throw new OperationFailedException(\"{step}\", outcome);\n",
            i = INDENT,
            step = escape_java(&dispatch.step_id),
        ));
    }
    out.push_str(&format!("{i}}}\n", i = INDENT));
}

fn action_line(action: &DispatchAction, step_id: &str, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    match action {
        DispatchAction::Continue { method } => format!("{}return {}(context);\n", pad, method),
        DispatchAction::ReturnResponse => format!("{}return context.getResponse();\n", pad),
        DispatchAction::Fail => format!(
            "{}throw new OperationFailedException(\"{}\", outcome);\n",
            pad,
            escape_java(step_id)
        ),
    }
}
