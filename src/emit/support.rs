//! Shared support declarations — the step capability interface and the
//! operation-failure exception, emitted once per package.

use super::GENERATED_HEADER;

pub fn render_interface(package: &str) -> String {
    format!(
        "package {package};\n\
         \n\
         {header}\n\
         public interface ServiceStep<C> {{\n\
         \n\
         \x20   int execute(C context);\n\
         }}\n",
        package = package,
        header = GENERATED_HEADER,
    )
}

pub fn render_exception(package: &str) -> String {
    format!(
        "package {package};\n\
         \n\
         {header}\n\
         public class OperationFailedException extends RuntimeException {{\n\
         \n\
         \x20   private final String stepId;\n\
         \x20   private final int outcome;\n\
         \n\
         \x20   public OperationFailedException(String stepId, int outcome) {{\n\
         \x20       super(\"step '\" + stepId + \"' terminated operation with outcome \" + outcome);\n\
         \x20       this.stepId = stepId;\n\
         \x20       this.outcome = outcome;\n\
         \x20   }}\n\
         \n\
         \x20   public String getStepId() {{\n\
         \x20       return stepId;\n\
         \x20   }}\n\
         \n\
         \x20   public int getOutcome() {{\n\
         \x20       return outcome;\n\
         \x20   }}\n\
         }}\n",
        package = package,
        header = GENERATED_HEADER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface() {
        let text = render_interface("com.acme");
        assert!(text.starts_with("package com.acme;\n"));
        assert!(text.contains("public interface ServiceStep<C> {"));
        assert!(text.contains("int execute(C context);"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_exception() {
        let text = render_exception("com.acme");
        assert!(text.contains("public class OperationFailedException extends RuntimeException {"));
        assert!(text.contains("public OperationFailedException(String stepId, int outcome) {"));
        assert!(text.contains("public int getOutcome() {"));
    }

    #[test]
    fn test_indentation_is_four_spaces() {
        let text = render_interface("com.acme");
        assert!(text.contains("\n    int execute(C context);\n"));
    }
}
