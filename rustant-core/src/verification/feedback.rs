//! Verification feedback — formats failures into messages for the agent's conversation.

use super::{DiagnosticSeverity, VerificationResult};

/// Format a verification result into a feedback message for the agent.
///
/// This message is injected as an observation to trigger self-healing.
pub fn format_feedback(result: &VerificationResult) -> String {
    if result.passed {
        return "Verification passed: all lint, type, and test checks are green.".to_string();
    }

    let mut feedback = String::from("## Verification Failed\n\n");

    // Lint errors
    let lint_errors: Vec<_> = result
        .lint_errors
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    if !lint_errors.is_empty() {
        feedback.push_str(&format!("### Lint Errors ({})\n", lint_errors.len()));
        for (i, err) in lint_errors.iter().enumerate().take(10) {
            let location = if let Some(line) = err.line {
                format!("{}:{}", err.file, line)
            } else if !err.file.is_empty() {
                err.file.clone()
            } else {
                "unknown".to_string()
            };
            feedback.push_str(&format!("{}. [{}] {}\n", i + 1, location, err.message));
        }
        if lint_errors.len() > 10 {
            feedback.push_str(&format!("... and {} more\n", lint_errors.len() - 10));
        }
        feedback.push('\n');
    }

    // Type errors
    let type_errors: Vec<_> = result
        .type_errors
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    if !type_errors.is_empty() {
        feedback.push_str(&format!("### Type Errors ({})\n", type_errors.len()));
        for (i, err) in type_errors.iter().enumerate().take(10) {
            let location = if let Some(line) = err.line {
                format!("{}:{}", err.file, line)
            } else if !err.file.is_empty() {
                err.file.clone()
            } else {
                "unknown".to_string()
            };
            feedback.push_str(&format!("{}. [{}] {}\n", i + 1, location, err.message));
        }
        if type_errors.len() > 10 {
            feedback.push_str(&format!("... and {} more\n", type_errors.len() - 10));
        }
        feedback.push('\n');
    }

    // Test failures
    if !result.test_failures.is_empty() {
        feedback.push_str(&format!(
            "### Test Failures ({})\n",
            result.test_failures.len()
        ));
        for (i, fail) in result.test_failures.iter().enumerate().take(10) {
            feedback.push_str(&format!(
                "{}. {} — {}\n",
                i + 1,
                fail.test_name,
                fail.message
            ));
        }
        if result.test_failures.len() > 10 {
            feedback.push_str(&format!(
                "... and {} more\n",
                result.test_failures.len() - 10
            ));
        }
        feedback.push('\n');
    }

    feedback.push_str("Please fix these issues and try again.\n");
    feedback
}
