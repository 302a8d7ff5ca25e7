//! YAML DSL parser and validator for workflow definitions.

use crate::error::WorkflowError;
use crate::workflow::templates::extract_references;
use crate::workflow::types::WorkflowDefinition;
use std::collections::HashSet;

/// Parse a workflow definition from a YAML string.
pub fn parse_workflow(yaml: &str) -> Result<WorkflowDefinition, WorkflowError> {
    serde_yaml::from_str::<WorkflowDefinition>(yaml).map_err(|e| WorkflowError::ParseError {
        message: e.to_string(),
    })
}

/// Validate a parsed workflow definition for structural correctness.
///
/// Checks:
/// - At least one step exists
/// - No duplicate step IDs
/// - All template step references point to earlier steps
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Result<(), WorkflowError> {
    // Must have at least one step
    if workflow.steps.is_empty() {
        return Err(WorkflowError::ValidationFailed {
            message: "Workflow must have at least one step".to_string(),
        });
    }

    // Check for duplicate step IDs
    let mut seen_ids = HashSet::new();
    for step in &workflow.steps {
        if !seen_ids.insert(&step.id) {
            return Err(WorkflowError::ValidationFailed {
                message: format!("Duplicate step ID: '{}'", step.id),
            });
        }
    }

    // Validate that template references point to known steps
    let step_ids: HashSet<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();
    let input_names: HashSet<&str> = workflow.inputs.iter().map(|i| i.name.as_str()).collect();

    for (idx, step) in workflow.steps.iter().enumerate() {
        let earlier_steps: HashSet<&str> =
            workflow.steps[..idx].iter().map(|s| s.id.as_str()).collect();

        // Check param templates
        for value in step.params.values() {
            if let Some(s) = value.as_str() {
                check_template_refs(s, &earlier_steps, &input_names, &step.id)?;
            }
        }

        // Check condition template
        if let Some(cond) = &step.condition {
            check_template_refs(cond, &earlier_steps, &input_names, &step.id)?;
        }

        // Check gate preview/message templates
        if let Some(msg) = &step.gate_message {
            check_template_refs(msg, &earlier_steps, &input_names, &step.id)?;
        }
        if let Some(preview) = &step.gate_preview {
            check_template_refs(preview, &earlier_steps, &input_names, &step.id)?;
        }
    }

    // Validate output templates
    for output in &workflow.outputs {
        let all_steps: HashSet<&str> = step_ids.iter().copied().collect();
        check_template_refs(&output.value, &all_steps, &input_names, "output")?;
    }

    Ok(())
}

/// Check that all template references in a string point to known steps/inputs.
fn check_template_refs(
    template: &str,
    known_steps: &HashSet<&str>,
    known_inputs: &HashSet<&str>,
    context_step: &str,
) -> Result<(), WorkflowError> {
    let refs = extract_references(template);
    for (namespace, name) in refs {
        match namespace.as_str() {
            "steps" => {
                if !known_steps.contains(name.as_str()) {
                    return Err(WorkflowError::ValidationFailed {
                        message: format!(
                            "Step '{}' references unknown step '{}' (steps must reference earlier steps)",
                            context_step, name
                        ),
                    });
                }
            }
            "inputs" => {
                if !known_inputs.contains(name.as_str()) {
                    return Err(WorkflowError::ValidationFailed {
                        message: format!(
                            "Step '{}' references unknown input '{}'",
                            context_step, name
                        ),
                    });
                }
            }
            _ => {
                return Err(WorkflowError::ValidationFailed {
                    message: format!(
                        "Step '{}' has unknown template namespace '{}'",
                        context_step, namespace
                    ),
                });
            }
        }
    }
    Ok(())
}
