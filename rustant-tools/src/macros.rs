//! Tool definition macros — reduce boilerplate when implementing the `Tool` trait.
//!
//! # Usage
//!
//! ## Unit struct (no fields)
//!
//! ```rust,ignore
//! define_tool!(
//!     MyTool,
//!     "my_tool",
//!     "Does something useful.",
//!     ReadOnly,
//!     serde_json::json!({
//!         "type": "object",
//!         "properties": {
//!             "input": { "type": "string", "description": "The input" }
//!         },
//!         "required": ["input"]
//!     }),
//!     |args| {
//!         let input = args["input"]
//!             .as_str()
//!             .ok_or_else(|| ToolError::InvalidArguments {
//!                 name: "my_tool".to_string(),
//!                 reason: "missing 'input'".to_string(),
//!             })?;
//!         Ok(ToolOutput::text(input.to_string()))
//!     }
//! );
//! ```
//!
//! ## Struct with fields
//!
//! ```rust,ignore
//! define_tool!(
//!     MyTool { workspace: std::path::PathBuf },
//!     "my_tool",
//!     "Does something useful with a workspace.",
//!     Write,
//!     serde_json::json!({
//!         "type": "object",
//!         "properties": {
//!             "path": { "type": "string", "description": "File path" }
//!         },
//!         "required": ["path"]
//!     }),
//!     |self_, args| {
//!         let path = args["path"]
//!             .as_str()
//!             .ok_or_else(|| ToolError::InvalidArguments {
//!                 name: "my_tool".to_string(),
//!                 reason: "missing 'path'".to_string(),
//!             })?;
//!         Ok(ToolOutput::text(format!("{}: {}", self_.workspace.display(), path)))
//!     }
//! );
//! ```

/// Define a tool with minimal boilerplate.
///
/// Generates:
/// - The struct definition (unit or with named fields)
/// - `#[async_trait]` impl of `crate::registry::Tool`
/// - All required methods: `name()`, `description()`, `parameters_schema()`,
///   `execute()`, `risk_level()`
///
/// # Variants
///
/// **Unit struct** (no fields):
/// ```text
/// define_tool!(Name, "name", "description", RiskLevel, schema_expr, |args| { body })
/// ```
///
/// **Struct with fields**:
/// ```text
/// define_tool!(Name { field: Type, ... }, "name", "description", RiskLevel, schema_expr, |self_, args| { body })
/// ```
///
/// The closure body must return `Result<ToolOutput, ToolError>`. Inside the body,
/// `ToolOutput`, `ToolError`, and `serde_json::Value` are all in scope from the
/// surrounding module's imports.
#[macro_export]
macro_rules! define_tool {
    // ── Case 1: Unit struct (no fields) ──────────────────────────────────
    (
        $name:ident,
        $tool_name:expr,
        $desc:expr,
        $risk:ident,
        $schema:expr,
        |$args:ident| $body:expr
    ) => {
        pub struct $name;

        #[async_trait::async_trait]
        impl $crate::registry::Tool for $name {
            fn name(&self) -> &str {
                $tool_name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn parameters_schema(&self) -> serde_json::Value {
                $schema
            }

            fn risk_level(&self) -> rustant_core::types::RiskLevel {
                rustant_core::types::RiskLevel::$risk
            }

            async fn execute(
                &self,
                $args: serde_json::Value,
            ) -> Result<rustant_core::types::ToolOutput, rustant_core::error::ToolError> {
                $body
            }
        }
    };

    // ── Case 2: Struct with fields ───────────────────────────────────────
    (
        $name:ident { $($field:ident : $ftype:ty),* $(,)? },
        $tool_name:expr,
        $desc:expr,
        $risk:ident,
        $schema:expr,
        |$self_:ident, $args:ident| $body:expr
    ) => {
        pub struct $name {
            $(pub $field: $ftype),*
        }

        #[async_trait::async_trait]
        impl $crate::registry::Tool for $name {
            fn name(&self) -> &str {
                $tool_name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn parameters_schema(&self) -> serde_json::Value {
                $schema
            }

            fn risk_level(&self) -> rustant_core::types::RiskLevel {
                rustant_core::types::RiskLevel::$risk
            }

            async fn execute(
                &self,
                $args: serde_json::Value,
            ) -> Result<rustant_core::types::ToolOutput, rustant_core::error::ToolError> {
                let $self_ = self;
                $body
            }
        }
    };
}
