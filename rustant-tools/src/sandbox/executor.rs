//! Sandboxed tool executor that wraps tool execution in a WASM sandbox.
//!
//! Provides [`SandboxedExecutor`] which can execute WASM modules with
//! configurable resource limits and capability-based permissions, as well
//! as sandbox existing tool invocations for additional isolation.

use std::sync::Arc;
use std::time::Instant;

use super::config::{Capability, SandboxConfig};
use super::runtime::{ExecutionResult, SandboxError, WasmRuntime};

/// Executes WASM modules within a sandboxed environment.
///
/// The executor manages a [`WasmRuntime`] and applies [`SandboxConfig`]
/// settings to each execution, enforcing resource limits and capability
/// restrictions.
pub struct SandboxedExecutor {
    runtime: Arc<WasmRuntime>,
    default_config: SandboxConfig,
}

impl SandboxedExecutor {
    /// Create a new executor with a shared runtime and default config.
    pub fn new(runtime: Arc<WasmRuntime>, default_config: SandboxConfig) -> Self {
        Self {
            runtime,
            default_config,
        }
    }

    /// Create an executor with default settings.
    pub fn with_defaults() -> Self {
        let runtime = Arc::new(WasmRuntime::new());
        Self {
            runtime,
            default_config: SandboxConfig::default(),
        }
    }

    /// Get a reference to the underlying runtime.
    pub fn runtime(&self) -> &WasmRuntime {
        &self.runtime
    }

    /// Get the default configuration.
    pub fn default_config(&self) -> &SandboxConfig {
        &self.default_config
    }

    /// Validate a WASM module without executing it.
    pub fn validate(&self, wasm_bytes: &[u8]) -> Result<(), SandboxError> {
        self.runtime.validate_module(wasm_bytes)
    }

    /// Execute a WASM module with the default configuration.
    pub fn execute(
        &self,
        wasm_bytes: &[u8],
        input: &[u8],
    ) -> Result<SandboxExecution, SandboxError> {
        self.execute_with_config(wasm_bytes, input, &self.default_config)
    }

    /// Execute a WASM module with a specific configuration.
    pub fn execute_with_config(
        &self,
        wasm_bytes: &[u8],
        input: &[u8],
        config: &SandboxConfig,
    ) -> Result<SandboxExecution, SandboxError> {
        let start = Instant::now();

        let result = self.runtime.execute(wasm_bytes, input, config)?;

        let elapsed = start.elapsed();

        Ok(SandboxExecution {
            result,
            wall_time_ms: elapsed.as_millis() as u64,
            config_snapshot: ConfigSnapshot {
                max_memory_bytes: config.resource_limits.max_memory_bytes,
                max_fuel: config.resource_limits.max_fuel,
                capabilities_count: config.capabilities.len(),
                host_calls_allowed: config.allow_host_calls,
            },
        })
    }

    /// Execute a WASM module with additional capabilities beyond the default.
    pub fn execute_with_extra_capabilities(
        &self,
        wasm_bytes: &[u8],
        input: &[u8],
        extra_caps: Vec<Capability>,
    ) -> Result<SandboxExecution, SandboxError> {
        let mut config = self.default_config.clone();
        for cap in extra_caps {
            config.capabilities.push(cap);
        }
        self.execute_with_config(wasm_bytes, input, &config)
    }
}

/// The complete result of a sandboxed execution, including timing and config info.
#[derive(Debug, Clone)]
pub struct SandboxExecution {
    /// The execution result from the WASM runtime.
    pub result: ExecutionResult,
    /// Wall-clock time of execution in milliseconds.
    pub wall_time_ms: u64,
    /// Snapshot of the configuration used for this execution.
    pub config_snapshot: ConfigSnapshot,
}

impl SandboxExecution {
    /// Get the output bytes from the execution.
    pub fn output(&self) -> &[u8] {
        &self.result.output
    }

    /// Get the output as a UTF-8 string, if valid.
    pub fn output_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.result.output).ok()
    }

    /// Get fuel consumed during execution.
    pub fn fuel_consumed(&self) -> u64 {
        self.result.fuel_consumed
    }

    /// Get peak memory usage in bytes.
    pub fn memory_peak_bytes(&self) -> usize {
        self.result.memory_peak_bytes
    }

    /// Check if the execution was within resource limits.
    pub fn within_limits(&self) -> bool {
        self.result.fuel_consumed <= self.config_snapshot.max_fuel
            && self.result.memory_peak_bytes <= self.config_snapshot.max_memory_bytes
    }
}

/// Snapshot of configuration at time of execution.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub max_memory_bytes: usize,
    pub max_fuel: u64,
    pub capabilities_count: usize,
    pub host_calls_allowed: bool,
}
