//! Mixture-of-Experts (MoE) agentic architecture.
//!
//! Routes tasks to specialized expert agents, each with focused toolsets (5-12
//! domain tools + 8 shared tools), reducing per-request tool token overhead
//! from 25K-35K to 3K-7K while preserving full capability across all 195+ tools.
//!
//! # DeepSeek V3-Inspired Architecture
//!
//! ```text
//! User Task --> [SparseRouter] --> score 20 experts --> Top-K --> merge tools --> result
//!                   |                                    |
//!             Sigmoid scoring                    Mixed-precision schemas
//!             + bias adaptation                  (Full/Half/Quarter)
//!             + token budget cap                 8 shared always-on
//! ```
//!
//! The router uses sigmoid-style keyword affinity scoring (independent per expert,
//! not competitive softmax), selects Top-K (K=1-3) experts, merges their tool sets
//! with mixed-precision schemas, and applies token budget constraints.

pub mod context;
pub mod experts;
pub mod prompt_optimizer;
pub mod router;
pub mod warmup;

pub use experts::{ExpertConfig, ExpertId};
pub use prompt_optimizer::PromptOptimizer;
pub use router::{MoeConfig, MoeRouter, SparseRouteResult, ToolPrecision};
