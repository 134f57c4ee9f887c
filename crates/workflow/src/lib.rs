// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roboppi-workflow: workflow and agent-catalog definitions.
//!
//! A workflow is a YAML-defined DAG of steps; each step invokes an external
//! worker. Definitions are immutable after load: parsing produces a
//! [`WorkflowDef`] that validation has already proven acyclic.

mod catalog;
mod def;
mod load;
mod template;
mod validate;

pub use catalog::{AgentCatalog, AgentProfile};
pub use def::{
    CompletionCheckDef, OnFailure, OnIterationsExhausted, StepDef, WorkflowDef,
    DEFAULT_MAX_ITERATIONS,
};
pub use load::{load_agent_catalog, load_workflow, LoadError};
pub use template::expand;
pub use validate::{transitive_dependents, validate, ValidationError};
