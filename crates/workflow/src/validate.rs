// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow validation: reference integrity and acyclicity.

use crate::def::WorkflowDef;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("workflow version {0:?} is not supported (expected \"1\")")]
    UnsupportedVersion(String),
    #[error("workflow has no steps")]
    NoSteps,
    #[error("step {step:?} depends on unknown step {missing:?}")]
    UnknownDependency { step: String, missing: String },
    #[error("dependency cycle involving step {0:?}")]
    Cycle(String),
    #[error("step {step:?} has no worker and no agent reference")]
    NoWorker { step: String },
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Validate a parsed definition. Unknown `depends_on` IDs and cycles are
/// rejected before the executor ever sees the workflow.
pub fn validate(def: &WorkflowDef) -> Result<(), ValidationError> {
    if def.version != "1" {
        return Err(ValidationError::UnsupportedVersion(def.version.clone()));
    }
    if def.steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    for (id, step) in &def.steps {
        if step.worker.is_none() && step.agent.is_none() {
            return Err(ValidationError::NoWorker { step: id.clone() });
        }
        for dep in &step.depends_on {
            if !def.steps.contains_key(dep) {
                return Err(ValidationError::UnknownDependency {
                    step: id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    // Iterative DFS with visiting/done marks; a back edge is a cycle.
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for root in def.steps.keys() {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        // Stack of (node, next dependency index)
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        marks.insert(root.as_str(), Mark::Visiting);
        while let Some((node, dep_idx)) = stack.pop() {
            let deps = def.steps.get(node).map(|s| &s.depends_on);
            let Some(deps) = deps else { continue };
            if dep_idx < deps.len() {
                stack.push((node, dep_idx + 1));
                let dep = deps[dep_idx].as_str();
                match marks.get(dep) {
                    Some(Mark::Visiting) => return Err(ValidationError::Cycle(dep.to_string())),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        stack.push((dep, 0));
                    }
                }
            } else {
                marks.insert(node, Mark::Done);
            }
        }
    }

    Ok(())
}

/// Step IDs whose transitive dependencies include `origin`.
///
/// Used by the executor to mark dependents SKIPPED when a step fails under
/// an abort policy.
pub fn transitive_dependents(def: &WorkflowDef, origin: &str) -> Vec<String> {
    let mut affected: Vec<String> = Vec::new();
    let mut changed = true;
    while changed {
        changed = false;
        for (id, step) in &def.steps {
            if affected.iter().any(|a| a == id) {
                continue;
            }
            let hit = step
                .depends_on
                .iter()
                .any(|d| d == origin || affected.iter().any(|a| a == d));
            if hit {
                affected.push(id.clone());
                changed = true;
            }
        }
    }
    affected
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
