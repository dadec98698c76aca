// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow document.
//!
//! Clients submit this tree opaquely; the orchestrator only ever writes the
//! `variables` map (merging request overrides) before handing it to an
//! executor. Steps may nest sub-steps with an iteration count.

use crate::error::FlowError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workflow definition as supplied by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "ExecutionOptions::is_default")]
    pub options: ExecutionOptions,
}

impl Workflow {
    /// Merge request-level variables over the document's own. Request wins.
    pub fn merge_variables(&mut self, overrides: &IndexMap<String, Value>) {
        for (k, v) in overrides {
            self.variables.insert(k.clone(), v.clone());
        }
    }

    /// Number of leaf step executions, counting iterations. Drives progress
    /// percentages.
    pub fn leaf_count(&self) -> u64 {
        fn count(steps: &[Step]) -> u64 {
            steps
                .iter()
                .map(|s| {
                    if s.sub_steps.is_empty() {
                        1
                    } else {
                        count(&s.sub_steps) * u64::from(s.iterations.max(1))
                    }
                })
                .sum()
        }
        count(&self.steps)
    }

    /// Structural validation. Rejects steps without ids or types and
    /// duplicate step ids anywhere in the tree.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut seen = std::collections::HashSet::new();
        fn walk<'a>(
            steps: &'a [Step],
            seen: &mut std::collections::HashSet<&'a str>,
        ) -> Result<(), FlowError> {
            for step in steps {
                if step.id.is_empty() {
                    return Err(FlowError::Conversion("step without id".into()));
                }
                if step.step_type.is_empty() {
                    return Err(FlowError::Conversion(format!(
                        "step {} without type",
                        step.id
                    )));
                }
                if !seen.insert(step.id.as_str()) {
                    return Err(FlowError::Conversion(format!(
                        "duplicate step id: {}",
                        step.id
                    )));
                }
                walk(&step.sub_steps, seen)?;
            }
            Ok(())
        }
        walk(&self.steps, &mut seen)
    }
}

/// One node of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnErrorPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_steps: Vec<Step>,
    /// How many times the sub-step group runs. Ignored for leaves.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    1
}

impl Step {
    pub fn leaf(id: impl Into<String>, step_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            step_type: step_type.into(),
            params: IndexMap::new(),
            on_error: None,
            sub_steps: Vec::new(),
            iterations: 1,
        }
    }

    /// Failure policy, defaulting to abort when unset.
    pub fn effective_policy(&self) -> OnErrorPolicy {
        self.on_error.unwrap_or(OnErrorPolicy::Abort)
    }
}

/// What the run loop does when this step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnErrorPolicy {
    Abort,
    Continue,
}

/// Execution knobs carried on the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Environment overlay reflected back in the terminal event.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ExecutionOptions {
    fn is_default(&self) -> bool {
        self.environment.is_empty() && self.timeout_secs.is_none()
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
