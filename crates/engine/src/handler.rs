// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step handlers, dispatched by step `type`.
//!
//! Hosts extend the registry with their own handlers; the built-in set
//! covers control-flow plumbing and the AI step.

use crate::ai::{AiItem, AiProvider, ScriptedProvider};
use crate::callback::{ExecutionCallback, InteractionRequest};
use async_trait::async_trait;
use fl_core::{FlowError, Step};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Execution context handed to a handler for one step.
pub struct StepContext<'a> {
    pub step: &'a Step,
    pub variables: &'a mut IndexMap<String, Value>,
    pub callback: &'a dyn ExecutionCallback,
    pub cancel: &'a CancellationToken,
}

impl StepContext<'_> {
    fn param_str(&self, key: &str) -> Option<&str> {
        self.step.params.get(key).and_then(Value::as_str)
    }

    fn param_u64(&self, key: &str) -> Option<u64> {
        self.step.params.get(key).and_then(Value::as_u64)
    }
}

/// One step type's implementation. Returns the step output on success; an
/// error marks the step failed with the error's rendering.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError>;
}

/// Registry of handlers keyed by step `type`.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// The built-in handler set with the default (scripted) AI provider.
    pub fn builtin() -> Self {
        Self::builtin_with_ai(Arc::new(ScriptedProvider::default()))
    }

    /// Built-ins with a caller-supplied AI provider.
    pub fn builtin_with_ai(provider: Arc<dyn AiProvider>) -> Self {
        let mut registry = Self::new();
        registry.register("noop", Arc::new(NoopHandler));
        registry.register("wait", Arc::new(WaitHandler));
        registry.register("set_vars", Arc::new(SetVarsHandler));
        registry.register("fail", Arc::new(FailHandler));
        registry.register("confirm", Arc::new(ConfirmHandler));
        registry.register("ai", Arc::new(AiHandler { provider }));
        registry
    }

    pub fn register(&mut self, step_type: impl Into<String>, handler: Arc<dyn StepHandler>) {
        self.handlers.insert(step_type.into(), handler);
    }

    pub fn get(&self, step_type: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(step_type).cloned()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Does nothing, successfully.
struct NoopHandler;

#[async_trait]
impl StepHandler for NoopHandler {
    async fn run(&self, _ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        Ok(None)
    }
}

/// Sleeps for `duration_ms`, cancellable.
struct WaitHandler;

#[async_trait]
impl StepHandler for WaitHandler {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        let ms = ctx.param_u64("duration_ms").unwrap_or(0);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(None),
            _ = ctx.cancel.cancelled() => Err(FlowError::Cancelled),
        }
    }
}

/// Writes `vars` entries into the execution's variable map.
struct SetVarsHandler;

#[async_trait]
impl StepHandler for SetVarsHandler {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        let Some(vars) = ctx.step.params.get("vars").and_then(Value::as_object).cloned() else {
            return Err(FlowError::InvalidInput("set_vars requires a vars object".into()));
        };
        for (k, v) in vars {
            ctx.variables.insert(k, v);
        }
        Ok(None)
    }
}

/// Fails with `message`. Exists for fixtures and fault injection.
struct FailHandler;

#[async_trait]
impl StepHandler for FailHandler {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        let message = ctx.param_str("message").unwrap_or("step failed").to_string();
        Err(FlowError::Executor(message))
    }
}

/// Pauses for a human reply via `on_interaction`.
struct ConfirmHandler;

#[async_trait]
impl StepHandler for ConfirmHandler {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        let request = InteractionRequest {
            step_id: ctx.step.id.clone(),
            prompt: ctx.param_str("prompt").unwrap_or_default().to_string(),
            timeout_secs: ctx.param_u64("timeout").unwrap_or(0),
        };
        let reply = ctx.callback.on_interaction(&request).await;
        let store_as = ctx.param_str("store_as").map(str::to_string);
        if let Some(store_as) = store_as {
            let value = reply.value.clone().unwrap_or(Value::Null);
            ctx.variables.insert(store_as, value);
        }
        Ok(Some(serde_json::json!({
            "skipped": reply.skipped,
            "value": reply.value,
        })))
    }
}

/// Runs one AI generation and replays its stream through the callbacks.
struct AiHandler {
    provider: Arc<dyn AiProvider>,
}

#[async_trait]
impl StepHandler for AiHandler {
    async fn run(&self, ctx: StepContext<'_>) -> Result<Option<Value>, FlowError> {
        let step_id = ctx.step.id.as_str();
        let prompt = ctx.param_str("prompt").unwrap_or_default().to_string();

        let generation = match ctx.param_u64("timeout_ms") {
            Some(ms) => {
                match tokio::time::timeout(
                    Duration::from_millis(ms),
                    self.provider.generate(step_id, &prompt),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FlowError::AiTimeout(format!("after {ms}ms"))),
                }
            }
            None => self.provider.generate(step_id, &prompt).await,
        };

        let response = match generation {
            Ok(response) => response,
            Err(err) => {
                ctx.callback.on_ai_error(step_id, &err.to_string()).await;
                return Err(err);
            }
        };

        for item in &response.items {
            match item {
                AiItem::Thinking { round, content } => {
                    ctx.callback.on_ai_thinking(step_id, *round, content).await;
                }
                AiItem::Chunk(content) => {
                    ctx.callback.on_ai_chunk(step_id, content).await;
                }
                AiItem::ToolCall { tool, arguments, result } => {
                    ctx.callback.on_ai_tool_call_start(step_id, tool, arguments).await;
                    ctx.callback
                        .on_ai_tool_call_complete(step_id, tool, result.as_ref())
                        .await;
                }
            }
        }
        ctx.callback.on_ai_complete(step_id, &response.text).await;

        let store_as = ctx.param_str("store_as").map(str::to_string);
        if let Some(store_as) = store_as {
            ctx.variables
                .insert(store_as, Value::String(response.text.clone()));
        }
        Ok(Some(Value::String(response.text)))
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
