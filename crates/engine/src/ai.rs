// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI provider seam for the `ai` step handler.
//!
//! Providers produce an ordered item list (thinking rounds, streamed
//! chunks, tool calls) plus the final text; the handler replays them
//! through the callback surface in order.

use async_trait::async_trait;
use fl_core::FlowError;
use serde_json::Value;

/// One observable item of an AI generation, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum AiItem {
    Thinking { round: u32, content: String },
    Chunk(String),
    ToolCall { tool: String, arguments: Value, result: Option<Value> },
}

/// A finished generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiResponse {
    pub items: Vec<AiItem>,
    pub text: String,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(&self, step_id: &str, prompt: &str) -> Result<AiResponse, FlowError>;
}

/// Deterministic provider: replays a canned response, or echoes the prompt
/// as a single chunk when none is scripted. Also the default provider for
/// hosts that wire no real model.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    response: Option<AiResponse>,
    error: Option<String>,
}

impl ScriptedProvider {
    pub fn with_response(response: AiResponse) -> Self {
        Self { response: Some(response), error: None }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self { response: None, error: Some(error.into()) }
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn generate(&self, _step_id: &str, prompt: &str) -> Result<AiResponse, FlowError> {
        if let Some(error) = &self.error {
            return Err(FlowError::Ai(error.clone()));
        }
        match &self.response {
            Some(response) => Ok(response.clone()),
            None => Ok(AiResponse {
                items: vec![AiItem::Chunk(prompt.to_string())],
                text: prompt.to_string(),
            }),
        }
    }
}
