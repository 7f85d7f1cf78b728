//! 题源准备：请求没有自带原文时，请模型写一篇

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::clients::{ModelClient, PassageProvider};
use crate::error::CollaboratorError;
use crate::models::{GenerationRequest, ItemCategory};
use crate::utils::truncate_text;

const SYSTEM: &str = "You write original English passages for reading and listening tests. \
Reply with the passage text only.";

/// 基于 LLM 的题源服务
pub struct LlmPassageProvider {
    model: Arc<dyn ModelClient>,
}

impl LlmPassageProvider {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    fn instruction(request: &GenerationRequest) -> String {
        let form = match request.item_type.category() {
            ItemCategory::Listening => "a listening script with one turn per line, each starting with \"M:\" or \"W:\"",
            _ => "a single coherent passage",
        };
        format!(
            "Write {} for item type {} ({}). Topic: {}. Difficulty: {}.",
            form,
            request.item_type.code(),
            request.item_type.name(),
            if request.topic_hint.is_empty() { "any" } else { request.topic_hint.as_str() },
            if request.difficulty_hint.is_empty() { "medium" } else { request.difficulty_hint.as_str() },
        )
    }
}

#[async_trait]
impl PassageProvider for LlmPassageProvider {
    async fn provision(&self, request: &GenerationRequest) -> Result<String, CollaboratorError> {
        let text = self
            .model
            .invoke(SYSTEM, &Self::instruction(request))
            .await
            .map_err(|e| CollaboratorError::PassageProvisioning {
                message: e.to_string(),
            })?;

        if text.trim().is_empty() {
            return Err(CollaboratorError::PassageProvisioning {
                message: "模型返回的原文为空".to_string(),
            });
        }
        debug!("已生成原文: {}", truncate_text(&text, 60));
        Ok(text.trim().to_string())
    }
}
