//! OpenAI 兼容接口的模型客户端
//!
//! 生成、修复、题源、语义评审共用同一个客户端类型，模型名来自配置。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::ModelClient;
use crate::config::Config;
use crate::error::CollaboratorError;

/// 模型客户端
///
/// 不做超时与重试，重试次数由 `ItemFlow` 控制。
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let api = OpenAIConfig::new()
            .with_api_key(config.llm_api_key.as_str())
            .with_api_base(config.llm_api_base_url.as_str());

        Self {
            client: Client::with_config(api),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 单轮对话，返回去掉首尾空白的回复
    pub async fn chat(&self, user_message: &str, system_message: Option<&str>) -> Result<String, CollaboratorError> {
        debug!(
            "[{}] 发送请求 (系统指令 {} 字符, 用户指令 {} 字符)",
            self.model_name,
            system_message.map_or(0, |s| s.chars().count()),
            user_message.chars().count()
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(self.build_messages(user_message, system_message)?)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.invocation_error(e))?;

        let response = match self.client.chat().create(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[{}] 模型调用失败: {}", self.model_name, e);
                return Err(self.invocation_error(e));
            }
        };

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CollaboratorError::EmptyResponse)?;

        debug!("[{}] 收到回复 {} 字符", self.model_name, reply.chars().count());
        Ok(reply)
    }

    fn build_messages(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, CollaboratorError> {
        let system = system_message
            .map(|content| {
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(content)
                    .build()
                    .map(ChatCompletionRequestMessage::System)
            })
            .transpose()
            .map_err(|e| self.invocation_error(e))?;

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map(ChatCompletionRequestMessage::User)
            .map_err(|e| self.invocation_error(e))?;

        Ok(system.into_iter().chain(std::iter::once(user)).collect())
    }

    fn invocation_error(&self, e: impl std::fmt::Display) -> CollaboratorError {
        CollaboratorError::ModelInvocation {
            model: self.model_name.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for LlmClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn invoke(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let system = (!system.trim().is_empty()).then_some(system);
        self.chat(user, system).await
    }
}
