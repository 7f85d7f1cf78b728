//! 外部协作方
//!
//! 流水线只依赖这里的 trait，具体实现（LLM、文件）在各子模块中，测试中可以替换为桩实现。

pub mod chart_lookup;
pub mod llm_client;
pub mod passage_provider;
pub mod prompt_builder;
pub mod quality_judge;
pub mod result_writer;

pub use chart_lookup::FileChartLookup;
pub use llm_client::LlmClient;
pub use passage_provider::LlmPassageProvider;
pub use prompt_builder::{Prompt, PromptContext, PromptTemplates, TemplatePromptBuilder};
pub use quality_judge::LlmQualityJudge;
pub use result_writer::{JsonlResultWriter, MemorySink};

use crate::error::CollaboratorError;
use crate::models::{AttemptRecord, CanonicalItem, GenerationRequest, PipelineResult, SetResult};
use crate::services::quality::SemanticJudgment;
use async_trait::async_trait;
use serde_json::Value;

/// 模型调用：(系统指令, 用户指令) → 原始文本
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn invoke(&self, system: &str, user: &str) -> Result<String, CollaboratorError>;
}

/// 题源准备：没有自带原文的请求由它生成一篇
#[async_trait]
pub trait PassageProvider: Send + Sync {
    async fn provision(&self, request: &GenerationRequest) -> Result<String, CollaboratorError>;
}

/// 提示词组装，纯函数
pub trait PromptBuilder: Send + Sync {
    fn build(&self, request: &GenerationRequest, ctx: &PromptContext<'_>) -> Prompt;
}

/// 图表数据查询，找不到时返回 `Ok(None)`
#[async_trait]
pub trait ChartLookup: Send + Sync {
    async fn lookup(&self, chart_ref: &str) -> Result<Option<Value>, CollaboratorError>;
}

/// 语义质量评审
#[async_trait]
pub trait QualityJudge: Send + Sync {
    async fn judge(&self, item: &CanonicalItem) -> Result<SemanticJudgment, CollaboratorError>;
}

/// 结果持久化，只追加
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn append_attempt(
        &self,
        request_id: &str,
        record: &AttemptRecord,
    ) -> Result<(), CollaboratorError>;

    async fn write_result(&self, result: &PipelineResult) -> Result<(), CollaboratorError>;

    async fn write_set_result(&self, result: &SetResult) -> Result<(), CollaboratorError>;
}
