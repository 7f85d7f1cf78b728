//! # Item Forge
//!
//! 由 LLM 生成英语选择题，并对结果做规范化、校验、修复与质量评分的流水线
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 外部协作方（Clients）
//! - `clients/` - 只通过 trait 暴露能力，流水线不依赖具体实现
//! - `LlmClient` - 模型调用（async-openai）
//! - `LlmPassageProvider` / `LlmQualityJudge` - 题源准备 / 语义评审
//! - `JsonlResultWriter` - 结果持久化
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数，只处理单个题目
//! - `normalizer` - 模型原始文本 → `CanonicalItem`
//! - `validators` - 结构校验与题型校验
//! - `repair` - 语法题标记修复（唯一的副作用）
//! - `quality` - 质量评分
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个请求"的完整处理流程
//! - `ItemCtx` - 上下文封装（request_id + 尝试次数）
//! - `ItemFlow` - 重试循环，拥有终态
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/set_processor` - 套题处理器，共享原文并做题型组合校验
//! - `orchestrator/batch_processor` - 批量处理器，管理并发

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, SemanticPolicy, SetExecution};
pub use error::{CollaboratorError, PipelineError, StageResult};
pub use models::{CanonicalItem, GenerationRequest, ItemType, PipelineResult, SetResult};
pub use orchestrator::{App, RunStats, SetProcessor};
pub use workflow::{Collaborators, ItemCtx, ItemFlow};
