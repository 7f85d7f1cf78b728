//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<GenerationRequest>，按 set_id 分组)
//!     ↓
//! set_processor (处理一个套题：共享原文 + 题型组合校验)
//!     ↓
//! workflow::ItemFlow (处理单个请求：重试循环)
//!     ↓
//! services (能力层：normalizer / validators / repair / quality)
//!     ↓
//! clients (外部协作方：LLM / 文件)
//! ```
//!
//! 编排层只做调度和统计，不做具体的校验判断。

pub mod batch_processor;
pub mod set_processor;

pub use batch_processor::{App, RunStats};
pub use set_processor::SetProcessor;
