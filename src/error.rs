//! 错误类型
//!
//! 流水线内部的所有错误都只携带字符串负载，因此可以 `Clone` / `Serialize`，
//! 能原样嵌入 `ValidationOutcome` 和 `AttemptRecord`（审计记录）。

use serde::Serialize;
use thiserror::Error;

/// 流水线错误（单次尝试内的所有失败原因）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "stage", content = "error", rename_all = "snake_case")]
pub enum PipelineError {
    /// 模型输出无法解析
    #[error("解析错误: {message} (片段: {fragment})")]
    Parse { message: String, fragment: String },
    /// 通用字段校验错误
    #[error("字段校验错误: {0}")]
    Validation(ValidationError),
    /// 题型专属校验错误
    #[error("题型校验错误: {0}")]
    TypeSpecific(TypeSpecificError),
    /// 外部协作方错误
    #[error("外部协作方错误: {0}")]
    Collaborator(CollaboratorError),
    /// 语义质量层要求重新生成
    #[error("语义质量层拒绝: {detail}")]
    SemanticRejection { detail: String },
}

impl PipelineError {
    /// 解析错误，片段截取前 150 个字符
    pub fn parse(message: impl Into<String>, fragment: &str) -> Self {
        PipelineError::Parse {
            message: message.into(),
            fragment: fragment.chars().take(150).collect(),
        }
    }

    /// 是否可以在下一次尝试中重试
    ///
    /// 只有题源（passage）准备失败是致命的。
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PipelineError::Collaborator(CollaboratorError::PassageProvisioning { .. })
        )
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Validation(err)
    }
}

impl From<TypeSpecificError> for PipelineError {
    fn from(err: TypeSpecificError) -> Self {
        PipelineError::TypeSpecific(err)
    }
}

impl From<CollaboratorError> for PipelineError {
    fn from(err: CollaboratorError) -> Self {
        PipelineError::Collaborator(err)
    }
}

/// 字段校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// 缺少必需字段
    #[error("缺少字段 {field}")]
    MissingField { field: String },
    /// 字段值超出范围
    #[error("字段 {field} 的值 '{value}' 超出范围")]
    OutOfRange { field: String, value: String },
    /// 字段结构不符合预期
    #[error("字段 {field} 结构不符: {detail}")]
    ShapeMismatch { field: String, detail: String },
}

/// 题型专属校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpecificError {
    #[error("标记数量不符 (方言: {dialect}, 实际: {found}, 期望: 5)")]
    MarkerCountMismatch { dialect: String, found: usize },
    #[error("语法元数据不符: {detail}")]
    GrammarMetaMismatch { detail: String },
    #[error("空格数量不符 (实际: {found}, 期望: 1)")]
    BlankCountMismatch { found: usize },
    #[error("挖空文本与原文不一致")]
    PassageDrift,
    #[error("图表题结构不符: {detail}")]
    ChartShapeMismatch { detail: String },
    #[error("套题题型组合不符: {detail}")]
    SetPatternMismatch { detail: String },
    #[error("听力格式不符: {detail}")]
    ListeningFormatMismatch { detail: String },
}

/// 外部协作方错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollaboratorError {
    /// 题源准备失败（致命，不重试）
    #[error("题源准备失败: {message}")]
    PassageProvisioning { message: String },
    /// 模型调用失败
    #[error("模型调用失败 (模型: {model}): {message}")]
    ModelInvocation { model: String, message: String },
    /// 模型返回内容为空
    #[error("模型返回内容为空")]
    EmptyResponse,
    /// 修复调用失败（只记录，不升级）
    #[error("标记修复失败: {message}")]
    Repair { message: String },
    /// 语义质量评审失败
    #[error("质量评审失败: {message}")]
    QualityJudge { message: String },
    /// 图表数据读取失败
    #[error("图表数据读取失败 ({chart_ref}): {message}")]
    ChartLookup { chart_ref: String, message: String },
    /// 持久化失败
    #[error("持久化失败: {message}")]
    Persistence { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 单次尝试内部阶段的结果类型
pub type StageResult<T> = Result<T, PipelineError>;
