use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// 语义质量层的调用策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticPolicy {
    /// 不调用
    Off,
    /// 每次通过规则校验的尝试都调用
    EveryAttempt,
    /// 只在最后一次尝试调用
    FinalAttemptOnly,
}

impl SemanticPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(SemanticPolicy::Off),
            "every_attempt" => Some(SemanticPolicy::EveryAttempt),
            "final_attempt_only" => Some(SemanticPolicy::FinalAttemptOnly),
            _ => None,
        }
    }
}

/// 套题成员的执行方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetExecution {
    Concurrent,
    Sequential,
}

/// 某一题型的目标词数区间
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct WordCountTarget {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

impl WordCountTarget {
    pub const fn new(min: u32, ideal: u32, max: u32) -> Self {
        Self { min, ideal, max }
    }
}

/// 内置的题型目标词数
pub fn default_word_count_target(code: u8) -> WordCountTarget {
    match code {
        1..=15 => WordCountTarget::new(40, 90, 160),
        16..=17 => WordCountTarget::new(120, 180, 250),
        25 => WordCountTarget::new(60, 100, 150),
        29 => WordCountTarget::new(110, 150, 200),
        31..=34 => WordCountTarget::new(100, 140, 190),
        41..=42 => WordCountTarget::new(220, 280, 340),
        43..=45 => WordCountTarget::new(250, 320, 400),
        _ => WordCountTarget::new(100, 150, 210),
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每个请求的最大尝试次数
    pub max_attempts: u32,
    /// 语义质量层调用策略
    pub semantic_policy: SemanticPolicy,
    /// 按题型编码覆盖的目标词数（TOML 表的键为编码字符串）
    pub word_count_targets: BTreeMap<String, WordCountTarget>,
    /// 套题题型白名单（闭区间）
    pub set_patterns: Vec<(u8, u8)>,
    /// 套题成员执行方式
    pub set_execution: SetExecution,
    /// 套题成员是否共享同一篇原文
    pub share_set_passage: bool,
    /// 同时处理的单元（单题或套题）数量
    pub max_concurrent_units: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 结果输出目录
    pub results_dir: String,
    /// 图表数据目录
    pub chart_dir: String,
    /// 提示词模板目录（可选）
    pub template_dir: Option<String>,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            semantic_policy: SemanticPolicy::Off,
            word_count_targets: BTreeMap::new(),
            set_patterns: vec![(16, 17), (41, 42), (43, 45)],
            set_execution: SetExecution::Concurrent,
            share_set_passage: true,
            max_concurrent_units: 8,
            verbose_logging: false,
            results_dir: "output".to_string(),
            chart_dir: "charts".to_string(),
            template_dir: None,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 2048,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 读取 TOML 配置文件（可选），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖已有配置
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse::<u32>("MAX_ATTEMPTS", "u32")? {
            self.max_attempts = v.max(1);
        }
        if let Ok(v) = std::env::var("SEMANTIC_POLICY") {
            self.semantic_policy =
                SemanticPolicy::parse(&v).ok_or_else(|| ConfigError::EnvVarParseFailed {
                    var_name: "SEMANTIC_POLICY".to_string(),
                    value: v.clone(),
                    expected_type: "off | every_attempt | final_attempt_only".to_string(),
                })?;
        }
        if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_UNITS", "usize")? {
            self.max_concurrent_units = v.max(1);
        }
        if let Some(v) = env_parse::<bool>("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Ok(v) = std::env::var("RESULTS_DIR") {
            self.results_dir = v;
        }
        if let Ok(v) = std::env::var("CHART_DIR") {
            self.chart_dir = v;
        }
        if let Ok(v) = std::env::var("TEMPLATE_DIR") {
            self.template_dir = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            self.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        Ok(())
    }

    /// 获取某题型的目标词数（配置覆盖优先）
    pub fn word_count_target(&self, code: u8) -> WordCountTarget {
        self.word_count_targets
            .get(&code.to_string())
            .copied()
            .unwrap_or_else(|| default_word_count_target(code))
    }
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
