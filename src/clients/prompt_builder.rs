//! 提示词组装
//!
//! 模板在启动时加载一次，由 `TemplatePromptBuilder` 持有；每次调用只读取，不修改。

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::clients::PromptBuilder;
use crate::models::{GenerationRequest, ItemCategory, ItemType, Passage};

const BUILTIN_SYSTEM: &str = "You are an experienced writer of multiple-choice English test items \
for Korean high-school students. Always reply with a single JSON object and nothing else.";

const BUILTIN_READING: &str = "Write item type {code} ({name}).
Topic: {topic}. Difficulty: {difficulty}.
Use this passage verbatim:
{passage}

Reply with JSON keys: \"question\", \"passage\", \"options\" (exactly 5 strings), \"correct_answer\" (1-5), \"explanation\".";

const BUILTIN_GRAMMAR: &str = "Write item type {code} ({name}).
Topic: {topic}. Difficulty: {difficulty}.
Base passage:
{passage}

Underline exactly five parts with <u>...</u>; exactly one of them must be grammatically wrong.
Reply with JSON keys: \"question\", \"passage\" (with the five <u> markers), \"options\" (\"①\" to \"⑤\"), \"correct_answer\" (1-5), \"explanation\",
\"grammar_meta\" (5 objects with \"index\", \"is_correct\", \"explanation\").";

const BUILTIN_GAP: &str = "Write item type {code} ({name}).
Topic: {topic}. Difficulty: {difficulty}.
Passage:
{passage}

Replace exactly one span of the passage with \"_____\" and keep every other character unchanged.
Reply with JSON keys: \"question\", \"passage\", \"gapped_passage\", \"options\" (exactly 5 strings), \"correct_answer\" (1-5), \"explanation\".";

const BUILTIN_CHART: &str = "Write item type {code} ({name}).
Topic: {topic}. Difficulty: {difficulty}.
Passage describing the chart:
{passage}

Reply with JSON keys: \"question\", \"passage\", \"options\" (exactly 5 statements), \"correct_answer\" (1-5), \"explanation\",
\"chart\" (object with \"title\" and \"data\").";

const BUILTIN_LISTENING: &str = "Write item type {code} ({name}).
Topic: {topic}. Difficulty: {difficulty}.
Situation:
{passage}

Write the script with one turn per line, each line starting with \"M:\" or \"W:\".
Reply with JSON keys: \"question\", \"script\", \"options\" (exactly 5 strings), \"correct_answer\" (1-5), \"explanation\".";

/// 一次提示词组装的上下文
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub passage: Option<&'a Passage>,
    pub attempt_number: u32,
    pub max_attempts: u32,
    /// 上一次尝试最后一条诊断
    pub previous_diagnostic: Option<&'a str>,
    /// 上一次尝试的字段名修正建议
    pub suggested_fix: Option<&'a str>,
}

/// 组装好的提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// 提示词模板
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    system: String,
    /// 按题型编码覆盖
    by_code: HashMap<u8, String>,
}

impl PromptTemplates {
    pub fn builtin() -> Self {
        Self {
            system: BUILTIN_SYSTEM.to_string(),
            by_code: HashMap::new(),
        }
    }

    /// 从目录读取模板：`system.txt` 与 `NN.txt`（按题型编码）
    ///
    /// 缺少的文件使用内置模板。
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut templates = Self::builtin();

        let system_path = dir.join("system.txt");
        if system_path.exists() {
            templates.system = std::fs::read_to_string(&system_path)
                .with_context(|| format!("读取模板失败: {}", system_path.display()))?;
        }

        for code in ItemType::MIN..=ItemType::MAX {
            let path = dir.join(format!("{:02}.txt", code));
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("读取模板失败: {}", path.display()))?;
                templates.by_code.insert(code, content);
            }
        }

        debug!(
            "已加载模板目录 {}，覆盖 {} 个题型",
            dir.display(),
            templates.by_code.len()
        );
        Ok(templates)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn template_for(&self, item_type: ItemType) -> &str {
        if let Some(t) = self.by_code.get(&item_type.code()) {
            return t;
        }
        match item_type.category() {
            ItemCategory::Grammar => BUILTIN_GRAMMAR,
            ItemCategory::Gap => BUILTIN_GAP,
            ItemCategory::Chart => BUILTIN_CHART,
            ItemCategory::Listening => BUILTIN_LISTENING,
            ItemCategory::Reading => BUILTIN_READING,
        }
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

/// 基于模板的提示词组装器
#[derive(Debug, Clone, Default)]
pub struct TemplatePromptBuilder {
    templates: PromptTemplates,
}

impl TemplatePromptBuilder {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(&self, request: &GenerationRequest, ctx: &PromptContext<'_>) -> Prompt {
        let passage = ctx.passage.map(|p| p.text.as_str()).unwrap_or("(none)");
        let mut user = self
            .templates
            .template_for(request.item_type)
            .replace("{code}", &request.item_type.code().to_string())
            .replace("{name}", request.item_type.name())
            .replace("{topic}", or_any(&request.topic_hint))
            .replace("{difficulty}", or_any(&request.difficulty_hint))
            .replace("{passage}", passage);

        if ctx.attempt_number > 1 {
            user.push_str(&format!(
                "\n\nThis is attempt {} of {}. The previous reply was rejected.",
                ctx.attempt_number, ctx.max_attempts
            ));
            if let Some(diagnostic) = ctx.previous_diagnostic {
                user.push_str(&format!("\nReason: {}", diagnostic));
            }
            if let Some(fix) = ctx.suggested_fix {
                user.push_str(&format!("\nFix: {}", fix));
            }
        }

        Prompt {
            system: self.templates.system().to_string(),
            user,
        }
    }
}

fn or_any(hint: &str) -> &str {
    if hint.trim().is_empty() {
        "any"
    } else {
        hint
    }
}
