//! 批量请求处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量请求的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建 LLM 客户端、模板、结果写入器等协作方
//! 2. **批量加载**：读取 TOML 请求文件，按 `set_id` 分组
//! 3. **并发控制**：使用 Semaphore 限制同时处理的单元（单题或套题）数量
//! 4. **全局统计**：汇总所有请求的处理结果

use crate::clients::{
    FileChartLookup, JsonlResultWriter, LlmClient, LlmPassageProvider, LlmQualityJudge, PromptTemplates,
    QualityJudge, TemplatePromptBuilder,
};
use crate::config::{Config, SemanticPolicy};
use crate::models::{group_requests, load_requests, GenerationRequest, PipelineResult, SetResult};
use crate::orchestrator::SetProcessor;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{Collaborators, ItemFlow};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 调度单元
enum Unit {
    Single(GenerationRequest),
    Set(String, Vec<GenerationRequest>),
}

/// 单元处理结果
enum UnitResult {
    Single(PipelineResult),
    Set(SetResult),
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub success: usize,
    pub failed: usize,
    pub sets: usize,
    pub sets_failed: usize,
}

impl RunStats {
    fn record(&mut self, result: &PipelineResult) {
        if result.is_success() {
            self.success += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    flow: ItemFlow,
    sets: SetProcessor,
}

impl App {
    /// 初始化应用：创建默认的协作方
    pub async fn initialize(config: Config) -> Result<Self> {
        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY");
        }

        let model = Arc::new(LlmClient::new(&config));

        let templates = match &config.template_dir {
            Some(dir) => PromptTemplates::load_dir(Path::new(dir))?,
            None => PromptTemplates::builtin(),
        };

        let judge = (config.semantic_policy != SemanticPolicy::Off)
            .then(|| Arc::new(LlmQualityJudge::new(model.clone())) as Arc<dyn QualityJudge>);

        let collaborators = Collaborators {
            passages: Arc::new(LlmPassageProvider::new(model.clone())),
            prompts: Arc::new(TemplatePromptBuilder::new(templates)),
            sink: Arc::new(JsonlResultWriter::new(&config.results_dir)),
            charts: Some(Arc::new(FileChartLookup::new(&config.chart_dir))),
            judge,
            model,
        };

        Ok(Self::with_collaborators(config, collaborators))
    }

    /// 使用指定的协作方创建（测试或嵌入调用）
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        let flow = ItemFlow::new(&config, collaborators);
        let sets = SetProcessor::new(&config, flow.clone());
        Self { config, flow, sets }
    }

    /// 运行应用主逻辑
    pub async fn run(&self, requests_path: &Path) -> Result<RunStats> {
        info!("\n📁 正在读取请求文件 {}...", requests_path.display());
        let requests = load_requests(requests_path).await?;

        if requests.is_empty() {
            warn!("⚠️ 没有找到待处理的请求，程序结束");
            return Ok(RunStats::default());
        }

        log_startup(
            requests.len(),
            self.config.max_concurrent_units,
            &self.config.llm_model_name,
        );

        let stats = self.process_requests(requests).await?;

        print_final_stats(stats.success, stats.failed, stats.sets_failed, &self.config.results_dir);
        Ok(stats)
    }

    /// 处理所有请求
    pub async fn process_requests(&self, requests: Vec<GenerationRequest>) -> Result<RunStats> {
        let groups = group_requests(requests);
        let units: Vec<Unit> = groups
            .singles
            .into_iter()
            .map(Unit::Single)
            .chain(groups.sets.into_iter().map(|(id, members)| Unit::Set(id, members)))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_units.max(1)));
        let mut handles = Vec::with_capacity(units.len());

        for unit in units {
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = self.flow.clone();
            let sets = self.sets.clone();

            let label = match &unit {
                Unit::Single(r) => format!("请求#{}", r.id),
                Unit::Set(id, _) => format!("套题#{}", id),
            };

            let handle = tokio::spawn(async move {
                let _permit = permit;
                match unit {
                    Unit::Single(request) => UnitResult::Single(flow.run(&request).await),
                    Unit::Set(set_id, members) => UnitResult::Set(sets.process_set(&set_id, members).await),
                }
            });
            handles.push((label, handle));
        }

        let mut stats = RunStats::default();
        for (label, handle) in handles {
            match handle.await {
                Ok(UnitResult::Single(result)) => stats.record(&result),
                Ok(UnitResult::Set(set)) => {
                    stats.sets += 1;
                    if !set.verdict.passed {
                        stats.sets_failed += 1;
                    }
                    set.members.iter().for_each(|r| stats.record(r));
                }
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", label, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}
