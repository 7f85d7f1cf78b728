//! 题目生成流程 - 流程层
//!
//! 核心职责：定义"一个请求"的完整处理流程，并保证每个请求都有终态。
//!
//! 流程顺序（每次尝试）：
//! 1. 组装提示词 → 调用模型
//! 2. 规范化 → 结构校验 → 题型校验（必要时先修复标记再重新校验）
//! 3. 语义评审（按配置）
//! 4. 写入尝试记录
//!
//! 成功后重新计算质量评分；尝试次数用完返回 FAILED 并带上最后一条诊断。

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{
    ChartLookup, ModelClient, PassageProvider, PromptBuilder, PromptContext, QualityJudge, ResultSink,
};
use crate::config::{Config, SemanticPolicy};
use crate::error::{CollaboratorError, PipelineError};
use crate::models::{
    AttemptOutcome, AttemptRecord, CanonicalItem, FinalStatus, GenerationRequest, ItemCategory, Passage,
    PipelineResult, ValidationOutcome,
};
use crate::services::quality::{QualityScorer, SemanticJudgment};
use crate::services::repair::{repair_markers, RepairOutcome};
use crate::services::validators::{validate_structure, validate_type_specific, TypeCheckInput};
use crate::services::normalize;
use crate::utils::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 流程状态（只用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    PendingPassage,
    Prompted,
    AwaitingModel,
    Parsed,
    Repairing,
    Validated,
    Judging,
    Retry,
    Success,
    Failed,
}

/// 流程依赖的外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn ModelClient>,
    pub passages: Arc<dyn PassageProvider>,
    pub prompts: Arc<dyn PromptBuilder>,
    pub sink: Arc<dyn ResultSink>,
    pub charts: Option<Arc<dyn ChartLookup>>,
    pub judge: Option<Arc<dyn QualityJudge>>,
}

/// 上一次尝试留给下一次提示词的反馈
#[derive(Debug, Default, Clone)]
struct Feedback {
    diagnostic: Option<String>,
    suggested_fix: Option<String>,
}

/// 单次尝试的结果
struct AttemptRun {
    record: AttemptRecord,
    accepted: Option<(CanonicalItem, Option<SemanticJudgment>)>,
    suggested_fix: Option<String>,
}

/// 题目生成流程
///
/// - 拥有重试预算与终态
/// - 不持有可变状态，可以被多个任务共享
#[derive(Clone)]
pub struct ItemFlow {
    collaborators: Collaborators,
    scorer: QualityScorer,
    max_attempts: u32,
    semantic_policy: SemanticPolicy,
}

impl ItemFlow {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            scorer: QualityScorer::new(config),
            max_attempts: config.max_attempts.max(1),
            semantic_policy: config.semantic_policy,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn sink(&self) -> &Arc<dyn ResultSink> {
        &self.collaborators.sink
    }

    /// 处理一个请求：准备原文，然后进入尝试循环
    pub async fn run(&self, request: &GenerationRequest) -> PipelineResult {
        let ctx = ItemCtx::new(&request.id, request.item_type, self.max_attempts)
            .with_set_id(request.set_id.clone());
        debug!("{} 状态: {:?}", ctx, FlowState::PendingPassage);

        let result = match self.provision_passage(request).await {
            Ok(passage) => self.attempt_loop(request, passage, ctx).await,
            Err(e) => {
                error!("{} ❌ 原文准备失败，不再重试: {}", ctx, e);
                Self::failed_without_attempts(request, &e)
            }
        };
        self.persist_result(&result).await;
        result
    }

    /// 使用已准备好的原文处理请求（套题共享原文时使用）
    pub async fn run_with_passage(&self, request: &GenerationRequest, passage: Passage) -> PipelineResult {
        let ctx = ItemCtx::new(&request.id, request.item_type, self.max_attempts)
            .with_set_id(request.set_id.clone());
        let result = self.attempt_loop(request, passage, ctx).await;
        self.persist_result(&result).await;
        result
    }

    /// 准备原文：请求自带则直接使用，否则调用题源服务一次
    pub async fn provision_passage(&self, request: &GenerationRequest) -> Result<Passage, PipelineError> {
        if let Some(text) = request
            .supplied_passage
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            return Ok(Passage::supplied(text));
        }

        self.collaborators
            .passages
            .provision(request)
            .await
            .map(Passage::provisioned)
            .map_err(|e| match e {
                CollaboratorError::PassageProvisioning { .. } => e.into(),
                other => CollaboratorError::PassageProvisioning {
                    message: other.to_string(),
                }
                .into(),
            })
    }

    /// 没有任何尝试的失败结果（原文准备失败）
    pub fn failed_without_attempts(request: &GenerationRequest, error: &PipelineError) -> PipelineResult {
        PipelineResult {
            request_id: request.id.clone(),
            item_type: request.item_type,
            final_status: FinalStatus::Failed,
            canonical_item: None,
            attempts: Vec::new(),
            quality_score: None,
            last_diagnostic: Some(error.to_string()),
        }
    }

    /// 尝试循环，每条出口都返回终态
    async fn attempt_loop(&self, request: &GenerationRequest, passage: Passage, mut ctx: ItemCtx) -> PipelineResult {
        let external_chart = self.lookup_chart(request, &ctx).await;
        let mut attempts = Vec::new();
        let mut feedback = Feedback::default();

        for attempt in 1..=self.max_attempts {
            ctx.attempt = attempt;
            let run = self
                .run_attempt(request, &passage, external_chart.as_ref(), &ctx, &feedback)
                .await;

            self.persist_attempt(&ctx, &run.record).await;

            if let Some((item, judgment)) = run.accepted {
                attempts.push(run.record);
                return self.succeed(request, item, judgment, attempts, &ctx);
            }

            let mut fatal = false;
            if let AttemptOutcome::Rejected { error } = &run.record.outcome {
                let message = error.to_string();
                warn!("{} ⚠️ 尝试失败: {}", ctx, truncate_text(&message, 120));
                fatal = !error.is_retryable();
                if fatal {
                    error!("{} ❌ 不可重试的错误，停止尝试", ctx);
                } else if attempt < self.max_attempts {
                    debug!("{} 状态: {:?}", ctx, FlowState::Retry);
                }
                feedback = Feedback {
                    diagnostic: Some(message),
                    suggested_fix: run.suggested_fix,
                };
            }
            attempts.push(run.record);
            if fatal {
                break;
            }
        }

        debug!("{} 状态: {:?}", ctx, FlowState::Failed);
        error!("{} ❌ {} 次尝试均未通过", ctx, attempts.len());
        PipelineResult {
            request_id: request.id.clone(),
            item_type: request.item_type,
            final_status: FinalStatus::Failed,
            canonical_item: None,
            attempts,
            quality_score: None,
            last_diagnostic: feedback.diagnostic,
        }
    }

    async fn run_attempt(
        &self,
        request: &GenerationRequest,
        passage: &Passage,
        external_chart: Option<&Value>,
        ctx: &ItemCtx,
        feedback: &Feedback,
    ) -> AttemptRun {
        let mut draft = AttemptDraft::new(ctx.attempt);

        let prompt = self.collaborators.prompts.build(
            request,
            &PromptContext {
                passage: Some(passage),
                attempt_number: ctx.attempt,
                max_attempts: self.max_attempts,
                previous_diagnostic: feedback.diagnostic.as_deref(),
                suggested_fix: feedback.suggested_fix.as_deref(),
            },
        );
        debug!("{} 状态: {:?}", ctx, FlowState::Prompted);

        debug!("{} 状态: {:?}", ctx, FlowState::AwaitingModel);
        match self.collaborators.model.invoke(&prompt.system, &prompt.user).await {
            Ok(raw) if raw.trim().is_empty() => {
                draft.raw = raw;
                return draft.reject(CollaboratorError::EmptyResponse.into(), None);
            }
            Ok(raw) => draft.raw = raw,
            Err(e) => return draft.reject(e.into(), None),
        }

        let mut item = match normalize(&draft.raw, request.item_type, None) {
            Ok(item) => item,
            Err(e) => return draft.reject(e, None),
        };
        debug!("{} 状态: {:?}", ctx, FlowState::Parsed);

        let structural = validate_structure(&item);
        if !structural.passed {
            draft.item = Some(item);
            return draft.reject_outcome(structural);
        }
        draft.diagnostics.extend(structural.diagnostics);

        // 只有外部查到的图表数据才算数，模型回复里自带的图表只保留在元数据中
        let input = TypeCheckInput {
            drift_reference: passage.drift_reference(),
            chart_payload: external_chart,
        };
        let mut report = validate_type_specific(&item, input);

        // 校验 → 修复 → 重新校验
        if !report.outcome.passed && report.repair_eligible {
            debug!("{} 状态: {:?}", ctx, FlowState::Repairing);
            match repair_markers(self.collaborators.model.as_ref(), &item).await {
                RepairOutcome::Repaired { passage } => {
                    info!("{} 🔧 已修复语法标记", ctx);
                    draft
                        .diagnostics
                        .extend(report.outcome.diagnostics.iter().map(|d| format!("修复前: {}", d)));
                    item.passage = Some(passage);
                    draft.repair_applied = true;
                    report = validate_type_specific(&item, input);
                }
                RepairOutcome::NotApplied { reason } => {
                    warn!("{} 标记修复未采用: {}", ctx, reason);
                    draft.diagnostics.push(format!("标记修复未采用: {}", reason));
                }
            }
        }

        draft.item = Some(item.clone());
        if !report.outcome.passed {
            return draft.reject_outcome(report.outcome);
        }
        draft.diagnostics.extend(report.outcome.diagnostics);
        debug!("{} 状态: {:?}", ctx, FlowState::Validated);

        let judgment = self.judge(&item, ctx).await;
        if let Some(reason) = judgment.as_ref().and_then(SemanticJudgment::rejection_reason) {
            if !ctx.is_final_attempt() {
                return draft.reject(PipelineError::SemanticRejection { detail: reason }, None);
            }
            draft
                .diagnostics
                .push(format!("语义层建议（最后一次尝试，仅供参考）: {}", reason));
        }

        draft.accept(item, judgment)
    }

    /// 按策略调用语义评审；评审失败只记录日志
    async fn judge(&self, item: &CanonicalItem, ctx: &ItemCtx) -> Option<SemanticJudgment> {
        let due = match self.semantic_policy {
            SemanticPolicy::Off => false,
            SemanticPolicy::EveryAttempt => true,
            SemanticPolicy::FinalAttemptOnly => ctx.is_final_attempt(),
        };
        let judge = self.collaborators.judge.as_ref().filter(|_| due)?;

        debug!("{} 状态: {:?}", ctx, FlowState::Judging);
        match judge.judge(item).await {
            Ok(judgment) => Some(judgment),
            Err(e) => {
                warn!("{} 语义评审失败，跳过: {}", ctx, e);
                None
            }
        }
    }

    fn succeed(
        &self,
        request: &GenerationRequest,
        item: CanonicalItem,
        judgment: Option<SemanticJudgment>,
        attempts: Vec<AttemptRecord>,
        ctx: &ItemCtx,
    ) -> PipelineResult {
        let mut score = self.scorer.score(&item);
        if let Some(judgment) = &judgment {
            judgment.apply_to(&mut score);
            if let Some(reason) = judgment.rejection_reason() {
                score.review_flags.push(format!("semantic: {}", reason));
            }
        }

        debug!("{} 状态: {:?}", ctx, FlowState::Success);
        info!(
            "{} ✅ 生成成功: {:.1} 分 ({}, {:?})",
            ctx, score.final_score, score.grade, score.recommendation
        );

        PipelineResult {
            request_id: request.id.clone(),
            item_type: request.item_type,
            final_status: FinalStatus::Success,
            canonical_item: Some(item),
            attempts,
            quality_score: Some(score),
            last_diagnostic: None,
        }
    }

    /// 外部图表数据只在请求开始时查一次
    async fn lookup_chart(&self, request: &GenerationRequest, ctx: &ItemCtx) -> Option<Value> {
        if request.item_type.category() != ItemCategory::Chart {
            return None;
        }
        let Some(chart_ref) = &request.chart_ref else {
            warn!("{} 图表题没有 chart_ref", ctx);
            return None;
        };
        let Some(charts) = &self.collaborators.charts else {
            return None;
        };
        match charts.lookup(chart_ref).await {
            Ok(None) => {
                warn!("{} 未找到图表数据: {}", ctx, chart_ref);
                None
            }
            Ok(payload) => payload,
            Err(e) => {
                warn!("{} 图表数据读取失败: {}", ctx, e);
                None
            }
        }
    }

    async fn persist_attempt(&self, ctx: &ItemCtx, record: &AttemptRecord) {
        if let Err(e) = self
            .collaborators
            .sink
            .append_attempt(&ctx.request_id, record)
            .await
        {
            error!("{} 尝试记录写入失败: {}", ctx, e);
        }
    }

    async fn persist_result(&self, result: &PipelineResult) {
        if let Err(e) = self.collaborators.sink.write_result(result).await {
            error!("[请求#{}] 结果写入失败: {}", result.request_id, e);
        }
    }
}

/// 正在进行的一次尝试，结束时转换为不可变的 `AttemptRecord`
struct AttemptDraft {
    attempt_number: u32,
    raw: String,
    item: Option<CanonicalItem>,
    diagnostics: Vec<String>,
    repair_applied: bool,
}

impl AttemptDraft {
    fn new(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            raw: String::new(),
            item: None,
            diagnostics: Vec::new(),
            repair_applied: false,
        }
    }

    fn record(self, outcome: AttemptOutcome) -> AttemptRecord {
        AttemptRecord {
            attempt_number: self.attempt_number,
            raw_response: self.raw,
            canonical_item: self.item,
            outcome,
            diagnostics: self.diagnostics,
            repair_applied: self.repair_applied,
            timestamp: Utc::now(),
        }
    }

    fn reject(mut self, error: PipelineError, suggested_fix: Option<String>) -> AttemptRun {
        let message = error.to_string();
        if !self.diagnostics.contains(&message) {
            self.diagnostics.push(message);
        }
        AttemptRun {
            record: self.record(AttemptOutcome::Rejected { error }),
            accepted: None,
            suggested_fix,
        }
    }

    /// 按校验结果拒绝，诊断按顺序合并
    fn reject_outcome(mut self, outcome: ValidationOutcome) -> AttemptRun {
        self.diagnostics.extend(outcome.diagnostics);
        let error = outcome
            .error
            .unwrap_or_else(|| PipelineError::SemanticRejection {
                detail: self.diagnostics.join("; "),
            });
        self.reject(error, outcome.suggested_prompt_fix)
    }

    fn accept(self, item: CanonicalItem, judgment: Option<SemanticJudgment>) -> AttemptRun {
        AttemptRun {
            record: self.record(AttemptOutcome::Accepted),
            accepted: Some((item, judgment)),
            suggested_fix: None,
        }
    }
}
