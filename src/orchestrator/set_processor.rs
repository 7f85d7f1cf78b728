//! 套题处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **预检**：生成前检查题型组合（只警告）
//! 2. **共享原文**：整套题使用同一篇原文，只准备一次
//! 3. **成员调度**：并发或顺序运行每个成员的 `ItemFlow`
//! 4. **整体结论**：所有成员结束后再次检查题型组合，结论不改变成员终态

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::config::{Config, SetExecution};
use crate::models::{GenerationRequest, Passage, PipelineResult, SetResult, SetVerdict};
use crate::services::validators::SetPatternValidator;
use crate::utils::logging::log_set_start;
use crate::workflow::ItemFlow;

/// 套题处理器
#[derive(Clone)]
pub struct SetProcessor {
    flow: ItemFlow,
    validator: SetPatternValidator,
    execution: SetExecution,
    share_passage: bool,
}

impl SetProcessor {
    pub fn new(config: &Config, flow: ItemFlow) -> Self {
        Self {
            flow,
            validator: SetPatternValidator::new(config.set_patterns.clone()),
            execution: config.set_execution,
            share_passage: config.share_set_passage,
        }
    }

    pub fn with_execution(mut self, execution: SetExecution) -> Self {
        self.execution = execution;
        self
    }

    /// 处理一个套题
    pub async fn process_set(&self, set_id: &str, members: Vec<GenerationRequest>) -> SetResult {
        let codes: Vec<u8> = members.iter().map(|m| m.item_type.code()).collect();
        log_set_start(set_id, &codes);

        let preflight = self.validator.validate(&codes);
        if !preflight.passed {
            for d in &preflight.diagnostics {
                warn!("[套题#{}] ⚠️ 预检: {}", set_id, d);
            }
        }

        let results = match self.shared_passage(set_id, &members).await {
            Ok(shared) => self.run_members(&members, shared).await,
            Err(e) => {
                error!("[套题#{}] ❌ 共享原文准备失败，所有成员失败: {}", set_id, e);
                let mut results = Vec::with_capacity(members.len());
                for member in &members {
                    let result = ItemFlow::failed_without_attempts(member, &e);
                    if let Err(e) = self.flow.sink().write_result(&result).await {
                        error!("[请求#{}] 结果写入失败: {}", member.id, e);
                    }
                    results.push(result);
                }
                results
            }
        };

        let verdict = self.verdict(&results, preflight.diagnostics);
        if verdict.passed {
            info!("[套题#{}] ✅ 套题校验通过", set_id);
        } else {
            warn!("[套题#{}] ⚠️ 套题校验未通过: {}", set_id, verdict.diagnostics.join("; "));
        }

        let set_result = SetResult {
            set_id: set_id.to_string(),
            members: results,
            verdict,
        };
        if let Err(e) = self.flow.sink().write_set_result(&set_result).await {
            error!("[套题#{}] 套题结果写入失败: {}", set_id, e);
        }
        set_result
    }

    /// 准备共享原文
    ///
    /// 优先使用成员自带的原文，否则为整套题生成一篇；不共享时返回 `None`。
    async fn shared_passage(
        &self,
        set_id: &str,
        members: &[GenerationRequest],
    ) -> Result<Option<Passage>, crate::error::PipelineError> {
        if !self.share_passage {
            return Ok(None);
        }
        if let Some(text) = members
            .iter()
            .filter_map(|m| m.supplied_passage.as_deref())
            .find(|t| !t.trim().is_empty())
        {
            return Ok(Some(Passage::supplied(text)));
        }
        let Some(first) = members.first() else {
            return Ok(None);
        };
        info!("[套题#{}] 📝 为整套题准备原文...", set_id);
        self.flow.provision_passage(first).await.map(Some)
    }

    async fn run_members(&self, members: &[GenerationRequest], shared: Option<Passage>) -> Vec<PipelineResult> {
        match self.execution {
            SetExecution::Concurrent => {
                join_all(members.iter().map(|m| self.run_member(m, shared.clone()))).await
            }
            SetExecution::Sequential => {
                let mut results = Vec::with_capacity(members.len());
                for member in members {
                    results.push(self.run_member(member, shared.clone()).await);
                }
                results
            }
        }
    }

    async fn run_member(&self, member: &GenerationRequest, shared: Option<Passage>) -> PipelineResult {
        match shared {
            Some(passage) => self.flow.run_with_passage(member, passage).await,
            None => self.flow.run(member).await,
        }
    }

    /// 成功成员的题型必须组成完整的白名单区间
    fn verdict(&self, results: &[PipelineResult], preflight_diagnostics: Vec<String>) -> SetVerdict {
        let succeeded: Vec<u8> = results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.item_type.code())
            .collect();
        let failed_members: Vec<String> = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.request_id.clone())
            .collect();

        let outcome = self.validator.validate(&succeeded);
        let mut diagnostics = outcome.diagnostics;
        if !failed_members.is_empty() {
            diagnostics.push(format!("失败成员: {}", failed_members.join(", ")));
        }

        SetVerdict {
            passed: outcome.passed && failed_members.is_empty(),
            diagnostics,
            preflight_diagnostics,
            failed_members,
        }
    }
}
