//! 端到端流程测试：用桩协作方驱动 ItemFlow 与 SetProcessor

use async_trait::async_trait;
use item_forge::clients::{ChartLookup, MemorySink, ModelClient, PassageProvider, QualityJudge, TemplatePromptBuilder};
use item_forge::error::{CollaboratorError, PipelineError, TypeSpecificError};
use item_forge::models::{AttemptOutcome, FinalStatus, GenerationRequest, ItemType, Recommendation};
use item_forge::services::quality::SemanticJudgment;
use item_forge::services::validators::scan_markers;
use item_forge::{Collaborators, Config, ItemFlow, SemanticPolicy, SetExecution, SetProcessor};
use std::sync::atomic::{AtomicUsize, Ordering};
use serde_json::Value;
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str) -> Result<String, CollaboratorError> + Send + Sync;

/// 按用户指令内容回复的模型桩，记录收到的每条指令
struct StubModel {
    respond: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    fn new(respond: impl Fn(&str) -> Result<String, CollaboratorError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// 依次返回脚本中的回复，用完后重复最后一条
    fn scripted(replies: Vec<&'static str>) -> Arc<Self> {
        let cursor = AtomicUsize::new(0);
        Self::new(move |_| {
            let i = cursor.fetch_add(1, Ordering::SeqCst).min(replies.len() - 1);
            Ok(replies[i].to_string())
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn invoke(&self, _system: &str, user: &str) -> Result<String, CollaboratorError> {
        self.prompts.lock().unwrap().push(user.to_string());
        (self.respond)(user)
    }
}

struct StubPassages {
    fail: bool,
    calls: AtomicUsize,
}

impl StubPassages {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PassageProvider for StubPassages {
    async fn provision(&self, _request: &GenerationRequest) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::PassageProvisioning {
                message: "service unavailable".to_string(),
            });
        }
        Ok("Bees visit thousands of flowers every day to collect nectar.".to_string())
    }
}

/// 固定评审结果的语义评审桩
struct StubJudge {
    triggers_too_easy: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl QualityJudge for StubJudge {
    async fn judge(&self, _item: &item_forge::CanonicalItem) -> Result<SemanticJudgment, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = serde_json::json!({
            "answer_validity": 28, "distractor_quality": 22, "discrimination": 18,
            "type_appropriateness": 14, "naturalness": 9,
            "regeneration_triggers": {"too_easy": self.triggers_too_easy}
        });
        let obj = reply.as_object().cloned().unwrap_or_default();
        SemanticJudgment::from_object(&obj).map_err(|message| CollaboratorError::QualityJudge { message })
    }
}

/// 只认识 `chart-1` 的图表库
struct StubCharts;

#[async_trait]
impl ChartLookup for StubCharts {
    async fn lookup(&self, chart_ref: &str) -> Result<Option<Value>, CollaboratorError> {
        Ok((chart_ref == "chart-1").then(|| serde_json::json!({"2020": 31, "2021": 45})))
    }
}

fn config(max_attempts: u32) -> Config {
    Config {
        max_attempts,
        ..Config::default()
    }
}

fn collaborators(model: Arc<StubModel>, passages: Arc<StubPassages>, sink: Arc<MemorySink>) -> Collaborators {
    Collaborators {
        model,
        passages,
        prompts: Arc::new(TemplatePromptBuilder::default()),
        sink,
        charts: None,
        judge: None,
    }
}

fn reading_reply(code: u8) -> String {
    format!(
        r#"Here is the item:
{{"question_number": {code}, "question": "What is the main idea?", "passage": "Bees visit flowers.",
"options": ["Bees sleep", "Bees visit flowers", "Bees swim", "Bees sing", "Bees read"],
"correct_answer": "③", "explanation": "The passage is about bees visiting flowers."}}"#
    )
}

const GRAMMAR_FOUR_MARKERS: &str = r#"{"question": "Which underlined part is grammatically wrong?",
"passage": "<u>He</u> <u>go</u> <u>to</u> <u>the</u> park every day.",
"options": ["①", "②", "③", "④", "⑤"], "correct_answer": 2,
"explanation": "go should be goes because the subject is third person singular.",
"grammar_meta": [
  {"index": 1, "is_correct": true}, {"index": 2, "is_correct": false},
  {"index": 3, "is_correct": true}, {"index": 4, "is_correct": true},
  {"index": 5, "is_correct": true}]}"#;

const REPAIRED_FIVE: &str = r#"{"passage": "<u>He</u> <u>go</u> <u>to</u> <u>the</u> <u>park</u> every day."}"#;
const REPAIRED_FOUR: &str = r#"{"passage": "<u>He</u> <u>go</u> <u>to</u> <u>the</u> park every day."}"#;

#[tokio::test]
async fn test_always_failing_model_exhausts_budget() {
    let model = StubModel::new(|_| {
        Err(CollaboratorError::ModelInvocation {
            model: "stub".to_string(),
            message: "timeout".to_string(),
        })
    });
    let sink = Arc::new(MemorySink::new());
    let flow = ItemFlow::new(&config(4), collaborators(model.clone(), StubPassages::ok(), sink.clone()));

    let request = GenerationRequest::new("r1", ItemType::new(22).unwrap()).with_passage("Some text.");
    let result = flow.run(&request).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert_eq!(result.attempts.len(), 4);
    let numbers: Vec<u32> = result.attempts.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(result.canonical_item.is_none());
    assert!(result.quality_score.is_none());
    assert!(result.last_diagnostic.unwrap().contains("timeout"));
    assert_eq!(model.prompts().len(), 4);
    assert_eq!(sink.attempts().len(), 4);
    assert_eq!(sink.results().len(), 1);
}

#[tokio::test]
async fn test_unparseable_replies_exhaust_budget() {
    let model = StubModel::scripted(vec!["I cannot help with that.", "", "{\"question\": "]);
    let sink = Arc::new(MemorySink::new());
    let flow = ItemFlow::new(&config(3), collaborators(model, StubPassages::ok(), sink));

    let request = GenerationRequest::new("r1", ItemType::new(22).unwrap()).with_passage("Some text.");
    let result = flow.run(&request).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert_eq!(result.attempts.len(), 3);
    assert!(matches!(
        &result.attempts[1].outcome,
        AttemptOutcome::Rejected {
            error: PipelineError::Collaborator(CollaboratorError::EmptyResponse)
        }
    ));
    assert!(result
        .attempts
        .iter()
        .all(|a| a.canonical_item.is_none() && !a.is_accepted()));
}

#[tokio::test]
async fn test_success_on_first_attempt() {
    let model = StubModel::new(|_| Ok(reading_reply(22)));
    let sink = Arc::new(MemorySink::new());
    let flow = ItemFlow::new(&config(3), collaborators(model, StubPassages::ok(), sink.clone()));

    let request = GenerationRequest::new("r1", ItemType::new(22).unwrap()).with_passage("Bees visit flowers.");
    let result = flow.run(&request).await;

    assert!(result.is_success());
    assert_eq!(result.attempts.len(), 1);
    let item = result.canonical_item.as_ref().unwrap();
    assert_eq!(item.answer_index, 3);
    assert_eq!(item.options.len(), 5);
    assert!(result.quality_score.is_some());
    assert!(result.attempts[0].is_accepted());
    assert_eq!(sink.results()[0].request_id, "r1");
}

#[tokio::test]
async fn test_retry_prompt_carries_previous_diagnostic() {
    let bad = r#"{"prompt_text": "Q", "options": ["a","b","c","d","e"], "answer": 1}"#;
    let good: &'static str = Box::leak(reading_reply(22).into_boxed_str());
    let model = StubModel::scripted(vec![bad, good]);
    let flow = ItemFlow::new(&config(3), collaborators(model.clone(), StubPassages::ok(), Arc::new(MemorySink::new())));

    let request = GenerationRequest::new("r1", ItemType::new(22).unwrap()).with_passage("Bees visit flowers.");
    let result = flow.run(&request).await;

    assert!(result.is_success());
    assert_eq!(result.attempts.len(), 2);
    assert!(!result.attempts[0].is_accepted());

    let prompts = model.prompts();
    assert!(!prompts[0].contains("previous reply"));
    assert!(prompts[1].contains("attempt 2 of 3"));
    assert!(prompts[1].contains("Reason: "));
    assert!(prompts[1].contains("Fix: "));
}

#[tokio::test]
async fn test_provisioning_failure_is_fatal() {
    let model = StubModel::new(|_| Ok(reading_reply(22)));
    let passages = StubPassages::failing();
    let sink = Arc::new(MemorySink::new());
    let flow = ItemFlow::new(&config(3), collaborators(model.clone(), passages.clone(), sink.clone()));

    let result = flow.run(&GenerationRequest::new("r1", ItemType::new(22).unwrap())).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert!(result.attempts.is_empty());
    assert_eq!(passages.calls(), 1);
    assert!(model.prompts().is_empty());
    assert!(result.last_diagnostic.unwrap().contains("service unavailable"));
    assert_eq!(sink.results().len(), 1);
}

#[tokio::test]
async fn test_provisioned_passage_reaches_prompt() {
    let model = StubModel::new(|_| Ok(reading_reply(22)));
    let passages = StubPassages::ok();
    let flow = ItemFlow::new(&config(3), collaborators(model.clone(), passages.clone(), Arc::new(MemorySink::new())));

    let result = flow.run(&GenerationRequest::new("r1", ItemType::new(22).unwrap())).await;

    assert!(result.is_success());
    assert_eq!(passages.calls(), 1);
    assert!(model.prompts()[0].contains("Bees visit thousands of flowers"));
}

#[tokio::test]
async fn test_grammar_repair_fixes_marker_count() {
    let model = StubModel::new(|user| {
        if user.contains("change nothing else") {
            Ok(REPAIRED_FIVE.to_string())
        } else {
            Ok(GRAMMAR_FOUR_MARKERS.to_string())
        }
    });
    let flow = ItemFlow::new(&config(1), collaborators(model.clone(), StubPassages::ok(), Arc::new(MemorySink::new())));

    let request = GenerationRequest::new("g1", ItemType::GRAMMAR).with_passage("He go to the park every day.");
    let result = flow.run(&request).await;

    assert!(result.is_success(), "{:?}", result.last_diagnostic);
    assert!(result.attempts[0].repair_applied);
    let passage = result.canonical_item.unwrap().passage.unwrap();
    assert_eq!(scan_markers(&passage).count, 5);
    // 一次生成 + 一次修复
    assert_eq!(model.prompts().len(), 2);
}

#[tokio::test]
async fn test_grammar_repair_rejected_keeps_marker_error() {
    let model = StubModel::new(|user| {
        if user.contains("change nothing else") {
            Ok(REPAIRED_FOUR.to_string())
        } else {
            Ok(GRAMMAR_FOUR_MARKERS.to_string())
        }
    });
    let flow = ItemFlow::new(&config(1), collaborators(model, StubPassages::ok(), Arc::new(MemorySink::new())));

    let request = GenerationRequest::new("g1", ItemType::GRAMMAR).with_passage("He go to the park every day.");
    let result = flow.run(&request).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert!(!result.attempts[0].repair_applied);
    assert!(matches!(
        &result.attempts[0].outcome,
        AttemptOutcome::Rejected {
            error: PipelineError::TypeSpecific(TypeSpecificError::MarkerCountMismatch { found: 4, .. })
        }
    ));
}

#[tokio::test]
async fn test_gap_interior_blank_drifts_against_supplied_passage() {
    let reply = r#"{"question": "Fill in the blank.", "passage": "The cat sat on the mat and ___ at the bird.",
"options": ["looked", "ran", "sang", "slept", "ate"], "correct_answer": 1,
"explanation": "The cat looked at the bird."}"#;
    let model = StubModel::new(move |_| Ok(reply.to_string()));
    let flow = ItemFlow::new(&config(2), collaborators(model, StubPassages::ok(), Arc::new(MemorySink::new())));

    let supplied = GenerationRequest::new("gap1", ItemType::new(31).unwrap())
        .with_passage("The cat sat on the mat and looked at the bird.");
    let result = flow.run(&supplied).await;
    assert_eq!(result.final_status, FinalStatus::Failed);
    assert!(result.attempts.iter().all(|a| matches!(
        &a.outcome,
        AttemptOutcome::Rejected {
            error: PipelineError::TypeSpecific(TypeSpecificError::PassageDrift)
        }
    )));

    // 原文由题源生成时不做一致性检查
    let provisioned = GenerationRequest::new("gap2", ItemType::new(31).unwrap());
    assert!(flow.run(&provisioned).await.is_success());
}

#[tokio::test]
async fn test_semantic_trigger_retries_until_final_attempt() {
    let model = StubModel::new(|_| Ok(reading_reply(22)));
    let judge = Arc::new(StubJudge {
        triggers_too_easy: true,
        calls: AtomicUsize::new(0),
    });
    let mut collab = collaborators(model, StubPassages::ok(), Arc::new(MemorySink::new()));
    collab.judge = Some(judge.clone());
    let config = Config {
        max_attempts: 2,
        semantic_policy: SemanticPolicy::EveryAttempt,
        ..Config::default()
    };
    let flow = ItemFlow::new(&config, collab);

    let request = GenerationRequest::new("s1", ItemType::new(22).unwrap()).with_passage("Bees visit flowers.");
    let result = flow.run(&request).await;

    assert!(result.is_success());
    assert_eq!(result.attempts.len(), 2);
    assert!(matches!(
        &result.attempts[0].outcome,
        AttemptOutcome::Rejected {
            error: PipelineError::SemanticRejection { .. }
        }
    ));
    assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    let score = result.quality_score.unwrap();
    assert!(score.regeneration_triggers.too_easy);
    assert_eq!(score.semantic_score, Some(91.0));
    assert!(score.review_flags.iter().any(|f| f.contains("too_easy")));
}

#[tokio::test]
async fn test_final_attempt_only_policy_calls_judge_once() {
    let model = StubModel::scripted(vec!["not json", "not json", &*Box::leak(reading_reply(22).into_boxed_str())]);
    let judge = Arc::new(StubJudge {
        triggers_too_easy: false,
        calls: AtomicUsize::new(0),
    });
    let mut collab = collaborators(model, StubPassages::ok(), Arc::new(MemorySink::new()));
    collab.judge = Some(judge.clone());
    let config = Config {
        max_attempts: 3,
        semantic_policy: SemanticPolicy::FinalAttemptOnly,
        ..Config::default()
    };
    let flow = ItemFlow::new(&config, collab);

    let request = GenerationRequest::new("s1", ItemType::new(22).unwrap()).with_passage("Bees visit flowers.");
    let result = flow.run(&request).await;

    assert!(result.is_success());
    assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.quality_score.unwrap().semantic_score, Some(91.0));
}

fn set_model() -> Arc<StubModel> {
    StubModel::new(|user| {
        let code = [41u8, 42, 43, 44, 45]
            .into_iter()
            .find(|c| user.contains(&format!("item type {}", c)))
            .unwrap_or(22);
        Ok(reading_reply(code))
    })
}

fn set_members(set_id: &str, codes: &[u8]) -> Vec<GenerationRequest> {
    codes
        .iter()
        .map(|c| GenerationRequest::new(format!("{}-{}", set_id, c), ItemType::new(*c).unwrap()).with_set_id(set_id))
        .collect()
}

#[tokio::test]
async fn test_complete_set_passes_and_shares_one_passage() {
    let passages = StubPassages::ok();
    let sink = Arc::new(MemorySink::new());
    let config = config(2);
    let flow = ItemFlow::new(&config, collaborators(set_model(), passages.clone(), sink.clone()));
    let processor = SetProcessor::new(&config, flow);

    let result = processor.process_set("set-a", set_members("set-a", &[41, 42])).await;

    assert!(result.verdict.passed, "{:?}", result.verdict.diagnostics);
    assert!(result.verdict.preflight_diagnostics.is_empty());
    assert!(result.members.iter().all(|m| m.is_success()));
    assert_eq!(passages.calls(), 1);
    assert_eq!(sink.set_results().len(), 1);
    assert_eq!(sink.results().len(), 2);
}

#[tokio::test]
async fn test_partial_set_fails_citing_missing_code() {
    let config = config(2);
    let flow = ItemFlow::new(&config, collaborators(set_model(), StubPassages::ok(), Arc::new(MemorySink::new())));
    let processor = SetProcessor::new(&config, flow);

    let result = processor.process_set("set-b", set_members("set-b", &[41])).await;

    assert!(!result.verdict.passed);
    assert!(result.verdict.diagnostics.iter().any(|d| d.contains("42")));
    assert!(result.verdict.preflight_diagnostics.iter().any(|d| d.contains("42")));
    // 套题结论不改变成员终态
    assert!(result.members[0].is_success());
}

#[tokio::test]
async fn test_shared_provisioning_failure_fails_every_member() {
    let config = config(2);
    let flow = ItemFlow::new(&config, collaborators(set_model(), StubPassages::failing(), Arc::new(MemorySink::new())));
    let processor = SetProcessor::new(&config, flow);

    let result = processor.process_set("set-c", set_members("set-c", &[43, 44, 45])).await;

    assert_eq!(result.members.len(), 3);
    assert!(result
        .members
        .iter()
        .all(|m| m.final_status == FinalStatus::Failed && m.attempts.is_empty()));
    assert!(!result.verdict.passed);
    assert_eq!(result.verdict.failed_members.len(), 3);
}

#[tokio::test]
async fn test_sequential_and_concurrent_sets_agree() {
    let config = config(2);
    let run = |execution: SetExecution| {
        let config = config.clone();
        async move {
            let flow = ItemFlow::new(&config, collaborators(set_model(), StubPassages::ok(), Arc::new(MemorySink::new())));
            SetProcessor::new(&config, flow)
                .with_execution(execution)
                .process_set("set-d", set_members("set-d", &[43, 44, 45]))
                .await
        }
    };

    let concurrent = run(SetExecution::Concurrent).await;
    let sequential = run(SetExecution::Sequential).await;

    assert_eq!(concurrent.verdict, sequential.verdict);
    for (a, b) in concurrent.members.iter().zip(&sequential.members) {
        assert_eq!(a.request_id, b.request_id);
        assert_eq!(a.final_status, b.final_status);
        assert_eq!(a.canonical_item, b.canonical_item);
        assert_eq!(a.attempts.len(), b.attempts.len());
    }
}

#[test]
fn test_out_of_range_answer_is_never_approved() {
    let scorer = item_forge::services::QualityScorer::default();
    let mut item = item_forge::services::normalize(&reading_reply(22), ItemType::new(22).unwrap(), None).unwrap();
    for forced in [0u8, 6, 200] {
        item.answer_index = forced;
        let score = scorer.score(&item);
        assert_ne!(score.recommendation, Recommendation::Approve);
        assert!(score.final_score <= 40.0);
    }
}

const CHART_REPLY: &str = r#"{"question": "Which statement is NOT consistent with the chart?",
"passage": "The chart shows club membership in 2020 and 2021.",
"options": ["a", "b", "c", "d", "e"], "correct_answer": 4,
"explanation": "Membership rose from 31 to 45, so statement 4 is wrong.",
"chart": {"title": "Club members", "data": {"2020": 31, "2021": 45}}}"#;

fn chart_flow(max_attempts: u32) -> ItemFlow {
    let model = StubModel::new(|_| Ok(CHART_REPLY.to_string()));
    let mut collab = collaborators(model, StubPassages::ok(), Arc::new(MemorySink::new()));
    collab.charts = Some(Arc::new(StubCharts));
    ItemFlow::new(&config(max_attempts), collab)
}

fn chart_rejected(result: &item_forge::PipelineResult) -> bool {
    result.attempts.iter().all(|a| {
        matches!(
            &a.outcome,
            AttemptOutcome::Rejected {
                error: PipelineError::TypeSpecific(TypeSpecificError::ChartShapeMismatch { .. })
            }
        )
    })
}

#[tokio::test]
async fn test_chart_without_ref_fails_despite_embedded_data() {
    let flow = chart_flow(2);
    let request = GenerationRequest::new("c1", ItemType::CHART).with_passage("Club membership data.");
    let result = flow.run(&request).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert_eq!(result.attempts.len(), 2);
    assert!(chart_rejected(&result));
}

#[tokio::test]
async fn test_chart_ref_must_resolve_to_data() {
    let flow = chart_flow(1);

    let missing = GenerationRequest::new("c2", ItemType::CHART)
        .with_passage("Club membership data.")
        .with_chart_ref("chart-404");
    let result = flow.run(&missing).await;
    assert_eq!(result.final_status, FinalStatus::Failed);
    assert!(chart_rejected(&result));

    let found = GenerationRequest::new("c3", ItemType::CHART)
        .with_passage("Club membership data.")
        .with_chart_ref("chart-1");
    assert!(flow.run(&found).await.is_success());
}

#[tokio::test]
async fn test_non_retryable_error_stops_attempts() {
    let model = StubModel::new(|_| {
        Err(CollaboratorError::PassageProvisioning {
            message: "upstream passage store gone".to_string(),
        })
    });
    let flow = ItemFlow::new(&config(3), collaborators(model.clone(), StubPassages::ok(), Arc::new(MemorySink::new())));

    let request = GenerationRequest::new("r1", ItemType::new(22).unwrap()).with_passage("Some text.");
    let result = flow.run(&request).await;

    assert_eq!(result.final_status, FinalStatus::Failed);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(model.prompts().len(), 1);
    assert!(result.last_diagnostic.unwrap().contains("upstream passage store gone"));
}
