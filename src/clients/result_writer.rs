//! 结果写入
//!
//! 只追加：每次尝试一行 `attempts.jsonl`，每个请求一行 `results.jsonl`，每个套题一行 `sets.jsonl`。

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::clients::ResultSink;
use crate::error::CollaboratorError;
use crate::models::{AttemptRecord, PipelineResult, SetResult};

const ATTEMPTS_FILE: &str = "attempts.jsonl";
const RESULTS_FILE: &str = "results.jsonl";
const SETS_FILE: &str = "sets.jsonl";

#[derive(Serialize)]
struct AttemptLine<'a> {
    request_id: &'a str,
    #[serde(flatten)]
    record: &'a AttemptRecord,
}

/// JSON Lines 结果写入器
pub struct JsonlResultWriter {
    dir: PathBuf,
    /// 串行化写入，保证每行完整
    lock: tokio::sync::Mutex<()>,
}

impl JsonlResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn append<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), CollaboratorError> {
        let persistence = |e: &dyn std::fmt::Display| CollaboratorError::Persistence {
            message: format!("{}: {}", file, e),
        };

        let mut line = serde_json::to_string(value).map_err(|e| persistence(&e))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| persistence(&e))?;
        let path = self.dir.join(file);
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| persistence(&e))?;
        handle
            .write_all(line.as_bytes())
            .await
            .map_err(|e| persistence(&e))?;
        handle.flush().await.map_err(|e| persistence(&e))?;

        debug!("写入 {} ({} 字节)", path.display(), line.len());
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonlResultWriter {
    async fn append_attempt(&self, request_id: &str, record: &AttemptRecord) -> Result<(), CollaboratorError> {
        self.append(ATTEMPTS_FILE, &AttemptLine { request_id, record }).await
    }

    async fn write_result(&self, result: &PipelineResult) -> Result<(), CollaboratorError> {
        self.append(RESULTS_FILE, result).await
    }

    async fn write_set_result(&self, result: &SetResult) -> Result<(), CollaboratorError> {
        self.append(SETS_FILE, result).await
    }
}

/// 内存结果收集（测试与嵌入调用使用）
#[derive(Default)]
pub struct MemorySink {
    attempts: Mutex<Vec<(String, AttemptRecord)>>,
    results: Mutex<Vec<PipelineResult>>,
    sets: Mutex<Vec<SetResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<(String, AttemptRecord)> {
        lock_clone(&self.attempts)
    }

    pub fn results(&self) -> Vec<PipelineResult> {
        lock_clone(&self.results)
    }

    pub fn set_results(&self) -> Vec<SetResult> {
        lock_clone(&self.sets)
    }
}

fn lock_clone<T: Clone>(m: &Mutex<Vec<T>>) -> Vec<T> {
    m.lock().map(|v| v.clone()).unwrap_or_default()
}

fn push<T>(m: &Mutex<Vec<T>>, value: T) -> Result<(), CollaboratorError> {
    m.lock()
        .map(|mut v| v.push(value))
        .map_err(|e| CollaboratorError::Persistence {
            message: e.to_string(),
        })
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn append_attempt(&self, request_id: &str, record: &AttemptRecord) -> Result<(), CollaboratorError> {
        push(&self.attempts, (request_id.to_string(), record.clone()))
    }

    async fn write_result(&self, result: &PipelineResult) -> Result<(), CollaboratorError> {
        push(&self.results, result.clone())
    }

    async fn write_set_result(&self, result: &SetResult) -> Result<(), CollaboratorError> {
        push(&self.sets, result.clone())
    }
}
