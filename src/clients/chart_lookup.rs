//! 图表数据查询：`<chart_dir>/<chart_ref>.json`

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::clients::ChartLookup;
use crate::error::CollaboratorError;

pub struct FileChartLookup {
    dir: PathBuf,
}

impl FileChartLookup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ChartLookup for FileChartLookup {
    async fn lookup(&self, chart_ref: &str) -> Result<Option<Value>, CollaboratorError> {
        let error = |message: String| CollaboratorError::ChartLookup {
            chart_ref: chart_ref.to_string(),
            message,
        };

        // 只接受文件名，不允许跳出目录
        if chart_ref.is_empty() || chart_ref.contains(['/', '\\']) || chart_ref.contains("..") {
            return Err(error("非法的图表编号".to_string()));
        }

        let path = self.dir.join(format!("{}.json", chart_ref));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(error(e.to_string())),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| error(e.to_string()))
    }
}
