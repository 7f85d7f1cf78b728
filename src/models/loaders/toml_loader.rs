use crate::models::request::GenerationRequest;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 请求文件结构
#[derive(Debug, Deserialize)]
struct RequestFile {
    #[serde(default)]
    requests: Vec<GenerationRequest>,
}

/// 从 TOML 文件加载生成请求
pub async fn load_requests(toml_file_path: &Path) -> Result<Vec<GenerationRequest>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let requests = parse_requests(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    tracing::info!("成功加载 {} 个生成请求", requests.len());
    Ok(requests)
}

/// 解析 `[[requests]]` 表数组
pub fn parse_requests(content: &str) -> Result<Vec<GenerationRequest>> {
    let file: RequestFile = toml::from_str(content)?;
    Ok(file.requests)
}

/// 按套题分组后的请求
#[derive(Debug, Default)]
pub struct RequestGroups {
    /// 不属于任何套题的请求
    pub singles: Vec<GenerationRequest>,
    /// (set_id, 成员)，按首次出现顺序
    pub sets: Vec<(String, Vec<GenerationRequest>)>,
}

/// 将请求按 set_id 分组
pub fn group_requests(requests: Vec<GenerationRequest>) -> RequestGroups {
    let mut groups = RequestGroups::default();

    for request in requests {
        match request.set_id.clone() {
            None => groups.singles.push(request),
            Some(set_id) => match groups.sets.iter_mut().find(|(id, _)| *id == set_id) {
                Some((_, members)) => members.push(request),
                None => groups.sets.push((set_id, vec![request])),
            },
        }
    }

    groups
}
