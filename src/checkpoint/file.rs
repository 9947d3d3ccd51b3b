//! 文件检查点存储
//!
//! 每个 run 一个 JSON 文件：`<dir>/<run_id>.json`。先写临时文件再 rename，避免进程被杀时留下半个快照。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::core::AgentState;

#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// run id 中除字母数字、`-`、`_` 以外的字符替换为 `_`，防止路径逃逸
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        let safe: String = run_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, run_id: &str, state: &AgentState) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(run_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<AgentState>, CheckpointError> {
        let path = self.path_for(run_id);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
