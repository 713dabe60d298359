//! 工作簿持久化
//!
//! 定义仓储接口，工作簿只依赖抽象；默认实现把快照写成 JSON 文件。

use crate::error::Result;
use crate::workbook::{Workbook, WorkbookSnapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 工作簿仓储接口
#[cfg_attr(test, mockall::automock)]
pub trait WorkbookRepository: Send + Sync {
    /// 读取快照，尚未保存过时返回 `None`
    fn load(&self) -> Result<Option<WorkbookSnapshot>>;

    /// 保存快照
    fn save(&self, snapshot: &WorkbookSnapshot) -> Result<()>;
}

/// 通过仓储恢复工作簿，没有快照时返回空工作簿
pub fn open_workbook(repository: &dyn WorkbookRepository) -> Result<Workbook> {
    match repository.load()? {
        Some(snapshot) => Workbook::restore(snapshot),
        None => {
            info!("未找到已保存的工作簿，使用空工作簿");
            Ok(Workbook::new())
        }
    }
}

/// 保存工作簿当前状态
pub fn save_workbook(repository: &dyn WorkbookRepository, workbook: &Workbook) -> Result<()> {
    repository.save(&workbook.snapshot())
}

/// JSON 文件仓储
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkbookRepository for JsonFileRepository {
    fn load(&self) -> Result<Option<WorkbookSnapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "快照文件不存在");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: WorkbookSnapshot = serde_json::from_str(&content)?;
        info!(
            path = %self.path.display(),
            rows = snapshot.rows.len(),
            rules = snapshot.rules.len(),
            "快照已加载"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &WorkbookSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;

        info!(path = %self.path.display(), "快照已保存");
        Ok(())
    }
}
