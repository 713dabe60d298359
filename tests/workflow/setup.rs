//! 测试环境设置
//!
//! 每个测试使用独立的临时目录存放工作簿快照，测试结束时自动清理。

use rule_engine::{JsonFileRepository, Workbook, open_workbook, save_workbook};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnvironment {
    _dir: TempDir,
    pub snapshot_path: PathBuf,
    pub repository: JsonFileRepository,
}

impl TestEnvironment {
    pub fn setup() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let snapshot_path = dir.path().join("snapshots").join("workbook.json");
        let repository = JsonFileRepository::new(&snapshot_path);
        Ok(Self {
            _dir: dir,
            snapshot_path,
            repository,
        })
    }

    pub fn open(&self) -> anyhow::Result<Workbook> {
        Ok(open_workbook(&self.repository)?)
    }

    pub fn save(&self, workbook: &Workbook) -> anyhow::Result<()> {
        save_workbook(&self.repository, workbook)?;
        Ok(())
    }
}
