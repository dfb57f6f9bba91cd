//! `status.json`: the latest arbitration outcome, for operators and scripts.
//!
//! Rewritten atomically whenever the outcome changes. Never read back.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use uplink_core::{TickError, TickReport};

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot<'a> {
    pub active: Option<&'a str>,
    pub interfaces: &'a [String],
    pub errors: &'a [TickError],
    pub updated_at: u64,
}

pub struct StatusWriter {
    path: PathBuf,
    interfaces: Vec<String>,
    last: Option<TickReport>,
    /// Set after a failed write; further failures are not warned about.
    failing: bool,
}

impl StatusWriter {
    pub fn new(path: PathBuf, interfaces: Vec<String>) -> Self {
        Self {
            path,
            interfaces,
            last: None,
            failing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `report`, writing the file only when it differs from the last one.
    pub fn observe(&mut self, report: &TickReport) {
        if self.last.as_ref() == Some(report) {
            return;
        }
        match self.write(report) {
            Ok(()) => {
                if self.failing {
                    info!("{} writable again", self.path.display());
                    self.failing = false;
                }
                self.last = Some(report.clone());
            }
            Err(err) if self.failing => {
                debug!("Failed to write {}: {:#}", self.path.display(), err)
            }
            Err(err) => {
                warn!("Failed to write {}: {:#}", self.path.display(), err);
                self.failing = true;
            }
        }
    }

    fn write(&self, report: &TickReport) -> Result<()> {
        let snapshot = StatusSnapshot {
            active: report.active.as_deref(),
            interfaces: &self.interfaces,
            errors: &report.errors,
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let data = serde_json::to_vec_pretty(&snapshot).context("serializing status")?;
        write_atomic(&self.path, &data)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating status dir {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)
            .with_context(|| format!("opening {}", tmp_path.display()))?;
        file.write_all(data)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;
    use uplink_core::ErrorKind;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("status.json");
        let mut writer = StatusWriter::new(path.clone(), vec!["wlan0".into(), "em0".into()]);

        writer.observe(&TickReport {
            active: Some("em0".into()),
            errors: vec![TickError {
                interface: "wlan0".into(),
                kind: ErrorKind::Inspector,
                message: "Link inspector failed for 'wlan0': gone".into(),
            }],
        });

        let value = read(&path);
        assert_eq!(value["active"], "em0");
        assert_eq!(value["interfaces"][1], "em0");
        assert_eq!(value["errors"][0]["kind"], "inspector");
        assert_eq!(value["errors"][0]["interface"], "wlan0");
        assert!(value["updated_at"].as_u64().unwrap() > 0);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_unchanged_report_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let mut writer = StatusWriter::new(path.clone(), vec!["em0".into()]);
        let report = TickReport {
            active: Some("em0".into()),
            errors: Vec::new(),
        };

        writer.observe(&report);
        fs::write(&path, b"sentinel").unwrap();
        writer.observe(&report);
        assert_eq!(fs::read(&path).unwrap(), b"sentinel");

        writer.observe(&TickReport::default());
        assert_eq!(read(&path)["active"], Value::Null);
    }

    #[test]
    fn test_file_mode_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let mut writer = StatusWriter::new(path.clone(), vec!["em0".into()]);
        writer.observe(&TickReport::default());

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_failure_recovers() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("run");
        fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("status.json");
        let mut writer = StatusWriter::new(path.clone(), vec!["em0".into()]);
        let report = TickReport {
            active: Some("em0".into()),
            errors: Vec::new(),
        };

        writer.observe(&report);
        assert!(writer.failing);
        assert!(writer.last.is_none());
        writer.observe(&report);
        assert!(writer.failing);

        fs::remove_file(&blocker).unwrap();
        writer.observe(&report);
        assert!(!writer.failing);
        assert_eq!(read(&path)["active"], "em0");
    }
}
