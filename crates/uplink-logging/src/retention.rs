use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;
use crate::init::log_dir;

pub const MAX_LOG_BYTES: u64 = 200 * 1024 * 1024;

/// Prefixes of files this workspace writes into the log directory.
const LOG_PREFIXES: [&str; 4] = ["uplinkd.log", "link.log", "dhcp.log", "dhcp-"];

struct LogFile {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Delete logs older than `keep_days`, then the oldest ones until the total
/// fits under `max_bytes`. Returns the number of files removed.
pub fn run_retention(root: &Path, cfg: &LoggingConfig) -> Result<usize> {
    prune(&log_dir(root), cfg.keep_days, MAX_LOG_BYTES)
}

pub fn prune(dir: &Path, keep_days: u64, max_bytes: u64) -> Result<usize> {
    let mut entries = collect_log_files(dir)?;
    let mut removed = 0;

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(keep_days.saturating_mul(24 * 60 * 60)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    entries.retain(|entry| {
        if entry.modified >= cutoff {
            return true;
        }
        match fs::remove_file(&entry.path) {
            Ok(()) => {
                removed += 1;
                false
            }
            Err(err) => {
                tracing::warn!("Failed to remove old log {}: {}", entry.path.display(), err);
                true
            }
        }
    });

    let mut total_size: u64 = entries.iter().map(|e| e.size).sum();
    if total_size > max_bytes {
        entries.sort_by_key(|e| e.modified);
        for entry in entries {
            if total_size <= max_bytes {
                break;
            }
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(
                    "Failed to remove log {} during size cap cleanup: {}",
                    entry.path.display(),
                    err
                );
                continue;
            }
            removed += 1;
            total_size = total_size.saturating_sub(entry.size);
        }
    }

    Ok(removed)
}

fn collect_log_files(dir: &Path) -> Result<Vec<LogFile>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }

    let entries = fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("iterating {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_log = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(is_log_name)
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let metadata = fs::metadata(&path).with_context(|| format!("stat {}", path.display()))?;
        files.push(LogFile {
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
            path,
        });
    }

    Ok(files)
}

fn is_log_name(name: &str) -> bool {
    LOG_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_log_name() {
        assert!(is_log_name("uplinkd.log.2026-10-01"));
        assert!(is_log_name("dhcp-em0.log"));
        assert!(is_log_name("link.log"));
        assert!(!is_log_name("status.json"));
    }

    #[test]
    fn test_missing_dir_is_ok() {
        let root = TempDir::new().unwrap();
        assert_eq!(prune(&root.path().join("logs"), 14, MAX_LOG_BYTES).unwrap(), 0);
    }

    #[test]
    fn test_size_cap_removes_oldest_first() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        fs::write(dir.join("link.log.old"), vec![b'x'; 600]).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        fs::write(dir.join("link.log.new"), vec![b'x'; 600]).unwrap();
        fs::write(dir.join("notes.txt"), vec![b'x'; 5000]).unwrap();

        let removed = prune(dir, 14, 1000).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.join("link.log.old").exists());
        assert!(dir.join("link.log.new").exists());
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_zero_keep_days_removes_everything_matching() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        fs::write(dir.join("dhcp-em0.log"), b"lease").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = prune(dir, 0, MAX_LOG_BYTES).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.join("dhcp-em0.log").exists());
    }
}
