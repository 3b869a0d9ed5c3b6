use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use patchbay_types::Patch;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::SourceControl;

/// Source control that does nothing. Used when the data directory is not
/// under version control.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSourceControl;

impl SourceControl for NoopSourceControl {
    fn get_staged_diff(&self, _data_dir: &Path, _files: &[PathBuf]) -> LedgerResult<String> {
        Ok(String::new())
    }

    fn commit_patch(
        &self,
        _data_dir: &Path,
        _patch: &Patch,
        _message: &str,
        _files: &[PathBuf],
    ) -> LedgerResult<()> {
        Ok(())
    }
}

/// One commit made through [`RecordingSourceControl`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCommit {
    pub patch_id: String,
    pub message: String,
    pub files: Vec<PathBuf>,
}

/// In-memory source control for tests: records every commit and answers
/// diff requests with a deterministic listing of the staged files.
#[derive(Debug, Default)]
pub struct RecordingSourceControl {
    commits: Mutex<Vec<RecordedCommit>>,
    failing: AtomicBool,
}

impl RecordingSourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again).
    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.lock().expect("lock poisoned").clone()
    }

    fn check(&self) -> LedgerResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::SourceControl("repository unavailable".into()));
        }
        Ok(())
    }
}

impl SourceControl for RecordingSourceControl {
    fn get_staged_diff(&self, data_dir: &Path, files: &[PathBuf]) -> LedgerResult<String> {
        self.check()?;
        let lines: Vec<String> = files
            .iter()
            .map(|f| {
                let shown = f.strip_prefix(data_dir).unwrap_or(f);
                format!("M {}", shown.display())
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn commit_patch(
        &self,
        _data_dir: &Path,
        patch: &Patch,
        message: &str,
        files: &[PathBuf],
    ) -> LedgerResult<()> {
        self.check()?;
        self.commits
            .lock()
            .expect("lock poisoned")
            .push(RecordedCommit {
                patch_id: patch.id.clone(),
                message: message.to_string(),
                files: files.to_vec(),
            });
        Ok(())
    }
}
