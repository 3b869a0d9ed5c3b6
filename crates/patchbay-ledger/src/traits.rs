use std::path::{Path, PathBuf};

use patchbay_types::Patch;

use crate::error::LedgerResult;

/// Version-control boundary used after a patch is published.
///
/// Implementations stage exactly the files they are given; nothing else in
/// the working tree is touched.
pub trait SourceControl: Send + Sync {
    /// Diff text of `files` as they would be committed.
    fn get_staged_diff(&self, data_dir: &Path, files: &[PathBuf]) -> LedgerResult<String>;

    /// Stage `files` and commit them with `message`.
    fn commit_patch(
        &self,
        data_dir: &Path,
        patch: &Patch,
        message: &str,
        files: &[PathBuf],
    ) -> LedgerResult<()>;
}
