//! Phase 4: Version records
//!
//! Writes one record per git-backed repository whose target commit was
//! resolved, so a later run can use this snapshot as its baseline.

use std::path::Path;

use log::info;

use super::{Phase, RepoWarning};
use crate::error::Result;
use crate::registry::Registry;
use crate::versions::{self, VersionRecord};

/// Execute Phase 4: Version records
///
/// Returns the number of records written.
pub fn execute(
    registry: &Registry,
    output_dir: &Path,
    warnings: &mut Vec<RepoWarning>,
) -> Result<usize> {
    let dir = output_dir.join(versions::VERSIONS_DIR);
    let mut written = 0;

    for backend in registry.backends() {
        let (Some(repo), Some(commit)) = (backend.repository(), backend.target_commit()) else {
            continue;
        };

        let message = match repo.git().commit_message(&repo.git_dir, &commit) {
            Ok(message) => message,
            Err(e) => {
                RepoWarning::new(repo.prefix.clone(), Phase::Record, e.to_string()).emit(warnings);
                String::new()
            }
        };

        let record = VersionRecord {
            prefix: repo.prefix.clone(),
            commit,
            name: repo.name.clone(),
            url: repo.url.clone(),
        };
        versions::write_record(&dir, &record, &message)?;
        written += 1;
    }

    info!("recorded versions of {} repositories", written);
    Ok(written)
}
