//! Phase 1: Change scan
//!
//! Every repository reports the forest paths that differ from its baseline.
//! After all of them have answered, each path is stored as changed, which
//! marks its ancestors changed too.
//!
//! A repository only speaks for the paths it owns. A nested checkout shows
//! up as untracked in its parent's status; such paths are dropped here and
//! left to the nested repository's own scan.

use log::{debug, info};
use rayon::ThreadPool;

use super::{fan_out, settle, Phase, RepoWarning};
use crate::dirstate::{Dirstate, Facts};
use crate::error::Result;
use crate::registry::Registry;

/// Execute Phase 1: Change scan
///
/// Returns the number of changed paths reported.
pub fn execute(
    pool: &ThreadPool,
    registry: &Registry,
    dirstate: &mut Dirstate,
    warnings: &mut Vec<RepoWarning>,
) -> Result<usize> {
    let results = fan_out(pool, registry, |backend| backend.find_changed());
    let per_repo = settle(Phase::Changes, results, warnings)?;

    let mut total = 0;
    for (prefix, paths) in per_repo {
        for path in paths {
            if registry.resolve(&path).prefix != prefix {
                debug!("{}: ignoring '{}' owned by another repository", prefix, path);
                continue;
            }
            dirstate.store_item(&path, Facts::changed());
            total += 1;
        }
    }

    info!(
        "change scan: {} changed paths in {} repositories",
        total,
        registry.len()
    );
    Ok(total)
}
