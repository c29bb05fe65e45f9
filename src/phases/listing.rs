//! Phase 2: Listing
//!
//! Every repository lists the entries below its changed directories. The
//! queries only read the dirstate; the reported kinds are stored once all
//! repositories have answered.

use log::info;
use rayon::ThreadPool;

use super::{fan_out, settle, Phase, RepoWarning};
use crate::dirstate::{Dirstate, Facts};
use crate::error::Result;
use crate::registry::Registry;

/// Execute Phase 2: Listing
///
/// Returns the number of entries listed.
pub fn execute(
    pool: &ThreadPool,
    registry: &Registry,
    dirstate: &mut Dirstate,
    warnings: &mut Vec<RepoWarning>,
) -> Result<usize> {
    let snapshot: &Dirstate = dirstate;
    let results = fan_out(pool, registry, |backend| {
        backend.find_entries(registry, snapshot)
    });
    let per_repo = settle(Phase::Listing, results, warnings)?;

    let mut total = 0;
    for (_, entries) in per_repo {
        total += entries.len();
        for (path, kind) in entries {
            dirstate.store_item(&path, Facts::kind(kind));
        }
    }

    info!("listing: {} entries, {} paths known", total, dirstate.len());
    Ok(total)
}
