use uuid::Uuid;

use crate::models::{Cycle, CycleDraft, PeriodLog};
use crate::storage::{Storage, StoreResult};

pub const MAX_GAP_DAYS: i64 = 2;

struct Run<'a> {
    first: &'a PeriodLog,
    last: &'a PeriodLog,
    entries: usize,
}

/// Groups bleeding entries into runs and turns each run into a cycle draft.
///
/// Entries are compared with their predecessor in date order, not with the
/// start of the run, in a single forward scan. Same-date entries are not
/// deduplicated and each counts towards `period_length`.
pub fn draft_cycles(user_id: Uuid, entries: &[PeriodLog]) -> Vec<CycleDraft> {
    let mut bleeding: Vec<&PeriodLog> = entries
        .iter()
        .filter(|log| log.user_id == user_id && log.is_bleeding())
        .collect();
    bleeding.sort_by_key(|log| log.date);

    let mut runs: Vec<Run<'_>> = Vec::new();
    for log in bleeding {
        if let Some(run) = runs
            .last_mut()
            .filter(|run| (log.date - run.last.date).num_days() <= MAX_GAP_DAYS)
        {
            run.last = log;
            run.entries += 1;
            continue;
        }
        runs.push(Run {
            first: log,
            last: log,
            entries: 1,
        });
    }

    runs.iter()
        .enumerate()
        .map(|(i, run)| CycleDraft {
            user_id,
            start_date: run.first.date,
            end_date: run.last.date,
            period_length: run.entries as i32,
            cycle_length: runs
                .get(i + 1)
                .map(|next| (next.first.date - run.first.date).num_days() as i32),
        })
        .collect()
}

/// Recomputes and stores the full cycle set of `user_id`.
///
/// Returns `None` without touching stored cycles when the user has no
/// bleeding entries at all. Storage errors are passed through unchanged.
/// Callers must not run two passes for the same user concurrently.
pub async fn derive_cycles(store: &dyn Storage, user_id: Uuid) -> StoreResult<Option<Vec<Cycle>>> {
    let entries = store.list_qualifying_log_entries(user_id).await?;
    let drafts = draft_cycles(user_id, &entries);
    if drafts.is_empty() {
        tracing::debug!(%user_id, "no bleeding entries, keeping existing cycles");
        return Ok(None);
    }

    let cycles = store.replace_cycles(user_id, drafts).await?;
    tracing::debug!(%user_id, cycles = cycles.len(), "cycles derived");
    Ok(Some(cycles))
}
