use crate::{
    Error,
    item::Item,
    plaid::{AggregationApi, RemovedTransaction, SourceTransaction},
};

/// The concatenated result of running one item's sync loop to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Transactions added since the starting cursor.
    pub added: Vec<SourceTransaction>,
    /// Transactions modified since the starting cursor.
    pub modified: Vec<SourceTransaction>,
    /// Transactions removed since the starting cursor.
    pub removed: Vec<RemovedTransaction>,
    /// The checkpoint to persist for the next sync pass.
    pub next_cursor: String,
}

/// Advance one item's transaction history to "caught up".
///
/// Repeatedly calls the incremental sync endpoint, concatenating the
/// added/modified/removed batches across iterations, until the source
/// reports it has no more changes. A `starting_cursor` of `None` fetches the
/// item's history from the beginning.
///
/// The final cursor is returned even when the loop made no net change; it is
/// the caller's job to persist it. Callers should treat the batches by
/// transaction ID, not by position, because an aborted pass whose cursor was
/// never persisted will re-deliver some batches on the next attempt.
///
/// # Errors
/// Returns the first error from the sync endpoint. Batches accumulated
/// before the failure are discarded, so the caller must not persist a
/// cursor for a failed pass.
pub async fn sync_item<C>(
    client: &C,
    item: &Item,
    starting_cursor: Option<String>,
) -> Result<SyncOutcome, Error>
where
    C: AggregationApi,
{
    let mut cursor = starting_cursor;
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut removed = Vec::new();

    loop {
        let page = client
            .transactions_sync(&item.access_token, cursor.as_deref())
            .await?;

        added.extend(page.added);
        modified.extend(page.modified);
        removed.extend(page.removed);

        if !page.has_more {
            tracing::debug!(
                "item {} caught up: {} added, {} modified, {} removed",
                item.item_id,
                added.len(),
                modified.len(),
                removed.len()
            );

            return Ok(SyncOutcome {
                added,
                modified,
                removed,
                next_cursor: page.next_cursor,
            });
        }

        cursor = Some(page.next_cursor);
    }
}
