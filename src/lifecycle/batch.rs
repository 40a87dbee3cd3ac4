use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::{ItemErrorCode, ItemResult, LifecycleEngine};
use crate::error::EngineError;

/// The lifecycle transitions that accept an id set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Trash,
    Restore,
    PermanentlyDelete,
}

/// Per-item results plus the ids that did not resolve to a document owned by
/// the caller. Callers scan `results` to tell partial success from total
/// failure; there is no aggregate status.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<ItemResult>,
    pub missing_ids: Vec<String>,
}

impl LifecycleEngine {
    /// Fan `action` out over `ids` for documents owned by `uid`.
    ///
    /// Resolution is a single ownership-filtered query; ids that are absent
    /// or not owned land in `missing_ids` (silent partial success). An empty
    /// resolution is a `NotFound` failure. Items run as independent tasks --
    /// one item's failure never aborts its siblings -- and results come back
    /// in resolution order regardless of completion order.
    pub async fn run_batch(
        &self,
        uid: &str,
        ids: &[String],
        action: LifecycleAction,
    ) -> Result<BatchOutcome, EngineError> {
        if ids.is_empty() {
            return Err(EngineError::Validation(
                "no document ids supplied".to_string(),
            ));
        }

        // Dedupe while preserving request order.
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let docs = self.meta.find_documents_by_ids_and_owner(&ids, uid).await?;
        let found: HashSet<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        let missing_ids: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();

        if docs.is_empty() {
            return Err(EngineError::NotFound);
        }

        let item_ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        let mut tasks = JoinSet::new();
        for (idx, doc) in docs.into_iter().enumerate() {
            let engine = self.clone();
            tasks.spawn(async move {
                let result = match action {
                    LifecycleAction::Trash => engine.trash(&doc).await,
                    LifecycleAction::Restore => engine.restore(&doc).await,
                    LifecycleAction::PermanentlyDelete => engine.permanently_delete(&doc).await,
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<ItemResult>> = vec![None; item_ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::error!(error = %e, "Batch item task failed"),
            }
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    ItemResult::error(&item_ids[idx], ItemErrorCode::DbError, "item task aborted")
                })
            })
            .collect();

        Ok(BatchOutcome {
            results,
            missing_ids,
        })
    }
}
