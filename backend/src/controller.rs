//! Admin-driven contest phase transitions.
//!
//! Each transition reduces the current settings with a [`PhaseCommand`] and
//! persists the result. Vote collections named by [`PhaseCommand::clears`]
//! are emptied in the same atomic store write. Nothing is retried or rolled
//! back here; failures go back to the caller.

use std::collections::HashSet;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use shared::models::*;
use shared::{leading_tie, validation, ContestError, PhaseCommand};
use crate::error::ApiResult;
use crate::images::ImageStore;
use crate::processor::ContestProcessor;
use crate::store::{ContestStore, StoreError};

pub struct PhaseController;

impl PhaseController {
    async fn apply(store: &dyn ContestStore, admin_id: &str, command: PhaseCommand) -> ApiResult<ContestSettings> {
        let current = ContestProcessor::ensure_settings(store).await?;
        let next = current.apply(&command, OffsetDateTime::now_utc());

        let clear = command.clears();
        if clear.is_empty() {
            store.save_settings(&next).await?;
        } else {
            let cleared = store.replace_settings_clearing(&next, clear).await?;
            info!("{} cleared {} votes and {} revotes", command.name(), cleared.votes, cleared.revotes);
        }

        info!("{} applied by {}", command.name(), admin_id);
        Ok(next)
    }

    pub async fn toggle_voting(store: &dyn ContestStore, admin_id: &str, enabled: bool) -> ApiResult<ContestSettings> {
        Self::apply(store, admin_id, PhaseCommand::SetVoting { enabled }).await
    }

    pub async fn toggle_results(store: &dyn ContestStore, admin_id: &str, visible: bool) -> ApiResult<ContestSettings> {
        Self::apply(store, admin_id, PhaseCommand::SetResultsVisible { visible }).await
    }

    pub async fn toggle_self_vote(store: &dyn ContestStore, admin_id: &str, allowed: bool) -> ApiResult<ContestSettings> {
        Self::apply(store, admin_id, PhaseCommand::SetSelfVote { allowed }).await
    }

    /// Opens a tie-break round. Without an explicit scope the current
    /// first-place tie is used.
    #[instrument(skip(store, scope))]
    pub async fn start_revote(
        store: &dyn ContestStore,
        admin_id: &str,
        scope: Option<RevoteScope>,
    ) -> ApiResult<ContestSettings> {
        let scope = match scope {
            Some(scope) if scope.costume_ids.is_empty() => return Err(ContestError::EmptyRevote.into()),
            Some(scope) => scope,
            None => {
                let view = ContestProcessor::load_view(store).await;
                leading_tie(view.results()).ok_or(ContestError::NoLeadingTie)?
            }
        };
        Self::apply(store, admin_id, PhaseCommand::StartRevote { scope }).await
    }

    pub async fn end_revote(store: &dyn ContestStore, admin_id: &str) -> ApiResult<ContestSettings> {
        Self::apply(store, admin_id, PhaseCommand::EndRevote).await
    }

    /// Wipes costumes and votes and restores default settings atomically,
    /// then removes stored images best-effort. Images left behind by a
    /// failure here are picked up by [`PhaseController::sweep_orphan_images`].
    #[instrument(skip(store, images))]
    pub async fn reset_contest(
        store: &dyn ContestStore,
        images: &dyn ImageStore,
        admin_id: &str,
    ) -> ApiResult<ResetReport> {
        let current = ContestProcessor::ensure_settings(store).await?;
        let next = current.apply(&PhaseCommand::Reset, OffsetDateTime::now_utc());
        let cleared = store.reset_all(&next).await?;

        let (images_removed, images_failed) = match images.list(validation::IMAGE_PREFIX).await {
            Ok(stored) => {
                let keys: Vec<String> = stored.into_iter().map(|img| img.key).collect();
                delete_images(images, &keys).await
            }
            Err(e) => {
                warn!("Could not list costume images during reset: {}", e);
                (0, 0)
            }
        };

        info!(
            "Contest reset by {}: {} costumes, {} votes, {} revotes, {} images removed",
            admin_id, cleared.costumes, cleared.votes, cleared.revotes, images_removed
        );

        Ok(ResetReport {
            costumes_removed: cleared.costumes,
            votes_removed: cleared.votes,
            revotes_removed: cleared.revotes,
            images_removed,
            images_failed,
        })
    }

    /// Deletes stored costume images that no costume references and that are
    /// at least `min_age` old. Younger images may belong to an upload whose
    /// costume update has not landed yet. Returns the number removed.
    pub async fn sweep_orphan_images(
        store: &dyn ContestStore,
        images: &dyn ImageStore,
        min_age: Duration,
    ) -> Result<usize, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - min_age;
        let costumes = store.list_costumes().await?;
        let referenced: HashSet<&str> = costumes.iter()
            .filter_map(|c| c.image_url.as_deref().and_then(validation::storage_key))
            .collect();

        let orphans: Vec<String> = images.list(validation::IMAGE_PREFIX).await?
            .into_iter()
            .filter(|img| img.modified <= cutoff && !referenced.contains(img.key.as_str()))
            .map(|img| img.key)
            .collect();

        let (removed, _) = delete_images(images, &orphans).await;
        Ok(removed)
    }
}

async fn delete_images(images: &dyn ImageStore, keys: &[String]) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;
    for key in keys {
        match images.delete(key).await {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!("Failed to delete image {}: {}", key, e);
                failed += 1;
            }
        }
    }
    (removed, failed)
}
