use rustrict::CensorStr;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;
use shared::{eligibility, validation, ContestError, ContestView, Feed, Msg};
use shared::models::*;
use shared::user_info::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::images::ImageStore;
use crate::store::{ContestStore, StoreError};

pub struct ContestProcessor;

fn require_verified(user: &AuthUser) -> Result<(), ContestError> {
    if user.email_verified { Ok(()) } else { Err(ContestError::EmailNotVerified) }
}

fn check_costume_text(name: &str, description: &str) -> Result<(), ContestError> {
    validation::validate_costume(name, description)?;
    if name.is_inappropriate() {
        return Err(ContestError::Inappropriate("costume name"));
    }
    if description.is_inappropriate() {
        return Err(ContestError::Inappropriate("description"));
    }
    Ok(())
}

fn feed_outcome<T>(view: &mut ContestView, feed: Feed, result: Result<T, StoreError>, msg: impl FnOnce(T) -> Msg) {
    match result {
        Ok(value) => view.reduce(msg(value)),
        Err(e) => {
            warn!("Failed to load {:?} snapshot: {}", feed, e);
            view.reduce(Msg::FeedFailed(feed, e.to_string()));
        }
    }
}

impl ContestProcessor {
    /// Returns the settings record, creating it with defaults when absent.
    pub async fn ensure_settings(store: &dyn ContestStore) -> Result<ContestSettings, StoreError> {
        if let Some(settings) = store.load_settings().await? {
            return Ok(settings);
        }
        let settings = ContestSettings::defaults(OffsetDateTime::now_utc());
        store.save_settings(&settings).await?;
        info!("Created contest settings with defaults");
        Ok(settings)
    }

    /// Snapshot of all four collections. A collection that fails to load
    /// degrades to empty instead of failing the read.
    pub async fn load_view(store: &dyn ContestStore) -> ContestView {
        let (costumes, votes, revotes, settings) = futures::join!(
            store.list_costumes(),
            store.list_votes(VoteKind::Initial),
            store.list_votes(VoteKind::Revote),
            store.load_settings(),
        );

        let mut view = ContestView::new();
        feed_outcome(&mut view, Feed::Costumes, costumes, Msg::CostumesReceived);
        feed_outcome(&mut view, Feed::Votes, votes, |v| Msg::VotesReceived(VoteKind::Initial, v));
        feed_outcome(&mut view, Feed::Revotes, revotes, |v| Msg::VotesReceived(VoteKind::Revote, v));
        feed_outcome(&mut view, Feed::Settings, settings, Msg::SettingsReceived);
        view
    }

    pub async fn results(store: &dyn ContestStore, is_admin: bool) -> ApiResult<ResultsBoard> {
        let view = Self::load_view(store).await;
        if !is_admin && !view.settings().results_visible {
            return Err(ApiError::ResultsHidden);
        }
        if view.is_degraded() {
            warn!("Serving results from partial data: {:?}", view.failed_feeds());
        }
        Ok(ResultsBoard {
            results: view.results().to_vec(),
            degraded: view.failed_feeds(),
        })
    }

    pub async fn submit_costume(
        store: &dyn ContestStore,
        user: &AuthUser,
        name: &str,
        description: &str,
    ) -> ApiResult<Costume> {
        require_verified(user)?;
        check_costume_text(name, description)?;

        let settings = Self::ensure_settings(store).await?;
        let existing = store.costume_by_user(&user.id).await?;
        eligibility::check_submission(&settings, existing.as_ref())?;

        let costume = Costume::new(user.id.clone(), name.trim(), description.trim());
        match store.insert_costume(&costume).await {
            Ok(()) => {
                info!("Costume {} submitted by {}", costume.id, user.id);
                Ok(costume)
            }
            Err(StoreError::Conflict) => Err(ContestError::CostumeAlreadySubmitted.into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_costume(
        store: &dyn ContestStore,
        user: &AuthUser,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> ApiResult<Costume> {
        require_verified(user)?;
        check_costume_text(name, description)?;

        let mut costume = store.get_costume(id).await?.ok_or(ContestError::CostumeNotFound)?;
        eligibility::check_owner(&costume, &user.id)?;

        costume.name = name.trim().to_string();
        costume.description = description.trim().to_string();
        costume.updated_at = OffsetDateTime::now_utc();
        store.update_costume(&costume).await?;
        Ok(costume)
    }

    /// Stores the caller's costume image and points their costume at it.
    pub async fn upload_image(
        store: &dyn ContestStore,
        images: &dyn ImageStore,
        user: &AuthUser,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<Costume> {
        require_verified(user)?;
        let ext = validation::validate_image(content_type, bytes.len())?;

        let mut costume = store.costume_by_user(&user.id).await?.ok_or(ContestError::CostumeNotFound)?;
        let key = validation::image_key(&user.id, user.name_or_id(), ext);

        images.put(&key, bytes).await?;

        let previous = costume.image_url.replace(key.clone());
        costume.updated_at = OffsetDateTime::now_utc();
        store.update_costume(&costume).await?;

        if let Some(old_key) = previous.as_deref().and_then(validation::storage_key) {
            if old_key != key {
                if let Err(e) = images.delete(old_key).await {
                    warn!("Failed to delete replaced image {}: {}", old_key, e);
                }
            }
        }

        info!("Image {} stored for costume {}", key, costume.id);
        Ok(costume)
    }

    /// Removes a costume, its votes, and its stored image. Owners may delete
    /// their own costume; admins may delete any.
    pub async fn delete_costume(
        store: &dyn ContestStore,
        images: &dyn ImageStore,
        user: &AuthUser,
        id: Uuid,
        is_admin: bool,
    ) -> ApiResult<()> {
        let costume = store.get_costume(id).await?.ok_or(ContestError::CostumeNotFound)?;
        if !is_admin {
            eligibility::check_owner(&costume, &user.id)?;
        }

        store.delete_costume(id).await?;
        info!("Costume {} deleted by {}", id, user.id);

        if let Some(key) = costume.image_url.as_deref().and_then(validation::storage_key) {
            if let Err(e) = images.delete(key).await {
                warn!("Failed to delete image {} of costume {}: {}", key, id, e);
            }
        }
        Ok(())
    }

    /// Records the caller's vote, replacing any earlier vote they cast in the
    /// same round.
    pub async fn cast_vote(store: &dyn ContestStore, user: &AuthUser, costume_id: Uuid) -> ApiResult<Vote> {
        require_verified(user)?;

        let settings = Self::ensure_settings(store).await?;
        let costume = store.get_costume(costume_id).await?.ok_or(ContestError::CostumeNotFound)?;
        let kind = eligibility::check_vote(&settings, &user.id, &costume)?;

        let vote = store.upsert_vote(kind, &user.id, costume_id, OffsetDateTime::now_utc()).await?;
        info!("Vote by {} for {} recorded in {}", user.id, costume_id, kind.collection());
        Ok(vote)
    }

    /// The caller's vote in the round currently open.
    pub async fn my_vote(store: &dyn ContestStore, user: &AuthUser) -> ApiResult<Option<Vote>> {
        let settings = Self::ensure_settings(store).await?;
        Ok(store.vote_by_voter(settings.active_vote_kind(), &user.id).await?)
    }
}
