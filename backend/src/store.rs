use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;
use shared::models::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists")]
    Conflict,
    #[error("Store lock poisoned")]
    LockFailed,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Object storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Storage(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleared {
    pub costumes: u64,
    pub votes: u64,
    pub revotes: u64,
}

/// The document store holding costumes, both vote collections and the
/// settings record.
#[rocket::async_trait]
pub trait ContestStore: Send + Sync {
    async fn load_settings(&self) -> Result<Option<ContestSettings>, StoreError>;
    async fn save_settings(&self, settings: &ContestSettings) -> Result<(), StoreError>;

    /// Costumes in submission order.
    async fn list_costumes(&self) -> Result<Vec<Costume>, StoreError>;
    async fn get_costume(&self, id: Uuid) -> Result<Option<Costume>, StoreError>;
    async fn costume_by_user(&self, user_id: &str) -> Result<Option<Costume>, StoreError>;
    /// Fails with `Conflict` when the owner already has a costume.
    async fn insert_costume(&self, costume: &Costume) -> Result<(), StoreError>;
    async fn update_costume(&self, costume: &Costume) -> Result<(), StoreError>;
    /// Removes the costume and every vote cast for it.
    async fn delete_costume(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_votes(&self, kind: VoteKind) -> Result<Vec<Vote>, StoreError>;
    async fn vote_by_voter(&self, kind: VoteKind, voter_id: &str) -> Result<Option<Vote>, StoreError>;
    /// Inserts or replaces the voter's single vote in `kind`, atomically.
    async fn upsert_vote(&self, kind: VoteKind, voter_id: &str, costume_id: Uuid, at: OffsetDateTime) -> Result<Vote, StoreError>;

    /// Empties `clear` and writes `settings` in one atomic step.
    async fn replace_settings_clearing(&self, settings: &ContestSettings, clear: &[VoteKind]) -> Result<Cleared, StoreError>;
    /// Removes every costume and vote and writes `settings` in one atomic step.
    async fn reset_all(&self, settings: &ContestSettings) -> Result<Cleared, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    settings: Option<ContestSettings>,
    costumes: Vec<Costume>,
    votes: HashMap<(VoteKind, String), Vote>,
}

impl MemoryState {
    fn clear_votes(&mut self, kind: VoteKind) -> u64 {
        let before = self.votes.len();
        self.votes.retain(|(k, _), _| *k != kind);
        (before - self.votes.len()) as u64
    }

    fn sorted_votes(&self, kind: VoteKind) -> Vec<Vote> {
        let mut votes: Vec<Vote> = self.votes.iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, v)| v.clone())
            .collect();
        votes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        votes
    }
}

/// In-process store; one lock scope per operation keeps multi-record
/// writes atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockFailed)
    }
}

#[rocket::async_trait]
impl ContestStore for MemoryStore {
    async fn load_settings(&self) -> Result<Option<ContestSettings>, StoreError> {
        Ok(self.lock()?.settings.clone())
    }

    async fn save_settings(&self, settings: &ContestSettings) -> Result<(), StoreError> {
        self.lock()?.settings = Some(settings.clone());
        Ok(())
    }

    async fn list_costumes(&self) -> Result<Vec<Costume>, StoreError> {
        Ok(self.lock()?.costumes.clone())
    }

    async fn get_costume(&self, id: Uuid) -> Result<Option<Costume>, StoreError> {
        Ok(self.lock()?.costumes.iter().find(|c| c.id == id).cloned())
    }

    async fn costume_by_user(&self, user_id: &str) -> Result<Option<Costume>, StoreError> {
        Ok(self.lock()?.costumes.iter().find(|c| c.user_id == user_id).cloned())
    }

    async fn insert_costume(&self, costume: &Costume) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.costumes.iter().any(|c| c.user_id == costume.user_id || c.id == costume.id) {
            return Err(StoreError::Conflict);
        }
        state.costumes.push(costume.clone());
        Ok(())
    }

    async fn update_costume(&self, costume: &Costume) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let slot = state.costumes.iter_mut()
            .find(|c| c.id == costume.id)
            .ok_or(StoreError::NotFound)?;
        *slot = costume.clone();
        Ok(())
    }

    async fn delete_costume(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let before = state.costumes.len();
        state.costumes.retain(|c| c.id != id);
        if state.costumes.len() == before {
            return Err(StoreError::NotFound);
        }
        state.votes.retain(|_, v| v.costume_id != id);
        Ok(())
    }

    async fn list_votes(&self, kind: VoteKind) -> Result<Vec<Vote>, StoreError> {
        Ok(self.lock()?.sorted_votes(kind))
    }

    async fn vote_by_voter(&self, kind: VoteKind, voter_id: &str) -> Result<Option<Vote>, StoreError> {
        Ok(self.lock()?.votes.get(&(kind, voter_id.to_string())).cloned())
    }

    async fn upsert_vote(&self, kind: VoteKind, voter_id: &str, costume_id: Uuid, at: OffsetDateTime) -> Result<Vote, StoreError> {
        let mut state = self.lock()?;
        let vote = state.votes
            .entry((kind, voter_id.to_string()))
            .and_modify(|v| {
                v.costume_id = costume_id;
                v.timestamp = at;
            })
            .or_insert_with(|| Vote {
                id: Uuid::new_v4(),
                voter_id: voter_id.to_string(),
                costume_id,
                timestamp: at,
            });
        Ok(vote.clone())
    }

    async fn replace_settings_clearing(&self, settings: &ContestSettings, clear: &[VoteKind]) -> Result<Cleared, StoreError> {
        let mut state = self.lock()?;
        let mut cleared = Cleared::default();
        for kind in clear {
            let n = state.clear_votes(*kind);
            match kind {
                VoteKind::Initial => cleared.votes = n,
                VoteKind::Revote => cleared.revotes = n,
            }
        }
        state.settings = Some(settings.clone());
        Ok(cleared)
    }

    async fn reset_all(&self, settings: &ContestSettings) -> Result<Cleared, StoreError> {
        let mut state = self.lock()?;
        let cleared = Cleared {
            costumes: state.costumes.len() as u64,
            votes: state.clear_votes(VoteKind::Initial),
            revotes: state.clear_votes(VoteKind::Revote),
        };
        state.costumes.clear();
        state.settings = Some(settings.clone());
        Ok(cleared)
    }
}
