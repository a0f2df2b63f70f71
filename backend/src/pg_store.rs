use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use time::OffsetDateTime;
use uuid::Uuid;
use shared::models::*;
use crate::store::{Cleared, ContestStore, StoreError};

const COSTUME_COLUMNS: &str = "id, user_id, name, description, image_url, submitted_at, updated_at";
const VOTE_COLUMNS: &str = "id, voter_id, costume_id, cast_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn costume_from_row(row: &PgRow) -> Result<Costume, sqlx::Error> {
    Ok(Costume {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        submitted_at: row.try_get("submitted_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn vote_from_row(row: &PgRow) -> Result<Vote, sqlx::Error> {
    Ok(Vote {
        id: row.try_get("id")?,
        voter_id: row.try_get("voter_id")?,
        costume_id: row.try_get("costume_id")?,
        timestamp: row.try_get("cast_at")?,
    })
}

fn settings_from_row(row: &PgRow) -> Result<ContestSettings, sqlx::Error> {
    let costume_ids: Vec<Uuid> = row.try_get("revote_costume_ids")?;
    let excluded: Vec<String> = row.try_get("revote_excluded_user_ids")?;
    Ok(ContestSettings {
        voting_enabled: row.try_get("voting_enabled")?,
        results_visible: row.try_get("results_visible")?,
        allow_self_vote: row.try_get("allow_self_vote")?,
        contest_active: row.try_get("contest_active")?,
        revote_mode: row.try_get("revote_mode")?,
        revote_costume_ids: costume_ids.into_iter().collect(),
        revote_excluded_user_ids: excluded.into_iter().collect(),
        last_reset: row.try_get("last_reset")?,
        last_updated: row.try_get("last_updated")?,
    })
}

async fn write_settings<'e, E: PgExecutor<'e>>(executor: E, s: &ContestSettings) -> Result<(), sqlx::Error> {
    let costume_ids: Vec<Uuid> = s.revote_costume_ids.iter().copied().collect();
    let excluded: Vec<String> = s.revote_excluded_user_ids.iter().cloned().collect();

    sqlx::query(
        "INSERT INTO contest.app_settings
         (id, voting_enabled, results_visible, allow_self_vote, contest_active, revote_mode,
          revote_costume_ids, revote_excluded_user_ids, last_reset, last_updated)
         VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (id) DO UPDATE SET
            voting_enabled = EXCLUDED.voting_enabled,
            results_visible = EXCLUDED.results_visible,
            allow_self_vote = EXCLUDED.allow_self_vote,
            contest_active = EXCLUDED.contest_active,
            revote_mode = EXCLUDED.revote_mode,
            revote_costume_ids = EXCLUDED.revote_costume_ids,
            revote_excluded_user_ids = EXCLUDED.revote_excluded_user_ids,
            last_reset = EXCLUDED.last_reset,
            last_updated = EXCLUDED.last_updated"
    )
    .bind(s.voting_enabled)
    .bind(s.results_visible)
    .bind(s.allow_self_vote)
    .bind(s.contest_active)
    .bind(s.revote_mode)
    .bind(&costume_ids)
    .bind(&excluded)
    .bind(s.last_reset)
    .bind(s.last_updated)
    .execute(executor)
    .await?;
    Ok(())
}

async fn delete_votes<'e, E: PgExecutor<'e>>(executor: E, kind: VoteKind) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM contest.votes WHERE kind = $1")
        .bind(kind)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[rocket::async_trait]
impl ContestStore for PgStore {
    async fn load_settings(&self) -> Result<Option<ContestSettings>, StoreError> {
        let row = sqlx::query("SELECT * FROM contest.app_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(settings_from_row).transpose()?)
    }

    async fn save_settings(&self, settings: &ContestSettings) -> Result<(), StoreError> {
        Ok(write_settings(&self.pool, settings).await?)
    }

    async fn list_costumes(&self) -> Result<Vec<Costume>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COSTUME_COLUMNS} FROM contest.costumes ORDER BY submitted_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(costume_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_costume(&self, id: Uuid) -> Result<Option<Costume>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COSTUME_COLUMNS} FROM contest.costumes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(costume_from_row).transpose()?)
    }

    async fn costume_by_user(&self, user_id: &str) -> Result<Option<Costume>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COSTUME_COLUMNS} FROM contest.costumes WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(costume_from_row).transpose()?)
    }

    async fn insert_costume(&self, costume: &Costume) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO contest.costumes ({COSTUME_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(costume.id)
        .bind(&costume.user_id)
        .bind(&costume.name)
        .bind(&costume.description)
        .bind(&costume.image_url)
        .bind(costume.submitted_at)
        .bind(costume.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_costume(&self, costume: &Costume) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE contest.costumes SET name = $2, description = $3, image_url = $4, updated_at = $5
             WHERE id = $1"
        )
        .bind(costume.id)
        .bind(&costume.name)
        .bind(&costume.description)
        .bind(&costume.image_url)
        .bind(costume.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_costume(&self, id: Uuid) -> Result<(), StoreError> {
        // Votes go with the costume through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM contest.costumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_votes(&self, kind: VoteKind) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VOTE_COLUMNS} FROM contest.votes WHERE kind = $1 ORDER BY cast_at, id"
        ))
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(vote_from_row).collect::<Result<_, _>>()?)
    }

    async fn vote_by_voter(&self, kind: VoteKind, voter_id: &str) -> Result<Option<Vote>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {VOTE_COLUMNS} FROM contest.votes WHERE kind = $1 AND voter_id = $2"
        ))
        .bind(kind)
        .bind(voter_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(vote_from_row).transpose()?)
    }

    async fn upsert_vote(&self, kind: VoteKind, voter_id: &str, costume_id: Uuid, at: OffsetDateTime) -> Result<Vote, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO contest.votes (id, kind, voter_id, costume_id, cast_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT ON CONSTRAINT one_vote_per_voter
             DO UPDATE SET costume_id = EXCLUDED.costume_id, cast_at = EXCLUDED.cast_at
             RETURNING {VOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(kind)
        .bind(voter_id)
        .bind(costume_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(vote_from_row(&row)?)
    }

    async fn replace_settings_clearing(&self, settings: &ContestSettings, clear: &[VoteKind]) -> Result<Cleared, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut cleared = Cleared::default();

        for kind in clear {
            let n = delete_votes(&mut *tx, *kind).await?;
            match kind {
                VoteKind::Initial => cleared.votes = n,
                VoteKind::Revote => cleared.revotes = n,
            }
        }
        write_settings(&mut *tx, settings).await?;

        tx.commit().await?;
        Ok(cleared)
    }

    async fn reset_all(&self, settings: &ContestSettings) -> Result<Cleared, StoreError> {
        let mut tx = self.pool.begin().await?;

        let votes = delete_votes(&mut *tx, VoteKind::Initial).await?;
        let revotes = delete_votes(&mut *tx, VoteKind::Revote).await?;
        let costumes = sqlx::query("DELETE FROM contest.costumes")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        write_settings(&mut *tx, settings).await?;

        tx.commit().await?;
        Ok(Cleared { costumes, votes, revotes })
    }
}
