use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::snapshot::Feed;

/// Which of the two parallel vote collections a vote lives in.
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "vote_kind", rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteKind {
    Initial,
    Revote,
}

impl VoteKind {
    pub const ALL: [VoteKind; 2] = [VoteKind::Initial, VoteKind::Revote];

    pub const fn collection(self) -> &'static str {
        match self {
            VoteKind::Initial => "votes",
            VoteKind::Revote => "revotes",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub submitted_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Costume {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: name.into(),
            description: description.into(),
            image_url: None,
            submitted_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub voter_id: String,
    pub costume_id: Uuid,
    pub timestamp: OffsetDateTime,
}

impl Vote {
    pub fn new(voter_id: impl Into<String>, costume_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            voter_id: voter_id.into(),
            costume_id,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// The single shared record describing the contest phase and revote scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContestSettings {
    pub voting_enabled: bool,
    pub results_visible: bool,
    pub allow_self_vote: bool,
    pub contest_active: bool,
    pub revote_mode: bool,
    #[serde(default)]
    pub revote_costume_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub revote_excluded_user_ids: BTreeSet<String>,
    #[serde(default)]
    pub last_reset: Option<OffsetDateTime>,
    pub last_updated: OffsetDateTime,
}

impl ContestSettings {
    pub fn defaults(now: OffsetDateTime) -> Self {
        Self {
            voting_enabled: false,
            results_visible: false,
            allow_self_vote: false,
            contest_active: true,
            revote_mode: false,
            revote_costume_ids: BTreeSet::new(),
            revote_excluded_user_ids: BTreeSet::new(),
            last_reset: None,
            last_updated: now,
        }
    }

    /// Collection that votes are currently cast into.
    pub fn active_vote_kind(&self) -> VoteKind {
        if self.revote_mode { VoteKind::Revote } else { VoteKind::Initial }
    }
}

impl Default for ContestSettings {
    fn default() -> Self {
        Self::defaults(OffsetDateTime::now_utc())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContestPhase {
    Submission,
    Voting,
    Revote,
    Results,
}

/// A costume with its tally, rank and tie flag. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CostumeResult {
    #[serde(flatten)]
    pub costume: Costume,
    pub vote_count: u32,
    pub initial_vote_count: u32,
    pub revote_vote_count: u32,
    pub rank: u32,
    pub is_tied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevoteScope {
    pub costume_ids: BTreeSet<Uuid>,
    pub excluded_user_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestOverview {
    pub settings: ContestSettings,
    pub phase: ContestPhase,
    pub costumes: Vec<Costume>,
    pub is_admin: bool,
}

/// Ranked results plus the feeds that failed to load for this read. When
/// `degraded` is non-empty the results are computed from partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsBoard {
    pub results: Vec<CostumeResult>,
    pub degraded: Vec<Feed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub costumes_removed: u64,
    pub votes_removed: u64,
    pub revotes_removed: u64,
    pub images_removed: usize,
    pub images_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCostumeRequest {
    pub csrf_token: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub csrf_token: String,
    pub costume_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub csrf_token: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRevoteRequest {
    pub csrf_token: String,
    /// Falls back to the current first-place tie when absent.
    #[serde(default)]
    pub scope: Option<RevoteScope>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActionRequest {
    pub csrf_token: String,
}
