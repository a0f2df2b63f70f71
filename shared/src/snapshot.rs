use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use crate::contest_logic::compute_results;
use crate::models::{ContestSettings, Costume, CostumeResult, Vote, VoteKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feed {
    Costumes,
    Votes,
    Revotes,
    Settings,
}

impl From<VoteKind> for Feed {
    fn from(kind: VoteKind) -> Self {
        match kind {
            VoteKind::Initial => Feed::Votes,
            VoteKind::Revote => Feed::Revotes,
        }
    }
}

pub enum Msg {
    CostumesReceived(Vec<Costume>),
    VotesReceived(VoteKind, Vec<Vote>),
    /// `None` when the settings record does not exist yet.
    SettingsReceived(Option<ContestSettings>),
    FeedFailed(Feed, String),
}

/// Last-known-good copies of the live feeds plus the results derived from them.
#[derive(Debug, Clone, Default)]
pub struct ContestView {
    costumes: Vec<Costume>,
    initial_votes: Vec<Vote>,
    revote_votes: Vec<Vote>,
    settings: ContestSettings,
    results: Vec<CostumeResult>,
    errors: HashMap<Feed, String>,
}

impl ContestView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, msg: Msg) {
        match msg {
            Msg::CostumesReceived(costumes) => {
                self.costumes = costumes;
                self.errors.remove(&Feed::Costumes);
            }
            Msg::VotesReceived(kind, votes) => {
                match kind {
                    VoteKind::Initial => self.initial_votes = votes,
                    VoteKind::Revote => self.revote_votes = votes,
                }
                self.errors.remove(&Feed::from(kind));
            }
            Msg::SettingsReceived(settings) => {
                self.settings = settings.unwrap_or_default();
                self.errors.remove(&Feed::Settings);
            }
            Msg::FeedFailed(feed, error) => {
                self.errors.insert(feed, error);
            }
        }
        self.results = compute_results(&self.costumes, &self.initial_votes, &self.revote_votes);
    }

    pub fn costumes(&self) -> &[Costume] { &self.costumes }

    pub fn votes(&self, kind: VoteKind) -> &[Vote] {
        match kind {
            VoteKind::Initial => &self.initial_votes,
            VoteKind::Revote => &self.revote_votes,
        }
    }

    pub fn settings(&self) -> &ContestSettings { &self.settings }

    pub fn results(&self) -> &[CostumeResult] { &self.results }

    /// Feeds whose latest load failed, in a stable order.
    pub fn failed_feeds(&self) -> Vec<Feed> {
        let mut feeds: Vec<Feed> = self.errors.keys().copied().collect();
        feeds.sort();
        feeds
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}
