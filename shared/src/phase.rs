use serde::{Serialize, Deserialize};
use time::OffsetDateTime;

use crate::models::{ContestPhase, ContestSettings, RevoteScope, VoteKind};

/// Admin-triggered transitions of the settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PhaseCommand {
    SetVoting { enabled: bool },
    SetResultsVisible { visible: bool },
    SetSelfVote { allowed: bool },
    StartRevote { scope: RevoteScope },
    EndRevote,
    Reset,
}

impl PhaseCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseCommand::SetVoting { .. } => "toggle_voting",
            PhaseCommand::SetResultsVisible { .. } => "toggle_results",
            PhaseCommand::SetSelfVote { .. } => "toggle_self_vote",
            PhaseCommand::StartRevote { .. } => "start_revote",
            PhaseCommand::EndRevote => "end_revote",
            PhaseCommand::Reset => "reset_contest",
        }
    }

    /// Vote collections that must be emptied together with the settings write.
    pub fn clears(&self) -> &'static [VoteKind] {
        match self {
            PhaseCommand::StartRevote { .. } => &[VoteKind::Initial],
            PhaseCommand::Reset => &VoteKind::ALL,
            _ => &[],
        }
    }
}

impl ContestSettings {
    /// Settings after `command`. Pure; persisting and the vote/costume
    /// deletions are up to the caller.
    pub fn apply(&self, command: &PhaseCommand, now: OffsetDateTime) -> ContestSettings {
        let mut next = self.clone();
        match command {
            PhaseCommand::SetVoting { enabled } => next.voting_enabled = *enabled,
            PhaseCommand::SetResultsVisible { visible } => next.results_visible = *visible,
            PhaseCommand::SetSelfVote { allowed } => next.allow_self_vote = *allowed,
            PhaseCommand::StartRevote { scope } => {
                next.voting_enabled = true;
                next.results_visible = false;
                next.revote_mode = true;
                next.revote_costume_ids = scope.costume_ids.clone();
                next.revote_excluded_user_ids = scope.excluded_user_ids.clone();
            }
            PhaseCommand::EndRevote => {
                next.revote_mode = false;
                next.revote_costume_ids.clear();
                next.revote_excluded_user_ids.clear();
                next.voting_enabled = false;
            }
            PhaseCommand::Reset => {
                next = ContestSettings::defaults(now);
                next.last_reset = Some(now);
            }
        }
        next.last_updated = now;
        next
    }

    pub fn phase(&self) -> ContestPhase {
        if self.revote_mode {
            ContestPhase::Revote
        } else if self.results_visible {
            ContestPhase::Results
        } else if self.voting_enabled {
            ContestPhase::Voting
        } else {
            ContestPhase::Submission
        }
    }
}
