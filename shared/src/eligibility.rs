use crate::error::ContestError;
use crate::models::{ContestSettings, Costume, VoteKind};

/// Whether `voter_id` may vote for `costume` right now, and into which
/// collection the vote goes.
pub fn check_vote(settings: &ContestSettings, voter_id: &str, costume: &Costume) -> Result<VoteKind, ContestError> {
    if !settings.voting_enabled {
        return Err(ContestError::VotingClosed);
    }

    if settings.revote_mode {
        if settings.revote_excluded_user_ids.contains(voter_id) {
            return Err(ContestError::ExcludedFromRevote);
        }
        if !settings.revote_costume_ids.contains(&costume.id) {
            return Err(ContestError::NotInRevote);
        }
    }

    if costume.is_owned_by(voter_id) && !settings.allow_self_vote {
        return Err(ContestError::SelfVoteNotAllowed);
    }

    Ok(settings.active_vote_kind())
}

pub fn check_submission(settings: &ContestSettings, existing: Option<&Costume>) -> Result<(), ContestError> {
    if settings.revote_mode {
        return Err(ContestError::SubmissionsClosed);
    }
    if existing.is_some() {
        return Err(ContestError::CostumeAlreadySubmitted);
    }
    Ok(())
}

pub fn check_owner(costume: &Costume, user_id: &str) -> Result<(), ContestError> {
    if costume.is_owned_by(user_id) { Ok(()) } else { Err(ContestError::NotOwner) }
}
