#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use time::OffsetDateTime;
    use uuid::Uuid;
    use crate::contest_logic::{compute_results, leading_tie, tally, total_votes};
    use crate::eligibility::{check_owner, check_submission, check_vote};
    use crate::error::{ContestError, UploadError};
    use crate::models::{ContestPhase, ContestSettings, Costume, RevoteScope, Vote, VoteKind};
    use crate::phase::PhaseCommand;
    use crate::snapshot::{ContestView, Feed, Msg};
    use crate::validation::*;

    fn costume(owner: &str) -> Costume {
        Costume::new(owner, format!("{owner}'s costume"), "spooky")
    }

    fn votes_for(costume: &Costume, n: usize) -> Vec<Vote> {
        (0..n).map(|i| Vote::new(format!("voter-{}-{i}", costume.user_id), costume.id)).collect()
    }

    fn open_voting() -> ContestSettings {
        let mut s = ContestSettings::default();
        s.voting_enabled = true;
        s
    }

    fn revote_settings(costumes: &[&Costume]) -> ContestSettings {
        let scope = RevoteScope {
            costume_ids: costumes.iter().map(|c| c.id).collect(),
            excluded_user_ids: costumes.iter().map(|c| c.user_id.clone()).collect(),
        };
        ContestSettings::default().apply(&PhaseCommand::StartRevote { scope }, OffsetDateTime::now_utc())
    }

    #[test]
    fn test_two_way_tie_for_first() {
        let (a, b, c) = (costume("a"), costume("b"), costume("c"));
        let initial: Vec<Vote> = [votes_for(&a, 3), votes_for(&b, 3), votes_for(&c, 1)].concat();

        let results = compute_results(&[a.clone(), b.clone(), c.clone()], &initial, &[]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].costume.id, a.id);
        assert_eq!(results[1].costume.id, b.id);
        assert_eq!((results[0].rank, results[0].is_tied), (1, true));
        assert_eq!((results[1].rank, results[1].is_tied), (1, true));
        assert_eq!(results[2].costume.id, c.id);
        assert_eq!((results[2].rank, results[2].is_tied), (3, false));
    }

    #[test]
    fn test_counts_combine_both_collections() {
        let (a, b) = (costume("a"), costume("b"));
        let initial = votes_for(&a, 2);
        let revote = [votes_for(&b, 4), votes_for(&a, 1)].concat();

        let results = compute_results(&[a.clone(), b.clone()], &initial, &revote);

        assert_eq!(results[0].costume.id, b.id);
        assert_eq!(results[0].vote_count, 4);
        assert_eq!((results[1].rank, results[1].is_tied), (2, false));
        assert_eq!(results[1].initial_vote_count, 2);
        assert_eq!(results[1].revote_vote_count, 1);
        for r in &results {
            assert_eq!(r.vote_count, r.initial_vote_count + r.revote_vote_count);
        }
        assert_eq!(total_votes(&results) as usize, initial.len() + revote.len());

        let level = compute_results(&[a.clone(), b.clone()], &initial, &[votes_for(&b, 3), votes_for(&a, 1)].concat());
        assert_eq!(level[0].costume.id, a.id);
        assert!(level.iter().all(|r| r.rank == 1 && r.is_tied));
    }

    #[test]
    fn test_three_way_tie_shares_rank() {
        let costumes: Vec<Costume> = ["a", "b", "c", "d", "e"].iter().map(|o| costume(o)).collect();
        let initial = [
            votes_for(&costumes[0], 4),
            votes_for(&costumes[1], 2),
            votes_for(&costumes[2], 2),
            votes_for(&costumes[3], 2),
        ].concat();

        let results = compute_results(&costumes, &initial, &[]);
        let ranks: Vec<u32> = results.iter().map(|r| r.rank).collect();
        let tied: Vec<bool> = results.iter().map(|r| r.is_tied).collect();

        assert_eq!(ranks, vec![1, 2, 2, 2, 5]);
        assert_eq!(tied, vec![false, true, true, true, false]);
        for w in results.windows(2) {
            assert!(w[0].vote_count >= w[1].vote_count);
            if w[0].vote_count == w[1].vote_count {
                assert_eq!(w[0].rank, w[1].rank);
            }
        }
    }

    #[test]
    fn test_edge_cases() {
        assert!(compute_results(&[], &[], &[]).is_empty());

        let (a, b) = (costume("a"), costume("b"));
        let results = compute_results(&[a.clone(), b.clone()], &votes_for(&b, 1), &[]);
        assert_eq!(results[1].costume.id, a.id);
        assert_eq!(results[1].vote_count, 0);
        assert_eq!(results[1].rank, 2);

        let all_zero = compute_results(&[a, b], &[], &[]);
        assert!(all_zero.iter().all(|r| r.rank == 1 && r.is_tied));
        assert!(leading_tie(&all_zero).is_none());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let costumes: Vec<Costume> = ["a", "b", "c"].iter().map(|o| costume(o)).collect();
        let initial = [votes_for(&costumes[2], 2), votes_for(&costumes[0], 2)].concat();
        let revote = votes_for(&costumes[1], 1);

        assert_eq!(
            compute_results(&costumes, &initial, &revote),
            compute_results(&costumes, &initial, &revote)
        );
    }

    #[test]
    fn test_tally_ignores_unknown_costumes_in_results() {
        let a = costume("a");
        let stray = Vote::new("someone", Uuid::new_v4());
        assert_eq!(tally(&[stray.clone()]).get(&stray.costume_id), Some(&1));

        let results = compute_results(&[a], &[stray], &[]);
        assert_eq!(results[0].vote_count, 0);
    }

    #[test]
    fn test_leading_tie_scope() {
        let (a, b, c) = (costume("a"), costume("b"), costume("c"));
        let initial = [votes_for(&a, 3), votes_for(&b, 3), votes_for(&c, 1)].concat();
        let results = compute_results(&[a.clone(), b.clone(), c.clone()], &initial, &[]);

        let scope = leading_tie(&results).unwrap();
        assert_eq!(scope.costume_ids, BTreeSet::from([a.id, b.id]));
        assert_eq!(scope.excluded_user_ids, BTreeSet::from(["a".to_string(), "b".to_string()]));

        let clear_winner = compute_results(&[a.clone(), c.clone()], &votes_for(&a, 2), &[]);
        assert!(leading_tie(&clear_winner).is_none());
    }

    #[test]
    fn test_phase_transitions() {
        let now = OffsetDateTime::now_utc();
        let base = ContestSettings::defaults(now);
        assert_eq!(base.phase(), ContestPhase::Submission);

        let voting = base.apply(&PhaseCommand::SetVoting { enabled: true }, now);
        assert!(voting.voting_enabled);
        assert_eq!(voting.phase(), ContestPhase::Voting);
        assert_eq!(voting.apply(&PhaseCommand::SetVoting { enabled: true }, now), voting);

        let shown = voting.apply(&PhaseCommand::SetResultsVisible { visible: true }, now);
        assert_eq!(shown.phase(), ContestPhase::Results);

        let self_vote = base.apply(&PhaseCommand::SetSelfVote { allowed: true }, now);
        assert!(self_vote.allow_self_vote);
        assert!(PhaseCommand::SetSelfVote { allowed: true }.clears().is_empty());
    }

    #[test]
    fn test_revote_start_and_end() {
        let (a, b) = (costume("a"), costume("b"));
        let mut settings = revote_settings(&[&a, &b]);
        settings.results_visible = false;

        assert!(settings.revote_mode && settings.voting_enabled && !settings.results_visible);
        assert_eq!(settings.phase(), ContestPhase::Revote);
        assert_eq!(settings.active_vote_kind(), VoteKind::Revote);
        assert!(settings.revote_costume_ids.contains(&a.id));
        assert!(settings.revote_excluded_user_ids.contains("b"));

        let ended = settings.apply(&PhaseCommand::EndRevote, OffsetDateTime::now_utc());
        assert!(!ended.revote_mode && !ended.voting_enabled);
        assert!(ended.revote_costume_ids.is_empty());
        assert!(ended.revote_excluded_user_ids.is_empty());
        assert_eq!(ended.active_vote_kind(), VoteKind::Initial);

        let scope = RevoteScope { costume_ids: BTreeSet::from([a.id]), excluded_user_ids: BTreeSet::new() };
        assert_eq!(PhaseCommand::StartRevote { scope }.clears(), &[VoteKind::Initial]);
        assert!(PhaseCommand::EndRevote.clears().is_empty());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let now = OffsetDateTime::now_utc();
        let mut messy = ContestSettings::defaults(now);
        messy.voting_enabled = true;
        messy.results_visible = true;
        messy.allow_self_vote = true;
        messy.contest_active = false;

        let reset = messy.apply(&PhaseCommand::Reset, now);
        assert!(reset.contest_active && !reset.voting_enabled && !reset.results_visible);
        assert!(!reset.allow_self_vote && !reset.revote_mode);
        assert_eq!(reset.last_reset, Some(now));
        assert_eq!(PhaseCommand::Reset.clears(), &VoteKind::ALL);
    }

    #[test]
    fn test_vote_eligibility() {
        let (a, b, c) = (costume("a"), costume("b"), costume("c"));

        assert_eq!(check_vote(&ContestSettings::default(), "x", &a), Err(ContestError::VotingClosed));
        assert_eq!(check_vote(&open_voting(), "x", &a), Ok(VoteKind::Initial));
        assert_eq!(check_vote(&open_voting(), "a", &a), Err(ContestError::SelfVoteNotAllowed));

        let mut self_ok = open_voting();
        self_ok.allow_self_vote = true;
        assert_eq!(check_vote(&self_ok, "a", &a), Ok(VoteKind::Initial));

        let revote = revote_settings(&[&a, &b]);
        assert_eq!(check_vote(&revote, "a", &a), Err(ContestError::ExcludedFromRevote));
        assert_eq!(check_vote(&revote, "a", &b), Err(ContestError::ExcludedFromRevote));
        assert_eq!(check_vote(&revote, "x", &c), Err(ContestError::NotInRevote));
        assert_eq!(check_vote(&revote, "x", &a), Ok(VoteKind::Revote));
    }

    #[test]
    fn test_submission_and_ownership_rules() {
        let a = costume("a");
        assert!(check_submission(&ContestSettings::default(), None).is_ok());
        assert_eq!(
            check_submission(&ContestSettings::default(), Some(&a)),
            Err(ContestError::CostumeAlreadySubmitted)
        );
        assert_eq!(
            check_submission(&revote_settings(&[&a]), None),
            Err(ContestError::SubmissionsClosed)
        );
        assert!(check_owner(&a, "a").is_ok());
        assert_eq!(check_owner(&a, "b"), Err(ContestError::NotOwner));
    }

    #[test]
    fn test_costume_validation() {
        assert!(validate_costume("Vampire", "").is_ok());
        assert_eq!(validate_costume("   ", ""), Err(ContestError::InvalidName));
        assert_eq!(validate_costume(&"x".repeat(MAX_NAME_LENGTH + 1), ""), Err(ContestError::InvalidName));
        assert_eq!(
            validate_costume("Ghost", &"x".repeat(MAX_DESCRIPTION_LENGTH + 1)),
            Err(ContestError::DescriptionTooLong)
        );
    }

    #[test]
    fn test_image_validation() {
        assert_eq!(validate_image("image/png", 10), Ok("png"));
        assert_eq!(validate_image("IMAGE/JPEG; charset=binary", 10), Ok("jpg"));
        assert_eq!(validate_image("text/plain", 10), Err(UploadError::InvalidType("text/plain".into())));
        assert_eq!(validate_image("image/gif", 0), Err(UploadError::Empty));
        assert_eq!(validate_image("image/webp", MAX_IMAGE_BYTES + 1), Err(UploadError::TooLarge));
    }

    #[test]
    fn test_image_keys() {
        assert_eq!(sanitize_key_segment("Jack O'Lantern!!"), "jack_o_lantern");
        assert_eq!(sanitize_key_segment("***"), "anonymous");
        assert_eq!(image_key("uid-42", "Mina Harker", "png"), "costume-images/uid-42_mina_harker.png");
        assert_eq!(escape_key_segment("a_b/c"), "a~5Fb~2Fc");
        assert_eq!(escape_key_segment(""), "");

        assert_ne!(image_key("AbC1", "Mina", "png"), image_key("abc1", "Mina", "png"));
        assert_ne!(image_key("a_b", "c", "png"), image_key("a", "b_c", "png"));
        let long_id = "x".repeat(MAX_KEY_SEGMENT_LENGTH * 2);
        assert_ne!(image_key(&long_id, "m", "png"), image_key(&format!("{long_id}y"), "m", "png"));

        assert_eq!(storage_key("costume-images/a.png"), Some("costume-images/a.png"));
        assert_eq!(storage_key("/costume-images/a.png"), Some("costume-images/a.png"));
        assert_eq!(storage_key("https://cdn.example.com/a.png"), None);
        assert_eq!(storage_key("elsewhere/a.png"), None);

        assert_eq!(resolve_image_url("costume-images/a.png", "/images/"), "/images/costume-images/a.png");
        assert_eq!(resolve_image_url("https://cdn.example.com/a.png", "/images"), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_view_recomputes_on_every_feed() {
        let (a, b) = (costume("a"), costume("b"));
        let mut view = ContestView::new();
        assert!(view.results().is_empty());
        assert!(!view.settings().voting_enabled);

        view.reduce(Msg::CostumesReceived(vec![a.clone(), b.clone()]));
        assert_eq!(view.results().len(), 2);

        view.reduce(Msg::VotesReceived(VoteKind::Initial, votes_for(&b, 2)));
        assert_eq!(view.results()[0].costume.id, b.id);

        view.reduce(Msg::VotesReceived(VoteKind::Revote, votes_for(&a, 3)));
        assert_eq!(view.results()[0].costume.id, a.id);
        assert_eq!(view.votes(VoteKind::Revote).len(), 3);

        view.reduce(Msg::SettingsReceived(None));
        assert!(view.settings().contest_active);
    }

    #[test]
    fn test_view_keeps_last_known_good_on_failure() {
        let a = costume("a");
        let mut view = ContestView::new();
        view.reduce(Msg::CostumesReceived(vec![a.clone()]));
        view.reduce(Msg::VotesReceived(VoteKind::Initial, votes_for(&a, 1)));

        view.reduce(Msg::FeedFailed(Feed::Votes, "permission denied".into()));
        assert!(view.is_degraded());
        assert_eq!(view.failed_feeds(), vec![Feed::Votes]);
        view.reduce(Msg::FeedFailed(Feed::Costumes, "timeout".into()));
        assert_eq!(view.failed_feeds(), vec![Feed::Costumes, Feed::Votes]);
        assert_eq!(view.costumes().len(), 1);
        view.reduce(Msg::CostumesReceived(vec![a.clone()]));
        assert_eq!(view.results()[0].vote_count, 1);

        view.reduce(Msg::VotesReceived(VoteKind::Initial, Vec::new()));
        assert!(!view.is_degraded());
        assert_eq!(view.results()[0].vote_count, 0);
        assert_eq!(view.costumes().len(), 1);
    }
}
