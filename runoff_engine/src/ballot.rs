use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use snafu::ensure;

use crate::config::*;

/// All the ballots of one election, plus the registry of its candidates.
///
/// Built once at the start of a tabulation and never modified afterward.
/// Invariant: every candidate id found in a ballot is in the registry.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotBox<'a> {
    ballots: BTreeMap<VoterId, Vec<CandidateId>>,
    candidates: BTreeMap<CandidateId, &'a Candidate>,
}

impl<'a> BallotBox<'a> {
    /// The preferences of every voter, most preferred first.
    pub fn ballots(&self) -> &BTreeMap<VoterId, Vec<CandidateId>> {
        &self.ballots
    }

    pub fn candidates(&self) -> &BTreeMap<CandidateId, &'a Candidate> {
        &self.candidates
    }

    pub fn get_ballot(&self, voter: &VoterId) -> Option<&[CandidateId]> {
        self.ballots.get(voter).map(|b| b.as_slice())
    }

    pub fn total_ballots(&self) -> usize {
        self.ballots.len()
    }
}

/// Groups the votes of all the candidates by voter and orders each group by rank.
///
/// Every candidate is registered, including the ones without any vote.
pub fn compile_ballots(
    candidates: &[Candidate],
    validation: RankValidation,
) -> Result<BallotBox<'_>, TabulationError> {
    ensure!(!candidates.is_empty(), NoCandidatesSnafu {});

    let registry: BTreeMap<CandidateId, &Candidate> =
        candidates.iter().map(|c| (c.id, c)).collect();

    // (rank, candidate) for each voter, in input order.
    let mut marks_by_voter: BTreeMap<VoterId, Vec<(u32, CandidateId)>> = BTreeMap::new();
    for candidate in candidates.iter() {
        for vote in candidate.votes.iter() {
            if vote.candidate_id != candidate.id {
                warn!(
                    "compile_ballots: vote of {} lists candidate {} but is attached to {}, counting it for {}",
                    vote.voter_id, vote.candidate_id, candidate.id, candidate.id
                );
            }
            marks_by_voter
                .entry(vote.voter_id)
                .or_default()
                .push((vote.rank, candidate.id));
        }
    }
    ensure!(!marks_by_voter.is_empty(), NoVotesSnafu {});

    let mut ballots: BTreeMap<VoterId, Vec<CandidateId>> = BTreeMap::new();
    for (voter, mut marks) in marks_by_voter.into_iter() {
        // Stable: equal ranks keep the input order.
        marks.sort_by_key(|(rank, _)| *rank);
        if !is_well_formed(&marks) {
            let ranks: Vec<u32> = marks.iter().map(|(rank, _)| *rank).collect();
            match validation {
                RankValidation::Strict => {
                    return MalformedBallotSnafu { voter, ranks }.fail();
                }
                RankValidation::Permissive => {
                    warn!(
                        "compile_ballots: voter {}: malformed ranks {:?}, counting the ballot as sorted",
                        voter, ranks
                    );
                }
            }
        }
        let preferences: Vec<CandidateId> = marks.into_iter().map(|(_, cid)| cid).collect();
        debug!("compile_ballots: voter {}: {:?}", voter, preferences);
        ballots.insert(voter, preferences);
    }

    Ok(BallotBox {
        ballots,
        candidates: registry,
    })
}

// Sorted ranks must be exactly 1..=n and no candidate may appear twice.
fn is_well_formed(sorted_marks: &[(u32, CandidateId)]) -> bool {
    let contiguous = sorted_marks
        .iter()
        .enumerate()
        .all(|(idx, (rank, _))| *rank as usize == idx + 1);
    let mut seen: HashSet<CandidateId> = HashSet::new();
    contiguous && sorted_marks.iter().all(|(_, cid)| seen.insert(*cid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    const BLUE: CandidateId = CandidateId::from_u128(1);
    const RED: CandidateId = CandidateId::from_u128(2);
    const GREEN: CandidateId = CandidateId::from_u128(3);
    const YELLOW: CandidateId = CandidateId::from_u128(4);

    const JIM: VoterId = VoterId::from_u128(0x11);
    const JANE: VoterId = VoterId::from_u128(0x12);
    const JOHN: VoterId = VoterId::from_u128(0x13);
    const JADE: VoterId = VoterId::from_u128(0x14);

    fn slate() -> Vec<Candidate> {
        let mut b = Builder::new().candidates(&[BLUE, RED, YELLOW, GREEN]);
        b.add_ballot(JIM, &[BLUE, RED, GREEN, YELLOW]).unwrap();
        b.add_ballot(JANE, &[GREEN, YELLOW, BLUE, RED]).unwrap();
        b.add_ballot(JOHN, &[BLUE, GREEN, YELLOW, RED]).unwrap();
        b.add_ballot(JADE, &[RED, GREEN, BLUE, YELLOW]).unwrap();
        b.build()
    }

    #[test]
    fn preferences_follow_ranks() {
        let candidates = slate();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(bb.total_ballots(), 4);
        assert_eq!(bb.candidates().len(), 4);
        assert_eq!(
            bb.get_ballot(&JIM),
            Some(&[BLUE, RED, GREEN, YELLOW][..])
        );
        assert_eq!(
            bb.get_ballot(&JANE),
            Some(&[GREEN, YELLOW, BLUE, RED][..])
        );
        assert_eq!(
            bb.get_ballot(&JADE),
            Some(&[RED, GREEN, BLUE, YELLOW][..])
        );
    }

    #[test]
    fn votes_out_of_order_are_sorted() {
        let mut b = Builder::new().candidates(&[BLUE, RED, GREEN]);
        b.add_vote(JIM, GREEN, 3).unwrap();
        b.add_vote(JIM, BLUE, 1).unwrap();
        b.add_vote(JIM, RED, 2).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Strict).unwrap();
        assert_eq!(bb.get_ballot(&JIM), Some(&[BLUE, RED, GREEN][..]));
    }

    #[test]
    fn candidates_without_votes_are_registered() {
        let mut b = Builder::new().candidates(&[BLUE, RED, GREEN, YELLOW]);
        b.add_ballot(JIM, &[BLUE]).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(bb.candidates().len(), 4);
        assert!(bb.candidates().contains_key(&YELLOW));
        assert_eq!(bb.total_ballots(), 1);
    }

    #[test]
    fn no_candidates() {
        assert_eq!(
            compile_ballots(&[], RankValidation::Permissive),
            Err(TabulationError::NoCandidates {})
        );
    }

    #[test]
    fn no_votes() {
        let candidates = Builder::new().candidates(&[BLUE, RED]).build();
        assert_eq!(
            compile_ballots(&candidates, RankValidation::Permissive),
            Err(TabulationError::NoVotes {})
        );
    }

    #[test]
    fn skipped_ranks_pass_when_permissive() {
        let mut b = Builder::new().candidates(&[BLUE, RED]);
        b.add_vote(JIM, RED, 7).unwrap();
        b.add_vote(JIM, BLUE, 2).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(bb.get_ballot(&JIM), Some(&[BLUE, RED][..]));

        assert_eq!(
            compile_ballots(&candidates, RankValidation::Strict),
            Err(TabulationError::MalformedBallot {
                voter: JIM,
                ranks: vec![2, 7]
            })
        );
    }

    #[test]
    fn duplicate_candidate_rejected_when_strict() {
        let mut b = Builder::new().candidates(&[BLUE, RED, YELLOW]);
        b.add_ballot(JANE, &[RED, YELLOW, YELLOW, BLUE]).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(bb.get_ballot(&JANE), Some(&[RED, YELLOW, YELLOW, BLUE][..]));
        assert!(matches!(
            compile_ballots(&candidates, RankValidation::Strict),
            Err(TabulationError::MalformedBallot { voter, .. }) if voter == JANE
        ));
    }

    #[test]
    fn votes_count_for_their_owner() {
        use crate::tally::RoundTally;
        use chrono::{TimeZone, Utc};
        use std::collections::BTreeSet;

        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let vote = |voter: VoterId, candidate_id: CandidateId, rank: u32| Vote {
            voter_id: voter,
            candidate_id,
            rank,
        };
        // JANE's first choice is attached to BLUE but lists GREEN.
        let candidates = vec![
            Candidate {
                id: BLUE,
                created_at,
                votes: vec![vote(JIM, BLUE, 1), vote(JANE, GREEN, 1)],
            },
            Candidate {
                id: RED,
                created_at,
                votes: vec![vote(JIM, RED, 2), vote(JANE, RED, 2)],
            },
        ];
        let bb = compile_ballots(&candidates, RankValidation::Strict).unwrap();
        assert_eq!(bb.get_ballot(&JANE), Some(&[BLUE, RED][..]));
        assert!(!bb.candidates().contains_key(&GREEN));

        let t = RoundTally::count(&bb, &BTreeSet::new(), 1, 0).unwrap();
        assert_eq!(t.get(&BLUE), 2);
        assert!(!t.votes().contains_key(&GREEN));
    }

    #[test]
    fn compilation_is_idempotent() {
        let candidates = slate();
        let first = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        let second = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(first, second);
    }
}
