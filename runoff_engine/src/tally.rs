use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::ballot::BallotBox;
use crate::config::*;

/// The vote counts of a single round.
///
/// Computed from scratch out of the ballot box and a snapshot of the
/// eliminated candidates, never updated in place.
/// Invariant: the counts add up to the number of ballots with at least one
/// active candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundTally {
    round_number: u32,
    // Only candidates with at least one vote.
    votes: BTreeMap<CandidateId, u64>,
    eliminated: BTreeSet<CandidateId>,
    exhausted: u64,
    preference_offset: u32,
}

impl RoundTally {
    /// Gives one vote per ballot to its highest ranked active candidate, after
    /// skipping `preference_offset` active candidates.
    ///
    /// Ballots without any active candidate are exhausted and count for nobody.
    /// Fails if the offset reaches past the active candidates of a ballot that
    /// still has some.
    pub fn count(
        ballot_box: &BallotBox,
        eliminated: &BTreeSet<CandidateId>,
        round_number: u32,
        preference_offset: u32,
    ) -> Result<RoundTally, TabulationError> {
        let mut votes: BTreeMap<CandidateId, u64> = BTreeMap::new();
        let mut exhausted: u64 = 0;
        for (voter, preferences) in ballot_box.ballots().iter() {
            let active: Vec<&CandidateId> = preferences
                .iter()
                .filter(|cid| !eliminated.contains(*cid))
                .collect();
            if active.is_empty() {
                exhausted += 1;
                continue;
            }
            match active.get(preference_offset as usize) {
                Some(cid) => {
                    *votes.entry(**cid).or_insert(0) += 1;
                }
                None => {
                    return ExhaustedByOffsetSnafu {
                        voter: *voter,
                        offset: preference_offset,
                        active: active.len(),
                    }
                    .fail();
                }
            }
        }
        debug!(
            "RoundTally::count: round {} offset {}: {:?}, exhausted: {}",
            round_number, preference_offset, votes, exhausted
        );
        Ok(RoundTally {
            round_number,
            votes,
            eliminated: eliminated.clone(),
            exhausted,
            preference_offset,
        })
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn votes(&self) -> &BTreeMap<CandidateId, u64> {
        &self.votes
    }

    pub fn get(&self, cid: &CandidateId) -> u64 {
        self.votes.get(cid).cloned().unwrap_or(0)
    }

    /// The eliminated candidates this tally was computed with.
    pub fn eliminated(&self) -> &BTreeSet<CandidateId> {
        &self.eliminated
    }

    pub fn exhausted_ballots(&self) -> u64 {
        self.exhausted
    }

    pub fn preference_offset(&self) -> u32 {
        self.preference_offset
    }

    pub fn total(&self) -> u64 {
        self.votes.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::compile_ballots;
    use crate::builder::Builder;

    const BLUE: CandidateId = CandidateId::from_u128(1);
    const RED: CandidateId = CandidateId::from_u128(2);
    const GREEN: CandidateId = CandidateId::from_u128(3);
    const YELLOW: CandidateId = CandidateId::from_u128(4);

    fn slate(ballots: &[[CandidateId; 4]]) -> Vec<Candidate> {
        let mut b = Builder::new().candidates(&[BLUE, RED, GREEN, YELLOW]);
        for (idx, prefs) in ballots.iter().enumerate() {
            b.add_ballot(VoterId::from_u128(0x10 + idx as u128), prefs)
                .unwrap();
        }
        b.build()
    }

    #[test]
    fn first_round_counts_first_choices() {
        let candidates = slate(&[
            [BLUE, RED, GREEN, YELLOW],
            [GREEN, YELLOW, BLUE, RED],
            [BLUE, GREEN, YELLOW, RED],
            [RED, GREEN, BLUE, YELLOW],
        ]);
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        let t = RoundTally::count(&bb, &BTreeSet::new(), 1, 0).unwrap();
        assert_eq!(t.round_number(), 1);
        assert_eq!(t.total(), 4);
        assert_eq!(t.get(&BLUE), 2);
        assert_eq!(t.get(&RED), 1);
        assert_eq!(t.get(&GREEN), 1);
        assert_eq!(t.get(&YELLOW), 0);
        assert!(!t.votes().contains_key(&YELLOW));
    }

    #[test]
    fn eliminated_candidates_are_skipped() {
        let candidates = slate(&[
            [BLUE, RED, GREEN, YELLOW],
            [GREEN, YELLOW, BLUE, RED],
            [RED, GREEN, BLUE, YELLOW],
        ]);
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        let eliminated: BTreeSet<CandidateId> = [GREEN, RED].into_iter().collect();
        let t = RoundTally::count(&bb, &eliminated, 2, 0).unwrap();
        // [GREEN, YELLOW, ..] moves on to YELLOW.
        assert_eq!(t.get(&BLUE), 2);
        assert_eq!(t.get(&YELLOW), 1);
        assert_eq!(t.votes().len(), 2);
        assert_eq!(t.eliminated(), &eliminated);
    }

    #[test]
    fn exhausted_ballots_count_for_nobody() {
        let mut b = Builder::new().candidates(&[BLUE, RED, GREEN]);
        b.add_ballot(VoterId::from_u128(1), &[BLUE]).unwrap();
        b.add_ballot(VoterId::from_u128(2), &[RED, BLUE]).unwrap();
        b.add_ballot(VoterId::from_u128(3), &[GREEN]).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        let eliminated: BTreeSet<CandidateId> = [GREEN, RED].into_iter().collect();
        let t = RoundTally::count(&bb, &eliminated, 3, 0).unwrap();
        assert_eq!(t.total(), 2);
        assert_eq!(t.exhausted_ballots(), 1);
        assert_eq!(t.total() + t.exhausted_ballots(), bb.total_ballots() as u64);
    }

    #[test]
    fn offset_counts_deeper_preferences() {
        let candidates = slate(&[
            [BLUE, RED, YELLOW, GREEN],
            [GREEN, RED, BLUE, YELLOW],
            [RED, GREEN, YELLOW, BLUE],
            [YELLOW, BLUE, GREEN, RED],
        ]);
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        let t = RoundTally::count(&bb, &BTreeSet::new(), 2, 1).unwrap();
        assert_eq!(t.preference_offset(), 1);
        assert_eq!(t.get(&RED), 2);
        assert_eq!(t.get(&GREEN), 1);
        assert_eq!(t.get(&BLUE), 1);
        assert_eq!(t.get(&YELLOW), 0);
    }

    #[test]
    fn offset_past_the_ballot_fails() {
        let mut b = Builder::new().candidates(&[BLUE, RED]);
        b.add_ballot(VoterId::from_u128(1), &[BLUE, RED]).unwrap();
        b.add_ballot(VoterId::from_u128(2), &[RED]).unwrap();
        let candidates = b.build();
        let bb = compile_ballots(&candidates, RankValidation::Permissive).unwrap();
        assert_eq!(
            RoundTally::count(&bb, &BTreeSet::new(), 2, 1),
            Err(TabulationError::ExhaustedByOffset {
                voter: VoterId::from_u128(2),
                offset: 1,
                active: 1
            })
        );
    }
}
