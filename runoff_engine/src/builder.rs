use chrono::{DateTime, Utc};

pub use crate::config::*;

/// A builder for election snapshots.
///
/// Callers that already hold their candidates and votes (for example from a
/// database) can pass them to [`crate::tabulate`] directly. The builder is
/// convenient when the votes are available as whole ranked ballots.
///
/// ```
/// use runoff_engine::builder::Builder;
/// use runoff_engine::{tabulate, CandidateId, VoterId, EliminationReason};
/// # use runoff_engine::TabulationError;
///
/// let anna = CandidateId::from_u128(1);
/// let bob = CandidateId::from_u128(2);
/// let mut builder = Builder::new().candidates(&[anna, bob]);
///
/// builder.add_ballot(VoterId::from_u128(10), &[anna, bob])?;
/// builder.add_ballot(VoterId::from_u128(11), &[anna])?;
/// builder.add_ballot(VoterId::from_u128(12), &[bob, anna])?;
///
/// let result = tabulate(&builder.build())?;
/// assert_eq!(result.winner_id(), anna);
/// assert_eq!(result.rounds()[0].elimination_reason(), EliminationReason::WinnerMajority);
///
/// # Ok::<(), TabulationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    _candidates: Vec<Candidate>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _candidates: Vec::new(),
        }
    }

    /// Registers a candidate with an explicit registration time.
    pub fn candidate(mut self, id: CandidateId, created_at: DateTime<Utc>) -> Builder {
        self._candidates.push(Candidate {
            id,
            created_at,
            votes: Vec::new(),
        });
        self
    }

    /// Registers candidates in order, one second apart starting at the epoch.
    pub fn candidates(self, ids: &[CandidateId]) -> Builder {
        ids.iter().enumerate().fold(self, |b, (idx, id)| {
            let created_at =
                DateTime::<Utc>::from_timestamp(idx as i64, 0).unwrap_or_default();
            b.candidate(*id, created_at)
        })
    }

    /// Adds a full ballot. The first candidate gets rank 1, and so on.
    ///
    /// Choices do not need to be unique: duplicates are passed to the
    /// tabulation as-is.
    pub fn add_ballot(
        &mut self,
        voter: VoterId,
        preferences: &[CandidateId],
    ) -> Result<(), TabulationError> {
        for (idx, cid) in preferences.iter().enumerate() {
            self.add_vote(voter, *cid, idx as u32 + 1)?;
        }
        Ok(())
    }

    /// Adds a single mark of a voter.
    pub fn add_vote(
        &mut self,
        voter: VoterId,
        candidate: CandidateId,
        rank: u32,
    ) -> Result<(), TabulationError> {
        let c = self
            ._candidates
            .iter_mut()
            .find(|c| c.id == candidate)
            .ok_or(TabulationError::UnknownCandidate { candidate })?;
        c.votes.push(Vote {
            voter_id: voter,
            candidate_id: candidate,
            rank,
        });
        Ok(())
    }

    pub fn build(self) -> Vec<Candidate> {
        self._candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ballots_become_ranked_votes() {
        let a = CandidateId::from_u128(1);
        let b = CandidateId::from_u128(2);
        let voter = VoterId::from_u128(9);
        let mut builder = Builder::new().candidates(&[a, b]);
        builder.add_ballot(voter, &[b, a]).unwrap();
        let candidates = builder.build();
        assert_eq!(
            candidates[1].votes,
            vec![Vote {
                voter_id: voter,
                candidate_id: b,
                rank: 1
            }]
        );
        assert_eq!(candidates[0].votes[0].rank, 2);
        assert!(candidates[0].created_at < candidates[1].created_at);
    }

    #[test]
    fn unknown_candidate() {
        let mut builder = Builder::new().candidates(&[CandidateId::from_u128(1)]);
        assert_eq!(
            builder.add_vote(VoterId::from_u128(9), CandidateId::from_u128(5), 1),
            Err(TabulationError::UnknownCandidate {
                candidate: CandidateId::from_u128(5)
            })
        );
    }
}
