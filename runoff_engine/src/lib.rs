/*!
Instant-runoff tabulation of ranked ballots.

The engine receives the candidates of one election, each with the votes cast
for it, and computes a single winner together with the vote counts of every
round. It does no I/O: storing candidates, votes and results is up to the
caller. Runs share no state, so several elections can be tabulated at the same
time on different threads.

```
use runoff_engine::builder::Builder;
use runoff_engine::{run_election, CandidateId, TabulationRules, VoterId};
# use runoff_engine::TabulationError;

let (a, b, c) = (CandidateId::from_u128(1), CandidateId::from_u128(2), CandidateId::from_u128(3));
let mut builder = Builder::new().candidates(&[a, b, c]);
builder.add_ballot(VoterId::from_u128(1), &[a, b])?;
builder.add_ballot(VoterId::from_u128(2), &[a])?;
builder.add_ballot(VoterId::from_u128(3), &[b, a])?;
builder.add_ballot(VoterId::from_u128(4), &[c, b])?;

// b and c share the last place and are eliminated together. The last
// ballot is then exhausted and a is the only candidate left.
let result = run_election(&builder.build(), &TabulationRules::DEFAULT_RULES)?;
assert_eq!(result.winner_id(), a);
assert_eq!(result.rounds().len(), 2);
assert_eq!(result.rounds()[1].exhausted_ballots(), 1);
# Ok::<(), TabulationError>(())
```

See the [manual] for the details of the counting rules.
*/
mod ballot;
pub mod builder;
mod config;
mod elimination;
pub mod manual;
mod tally;

use log::{debug, info};

use std::collections::BTreeSet;

pub use crate::ballot::{compile_ballots, BallotBox};
pub use crate::config::*;
pub use crate::elimination::{find_eliminated_candidates, find_winner, Elimination};
pub use crate::tally::RoundTally;

/// Runs the instant-runoff algorithm with the default rules.
pub fn tabulate(candidates: &[Candidate]) -> Result<ElectionResult, TabulationError> {
    run_election(candidates, &TabulationRules::DEFAULT_RULES)
}

/// Runs the instant-runoff algorithm with the given rules.
///
/// Each round counts the ballots against the candidates eliminated so far,
/// stops if a candidate has won, and otherwise eliminates candidates before
/// counting again. Either a complete result or an error is returned.
///
/// Arguments:
/// * `candidates` the registered candidates for this election, with their votes
/// * `rules` the rules that govern this election
pub fn run_election(
    candidates: &[Candidate],
    rules: &TabulationRules,
) -> Result<ElectionResult, TabulationError> {
    info!(
        "run_election: processing {} candidates, rules: {:?}",
        candidates.len(),
        rules
    );
    let ballot_box = compile_ballots(candidates, rules.rank_validation)?;
    info!("Processing {} ballots", ballot_box.total_ballots());
    for (cid, c) in ballot_box.candidates().iter() {
        info!(
            "Candidate: {} (registered {}, {} votes)",
            cid,
            c.created_at,
            c.votes.len()
        );
    }

    let mut eliminated: BTreeSet<CandidateId> = BTreeSet::new();
    let mut rounds: Vec<RoundResult> = Vec::new();
    let mut previous: Option<RoundTally> = None;
    let mut preference_offset: u32 = 0;

    // Every round either finds a winner, eliminates at least one candidate, or
    // increases the offset until a ballot runs out of choices.
    loop {
        let round_number = rounds.len() as u32 + 1;
        let tally = RoundTally::count(&ballot_box, &eliminated, round_number, preference_offset)
            .map_err(|e| match e {
                TabulationError::ExhaustedByOffset { .. } => {
                    info!("Round {}: {}", round_number, e);
                    TabulationError::FullWayTie {}
                }
                other => other,
            })?;

        if let Some((winner, reason)) = find_winner(&tally) {
            info!(
                "Round {}: {} -> elected, {} of {} votes ({})",
                round_number,
                winner,
                tally.get(&winner),
                tally.total(),
                reason.description()
            );
            rounds.push(round_result(&tally, None, reason));
            return Ok(record_result(winner, rounds, tally.total()));
        }

        let elimination =
            find_eliminated_candidates(&ballot_box, &tally, previous.as_ref(), rules.tiebreak_mode)?;
        info!(
            "Round {}: {:?} -> eliminated: {:?} ({})",
            round_number,
            elimination.reason,
            elimination.eliminated,
            elimination.reason.description()
        );

        preference_offset = if elimination.reason == EliminationReason::AllWayTie {
            preference_offset + 1
        } else {
            0
        };
        debug!("run_election: next preference offset: {}", preference_offset);
        eliminated.extend(elimination.eliminated.iter().cloned());
        rounds.push(round_result(
            &tally,
            Some(elimination.eliminated),
            elimination.reason,
        ));
        previous = Some(tally);
    }
}

fn round_result(
    tally: &RoundTally,
    eliminated: Option<Vec<CandidateId>>,
    reason: EliminationReason,
) -> RoundResult {
    RoundResult::new(
        tally.round_number(),
        tally.votes().clone(),
        eliminated,
        reason,
        tally.exhausted_ballots(),
        tally.preference_offset(),
    )
}

fn record_result(winner: CandidateId, rounds: Vec<RoundResult>, total_votes: u64) -> ElectionResult {
    ElectionResult::new(winner, rounds, total_votes)
}
