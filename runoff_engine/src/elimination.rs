use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::ballot::BallotBox;
use crate::config::*;
use crate::tally::RoundTally;

/// The decision taken at the end of a round that produced no winner.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Elimination {
    /// Sorted by candidate id. Empty for an all-way tie.
    pub eliminated: Vec<CandidateId>,
    pub reason: EliminationReason,
}

/// Checks whether this round decides the election.
///
/// A single candidate left in the tally wins by attrition. Otherwise a
/// candidate wins if it holds strictly more than half of the votes counted in
/// the round.
pub fn find_winner(tally: &RoundTally) -> Option<(CandidateId, EliminationReason)> {
    let votes = tally.votes();
    if votes.len() == 1 {
        return votes
            .keys()
            .next()
            .map(|cid| (*cid, EliminationReason::WinnerAttrition));
    }
    let total = tally.total();
    let winner = votes
        .iter()
        .find(|(_, count)| 2 * **count > total)
        .map(|(cid, _)| (*cid, EliminationReason::WinnerMajority));
    debug!(
        "find_winner: round {} total {}: {:?}",
        tally.round_number(),
        total,
        winner
    );
    winner
}

/// Finds the candidates to eliminate after a round without winner.
///
/// Registered candidates that are still running but got no vote this round
/// are eliminated first, all at once. Otherwise the candidates with the lowest
/// count go, and ties are resolved according to `tiebreak`.
pub fn find_eliminated_candidates(
    ballot_box: &BallotBox,
    tally: &RoundTally,
    previous: Option<&RoundTally>,
    tiebreak: TieBreakMode,
) -> Result<Elimination, TabulationError> {
    let no_votes: Vec<CandidateId> = ballot_box
        .candidates()
        .keys()
        .filter(|cid| !tally.eliminated().contains(*cid) && !tally.votes().contains_key(*cid))
        .cloned()
        .collect();
    if !no_votes.is_empty() {
        debug!(
            "find_eliminated_candidates: candidates without votes: {:?}",
            no_votes
        );
        return Ok(Elimination {
            reason: label(&no_votes),
            eliminated: no_votes,
        });
    }

    let min_count: u64 = match tally.votes().values().min() {
        Some(c) => *c,
        // Nobody left to count for and nobody left to eliminate.
        None => return FullWayTieSnafu {}.fail(),
    };
    let all_smallest: Vec<CandidateId> = tally
        .votes()
        .iter()
        .filter_map(|(cid, vc)| if *vc == min_count { Some(*cid) } else { None })
        .collect();
    debug!(
        "find_eliminated_candidates: all_smallest at {}: {:?}",
        min_count, all_smallest
    );

    // No tiebreak, the logic below is not relevant.
    if all_smallest.len() == 1 {
        return Ok(Elimination {
            eliminated: all_smallest,
            reason: EliminationReason::NoTieElimination,
        });
    }

    let loser: Option<CandidateId> = match tiebreak {
        TieBreakMode::PreferenceOffset => {
            if all_smallest.len() == tally.votes().len() {
                debug!("find_eliminated_candidates: all-way tie, nobody is eliminated");
                return Ok(Elimination {
                    eliminated: Vec::new(),
                    reason: EliminationReason::AllWayTie,
                });
            }
            return Ok(Elimination {
                eliminated: all_smallest,
                reason: EliminationReason::TieElimination,
            });
        }
        TieBreakMode::LookBehind => match previous {
            Some(prev) => fewest(&all_smallest, |cid| prev.get(cid)),
            None => look_ahead(ballot_box, tally.eliminated(), &all_smallest),
        },
        TieBreakMode::LookAhead => look_ahead(ballot_box, tally.eliminated(), &all_smallest),
        TieBreakMode::RegistrationTime => fewest(&all_smallest, |cid| {
            ballot_box.candidates().get(cid).map(|c| c.created_at)
        }),
        TieBreakMode::DeterministicRandom(seed) => {
            candidate_permutation_crypto(&all_smallest, seed, tally.round_number())
                .first()
                .cloned()
        }
    };
    // all_smallest holds at least two candidates here.
    let loser = loser.unwrap_or(all_smallest[0]);
    debug!(
        "find_eliminated_candidates: tiebreak {:?} picked {}",
        tiebreak, loser
    );
    Ok(Elimination {
        eliminated: vec![loser],
        reason: EliminationReason::TieElimination,
    })
}

fn label(eliminated: &[CandidateId]) -> EliminationReason {
    if eliminated.len() == 1 {
        EliminationReason::NoTieElimination
    } else {
        EliminationReason::TieElimination
    }
}

// First candidate (by id) with the smallest key.
fn fewest<K: Ord>(tied: &[CandidateId], key: impl Fn(&CandidateId) -> K) -> Option<CandidateId> {
    tied.iter().min_by_key(|cid| key(*cid)).cloned()
}

// Credits a tied candidate each time it is the next active choice after the
// current first choice of a ballot.
fn look_ahead(
    ballot_box: &BallotBox,
    eliminated: &BTreeSet<CandidateId>,
    tied: &[CandidateId],
) -> Option<CandidateId> {
    let mut credits: BTreeMap<CandidateId, u64> = BTreeMap::new();
    for preferences in ballot_box.ballots().values() {
        let mut active = preferences.iter().filter(|cid| !eliminated.contains(*cid));
        active.next();
        if let Some(next) = active.next() {
            if tied.contains(next) {
                *credits.entry(*next).or_insert(0) += 1;
            }
        }
    }
    debug!("look_ahead: next preference credits: {:?}", credits);
    fewest(tied, |cid| credits.get(cid).cloned().unwrap_or(0))
}

/// Generates a "random" permutation of the candidates. Random in this context means hard to guess in advance.
/// Each candidate is ordered by the SHA-256 digest of the seed, the round and its id.
fn candidate_permutation_crypto(
    candidates: &[CandidateId],
    seed: u32,
    num_round: u32,
) -> Vec<CandidateId> {
    let mut data: Vec<(CandidateId, String)> = candidates
        .iter()
        .map(|cid| {
            (
                *cid,
                sha256::digest(format!("{:08}{:08}{}", seed, num_round, cid)),
            )
        })
        .collect();
    data.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    data.iter().map(|p| p.0).collect()
}
