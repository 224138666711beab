// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use uuid::Uuid;

/// The opaque identifier of a candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub Uuid);

impl CandidateId {
    pub const fn from_u128(v: u128) -> CandidateId {
        CandidateId(Uuid::from_u128(v))
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stable identifier of a voter. The engine never needs more than this.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(pub Uuid);

impl VoterId {
    pub const fn from_u128(v: u128) -> VoterId {
        VoterId(Uuid::from_u128(v))
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ranked mark: `voter_id` placed `candidate_id` at position `rank`.
///
/// Ranks start at 1 (most preferred). The caller is expected to provide one
/// vote per rank and per voter. The engine does not deduplicate, see
/// [`RankValidation`].
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub rank: u32,
}

/// A registered candidate together with all the votes cast for it.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    /// Only used by the registration time tiebreak.
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

// ******** Output data structures *********

/// Why a round ended the way it did.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EliminationReason {
    WinnerMajority,
    WinnerAttrition,
    /// Every remaining candidate was tied: nobody is eliminated and the next
    /// round looks one preference deeper.
    #[serde(rename = "TIE_ALL_WAY_TIE")]
    AllWayTie,
    TieElimination,
    NoTieElimination,
}

impl EliminationReason {
    pub fn description(&self) -> &'static str {
        match self {
            EliminationReason::WinnerMajority => {
                "Winner elected by holding more than half of the votes cast in the round."
            }
            EliminationReason::WinnerAttrition => {
                "Winner never held more than half of the votes but is the only candidate remaining."
            }
            EliminationReason::AllWayTie => {
                "All remaining candidates are tied. No elimination, deeper preferences are counted next."
            }
            EliminationReason::TieElimination => "Eliminated after tie resolution.",
            EliminationReason::NoTieElimination => "Eliminated with the lowest vote count.",
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(
            self,
            EliminationReason::WinnerMajority | EliminationReason::WinnerAttrition
        )
    }
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    round_number: u32,
    votes: BTreeMap<CandidateId, u64>,
    // None for the winning round, empty for an all-way tie.
    eliminated_candidate_ids: Option<Vec<CandidateId>>,
    elimination_reason: EliminationReason,
    exhausted_ballots: u64,
    preference_offset: u32,
}

impl RoundResult {
    pub(crate) fn new(
        round_number: u32,
        votes: BTreeMap<CandidateId, u64>,
        eliminated_candidate_ids: Option<Vec<CandidateId>>,
        elimination_reason: EliminationReason,
        exhausted_ballots: u64,
        preference_offset: u32,
    ) -> RoundResult {
        RoundResult {
            round_number,
            votes,
            eliminated_candidate_ids,
            elimination_reason,
            exhausted_ballots,
            preference_offset,
        }
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// The vote count of every candidate that received at least one vote.
    pub fn votes(&self) -> &BTreeMap<CandidateId, u64> {
        &self.votes
    }

    pub fn eliminated_candidate_ids(&self) -> Option<&[CandidateId]> {
        self.eliminated_candidate_ids.as_deref()
    }

    pub fn elimination_reason(&self) -> EliminationReason {
        self.elimination_reason
    }

    /// Ballots that had no active candidate left in this round.
    pub fn exhausted_ballots(&self) -> u64 {
        self.exhausted_ballots
    }

    /// How many active preferences were skipped on every ballot.
    pub fn preference_offset(&self) -> u32 {
        self.preference_offset
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.values().sum()
    }
}

/// The outcome of a successful tabulation.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResult {
    winner_id: CandidateId,
    rounds: Vec<RoundResult>,
    total_votes: u64,
}

impl ElectionResult {
    pub(crate) fn new(
        winner_id: CandidateId,
        rounds: Vec<RoundResult>,
        total_votes: u64,
    ) -> ElectionResult {
        ElectionResult {
            winner_id,
            rounds,
            total_votes,
        }
    }

    pub fn winner_id(&self) -> CandidateId {
        self.winner_id
    }

    /// All the rounds, the first round first.
    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    /// The number of votes counted in the final round.
    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    /// The last round, which is the one that decided the winner.
    pub fn winning_round(&self) -> Option<&RoundResult> {
        self.rounds
            .last()
            .filter(|r| r.elimination_reason().is_win())
    }
}

/// Errors that prevent the algorithm from completing successfully.
///
/// None of them is transient: running again on the same input fails the same way.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabulationError {
    #[snafu(display("Election cannot proceed without any candidates."))]
    NoCandidates {},
    #[snafu(display("Election cannot proceed without any votes."))]
    NoVotes {},
    #[snafu(display("Election cannot proceed with a full way tie."))]
    FullWayTie {},
    #[snafu(display(
        "Preference offset {offset} exceeds the {active} active choice(s) of voter {voter}"
    ))]
    ExhaustedByOffset {
        voter: VoterId,
        offset: u32,
        active: usize,
    },
    #[snafu(display("Ballot of voter {voter} is malformed (ranks {ranks:?})"))]
    MalformedBallot { voter: VoterId, ranks: Vec<u32> },
    #[snafu(display("Candidate {candidate} is not registered"))]
    UnknownCandidate { candidate: CandidateId },
}

// ********* Configuration **********

/// How ties at the bottom of a round are resolved.
///
/// Only used when two or more candidates that received votes share the
/// lowest count. Candidates without any vote are always eliminated together.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Eliminate all the tied candidates. If this would eliminate everybody,
    /// eliminate nobody and count the next preference of every ballot in the
    /// following round.
    PreferenceOffset,
    /// Eliminate the tied candidate that had the fewest votes in the previous
    /// round. Falls back to `LookAhead` in the first round.
    LookBehind,
    /// Eliminate the tied candidate that appears the least often as the
    /// next choice on the ballots.
    LookAhead,
    /// Eliminate the tied candidate registered first.
    RegistrationTime,
    /// Eliminate a tied candidate picked from a hash of the seed, the round and
    /// the tied candidates. It is hard to guess in advance but reproducible.
    DeterministicRandom(u32),
}

/// What to do with ballots whose ranks are not exactly 1, 2, ..., n or that
/// rank a candidate more than once.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RankValidation {
    /// Sort by rank and count them anyway.
    Permissive,
    /// Reject the election.
    Strict,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationRules {
    pub tiebreak_mode: TieBreakMode,
    pub rank_validation: RankValidation,
}

impl TabulationRules {
    pub const DEFAULT_RULES: TabulationRules = TabulationRules {
        tiebreak_mode: TieBreakMode::PreferenceOffset,
        rank_validation: RankValidation::Permissive,
    };
}

impl Default for TabulationRules {
    fn default() -> Self {
        TabulationRules::DEFAULT_RULES
    }
}
