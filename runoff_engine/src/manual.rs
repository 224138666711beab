/*!

This is the long-form manual for `runoff_engine` and the `runoff` program.

## Counting rules

Each voter ranks some of the candidates: rank 1 is the most preferred choice,
rank 2 the next one, and so on. A vote is stored as a (voter, candidate, rank)
triple and is attached to the candidate it was cast for. The engine receives
the candidates of one election with all their votes and regroups the votes of
each voter into a ballot ordered by rank.

The election then proceeds in rounds:

1. Every ballot is credited to its highest ranked candidate that is still
   running. A ballot whose candidates were all eliminated is *exhausted* and
   counts for nobody.
2. If a single candidate received votes, it wins *by attrition*
   (`WINNER_ATTRITION`).
3. If a candidate holds strictly more than half of the votes counted in the
   round, it wins *by majority* (`WINNER_MAJORITY`). Exactly half is not enough.
4. Otherwise candidates are eliminated and a new round starts.

Elimination follows these rules, in order:

- Registered candidates still running that did not get any vote in the round
  are all eliminated. The round is labelled `NO_TIE_ELIMINATION` if there is
  one of them, `TIE_ELIMINATION` otherwise.
- If a single candidate has the lowest count, it is eliminated
  (`NO_TIE_ELIMINATION`).
- Otherwise the tie is resolved according to the tie-break mode, see below.

Eliminated candidates are listed in the order of their identifiers, so that
running the same election twice gives exactly the same output.

## Tie-break modes

### `preferenceOffset` (default)

All the candidates sharing the lowest count are eliminated together
(`TIE_ELIMINATION`). If that would eliminate every remaining candidate, nobody
is eliminated instead (`TIE_ALL_WAY_TIE`) and the next round credits each
ballot with its *second* active choice. Each further all-way tie looks one
choice deeper; any other round goes back to first choices.

If the next round would need a choice that some ballot does not have, the
election cannot be decided and fails with a full way tie. For example, four
voters whose ballots form a perfect rotation of four candidates can never be
separated.

The offset is reported in each round as `preferenceOffset`.

### `lookBehind`

Eliminates the tied candidate that had the fewest votes in the previous
round. A candidate absent from the previous round counts as zero votes. In the
first round it behaves as `lookAhead`.

### `lookAhead`

For every ballot, looks at the active choice that comes right after the one
being counted. Eliminates the tied candidate that appears the least often
there.

### `registrationTime`

Eliminates the tied candidate with the earliest `createdAt` time.

### `deterministicRandom`

Orders the tied candidates by the SHA-256 digest of the seed, the round number
and the candidate identifier, and eliminates the first one. Nobody can predict the choice
without computing it, but everybody can check it afterwards.

The modes other than `preferenceOffset` eliminate exactly one candidate per
tie and never produce an all-way tie. Any tie that remains after applying them
is resolved by the smallest identifier.

## Rank validation

Ballots are not always well formed: ranks may skip numbers (1, 3, 4), be
repeated, or the same candidate may be ranked twice.

- `permissive` (default) sorts the votes of the ballot by rank and counts them
  as they are, logging a warning. A candidate ranked twice may be credited by
  a deeper choice.
- `strict` rejects the whole election with the voter and ranks of the first
  malformed ballot.

## Input format

The `runoff` program reads a JSON snapshot of the election:

```text
{
  "outputSettings": {
    "contestName": "Board election",
    "contestDate": "2024-03-01",
    "outputDirectory": "output"
  },
  "rules": {
    "tiebreakMode": "preferenceOffset",
    "randomSeed": 0,
    "rankValidation": "permissive"
  },
  "candidates": [
    {
      "id": "00000000-0000-0000-0000-000000000001",
      "createdAt": "2024-02-01T10:00:00Z",
      "votes": [
        {
          "voterId": "00000000-0000-0000-0000-000000000011",
          "candidateId": "00000000-0000-0000-0000-000000000001",
          "rank": 1
        }
      ]
    }
  ]
}
```

The `rules` section and all its fields are optional. `randomSeed` is only used
by `deterministicRandom`. If the `candidateId` of a vote differs from the
candidate it is attached to, the vote counts for the candidate it is attached
to.

## Output format

The summary contains the configuration of the contest and the result:

```text
{
  "config": { "contest": "Board election", "date": "2024-03-01", "winner": "..." },
  "results": {
    "winnerId": "...",
    "totalVotes": 4,
    "rounds": [
      {
        "roundNumber": 1,
        "votes": { "<candidate id>": 2, ... },
        "eliminatedCandidateIds": ["..."],
        "eliminationReason": "NO_TIE_ELIMINATION",
        "exhaustedBallots": 0,
        "preferenceOffset": 0
      }
    ]
  }
}
```

`votes` only lists the candidates that received votes in the round.
`eliminatedCandidateIds` is `null` in the winning round and empty for an
all-way tie. `totalVotes` is the number of votes counted in the winning round.

 */
