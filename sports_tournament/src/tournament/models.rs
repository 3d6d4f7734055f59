//! Tournament data models: phases, matchdays, matches and registrations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::errors::TournamentError;

/// Tournament ID type
pub type TournamentId = i64;
/// Team ID type
pub type TeamId = i64;
/// Phase ID type
pub type PhaseId = i64;
/// Matchday ID type
pub type MatchdayId = i64;
/// Match ID type
pub type MatchId = i64;
/// Registration ID type
pub type RegistrationId = i64;

/// Kind of a tournament phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    League,
    Knockout,
    Group,
    Final,
    Qualifying,
}

/// How matches of a phase are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFormat {
    /// Every team meets every other team (once or home and away)
    RoundRobin,
    /// Single elimination, winners advance round by round
    Bracket,
}

impl PhaseKind {
    /// Scheduling format used by this phase kind, if any.
    pub fn schedule_format(self) -> Option<ScheduleFormat> {
        match self {
            PhaseKind::League | PhaseKind::Group => Some(ScheduleFormat::RoundRobin),
            PhaseKind::Knockout | PhaseKind::Final => Some(ScheduleFormat::Bracket),
            PhaseKind::Qualifying => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::League => "league",
            PhaseKind::Knockout => "knockout",
            PhaseKind::Group => "group",
            PhaseKind::Final => "final",
            PhaseKind::Qualifying => "qualifying",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseKind {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "league" => Ok(PhaseKind::League),
            "knockout" => Ok(PhaseKind::Knockout),
            "group" => Ok(PhaseKind::Group),
            "final" => Ok(PhaseKind::Final),
            "qualifying" => Ok(PhaseKind::Qualifying),
            other => Err(TournamentError::Storage(format!(
                "unknown phase kind: {other}"
            ))),
        }
    }
}

/// A stage of a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub kind: PhaseKind,
    /// Matchdays in round order
    pub matchday_ids: Vec<MatchdayId>,
    /// Bracket winner once the final has been decided
    pub champion: Option<TeamId>,
}

/// One scheduled round of matches within a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchday {
    pub id: MatchdayId,
    pub phase_id: PhaseId,
    /// 1-based round number, unique within the phase
    pub order: u32,
    pub date: Option<NaiveDate>,
    /// Matches in bracket/pairing order
    pub match_ids: Vec<MatchId>,
}

/// Side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    TeamA,
    TeamB,
}

/// Outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    TeamA,
    TeamB,
    Draw,
}

impl MatchResult {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchResult::TeamA => "team_a",
            MatchResult::TeamB => "team_b",
            MatchResult::Draw => "draw",
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchResult {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "team_a" => Ok(MatchResult::TeamA),
            "team_b" => Ok(MatchResult::TeamB),
            "draw" => Ok(MatchResult::Draw),
            other => Err(TournamentError::Storage(format!(
                "unknown match result: {other}"
            ))),
        }
    }
}

/// Kind of a recorded match event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    OwnGoal,
    YellowCard,
    BlueCard,
    RedCard,
    Substitution,
}

impl EventKind {
    /// Whether the event counts against a team's fair play score
    pub fn is_disciplinary(self) -> bool {
        matches!(
            self,
            EventKind::YellowCard | EventKind::BlueCard | EventKind::RedCard
        )
    }
}

/// Something that happened during a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub kind: EventKind,
    pub minute: u16,
    /// Team the event is recorded against
    pub side: Side,
}

/// A single fixture between two teams, or a bye when `team_b` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub matchday_id: MatchdayId,
    /// Home side
    pub team_a: TeamId,
    /// Away side, `None` for a bye
    pub team_b: Option<TeamId>,
    pub date: Option<NaiveDate>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub result: Option<MatchResult>,
    pub completed: bool,
    pub events: Vec<MatchEvent>,
}

impl Match {
    pub fn is_bye(&self) -> bool {
        self.team_b.is_none()
    }

    /// Team on the given side
    pub fn team(&self, side: Side) -> Option<TeamId> {
        match side {
            Side::TeamA => Some(self.team_a),
            Side::TeamB => self.team_b,
        }
    }

    /// Winning team of a completed, decided match. A bye is won by its present team.
    pub fn winner(&self) -> Option<TeamId> {
        if !self.completed {
            return None;
        }
        match (self.team_b, self.result) {
            (None, _) => Some(self.team_a),
            (Some(_), Some(MatchResult::TeamA)) => Some(self.team_a),
            (Some(team_b), Some(MatchResult::TeamB)) => Some(team_b),
            _ => None,
        }
    }

    /// Clears everything a result submission wrote. Byes keep their implicit win.
    pub fn clear_result(&mut self) {
        if self.is_bye() {
            return;
        }
        self.home_score = None;
        self.away_score = None;
        self.result = None;
        self.completed = false;
        self.events.clear();
    }
}

/// Highest score one side can be credited with in a single match
pub const MAX_SCORE: u32 = 999;

/// Derive a match result from the two scores.
///
/// Returns `None` until both scores are known.
pub fn derive_result(home_score: Option<u32>, away_score: Option<u32>) -> Option<MatchResult> {
    let (home, away) = (home_score?, away_score?);
    Some(match home.cmp(&away) {
        Ordering::Greater => MatchResult::TeamA,
        Ordering::Less => MatchResult::TeamB,
        Ordering::Equal => MatchResult::Draw,
    })
}

/// Aggregate stats of a registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: i32,
    pub fair_play_score: i32,
}

impl Stats {
    pub fn ranking_key(&self) -> RankingKey {
        RankingKey {
            points: self.points,
            goal_difference: self.goal_difference,
            goals_for: self.goals_for,
            fair_play_score: self.fair_play_score,
        }
    }
}

/// Table sort key. Field order is the tie-break order; every field is higher-is-better,
/// so a descending sort on the derived `Ord` ranks the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankingKey {
    pub points: i32,
    pub goal_difference: i32,
    pub goals_for: u32,
    pub fair_play_score: i32,
}

/// A team's enrollment in a tournament (phase `None`) or a single phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub phase_id: Option<PhaseId>,
    pub team_id: TeamId,
    pub stats: Stats,
    /// 1-based table position from the last standings computation
    pub rank: Option<u32>,
}

/// Scope of a standings computation or reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum StandingsScope {
    Phase(PhaseId),
    Tournament(TournamentId),
}

/// Match skeleton produced by the fixture generator or bracket engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub team_a: TeamId,
    pub team_b: Option<TeamId>,
    pub date: Option<NaiveDate>,
    pub result: Option<MatchResult>,
    pub completed: bool,
}

impl NewMatch {
    /// Unplayed fixture, `home` hosting `away`
    pub fn fixture(home: TeamId, away: TeamId, date: Option<NaiveDate>) -> Self {
        Self {
            team_a: home,
            team_b: Some(away),
            date,
            result: None,
            completed: false,
        }
    }

    /// Bye: already completed with `team` as the implicit winner
    pub fn bye(team: TeamId, date: Option<NaiveDate>) -> Self {
        Self {
            team_a: team,
            team_b: None,
            date,
            result: Some(MatchResult::TeamA),
            completed: true,
        }
    }
}

/// Matchday skeleton produced by the fixture generator or bracket engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatchday {
    pub order: u32,
    pub date: Option<NaiveDate>,
    pub matches: Vec<NewMatch>,
}

/// Result entered for a match. Omitted scores keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Explicit outcome, e.g. a penalty shoot-out winner over a level score
    pub outcome: Option<MatchResult>,
    /// Replaces the recorded events when present
    pub events: Option<Vec<MatchEvent>>,
}

/// A matchday together with its matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchdayView {
    pub matchday: Matchday,
    pub matches: Vec<Match>,
}
