//! Repository trait for tournament persistence and its PostgreSQL implementation.
//!
//! The scheduling engine only talks to storage through [`TournamentRepository`], which
//! keeps the engine testable against the in-memory implementation in
//! [`super::memory`].

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::tournament::{
    Match, MatchEvent, MatchId, MatchResult, Matchday, MatchdayId, NewMatchday, Phase, PhaseId,
    PhaseKind, Registration, StandingsScope, Stats, TeamId, TournamentError, TournamentId,
    TournamentResult,
};

/// Trait for phase, matchday, match and registration storage
///
/// Every method that writes more than one row must apply all of its writes or none.
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create an empty phase
    async fn create_phase(
        &self,
        tournament_id: TournamentId,
        name: &str,
        kind: PhaseKind,
    ) -> TournamentResult<Phase>;

    /// Find phase by ID
    async fn find_phase(&self, phase_id: PhaseId) -> TournamentResult<Option<Phase>>;

    /// All phases of a tournament, by ID
    async fn phases_of_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Phase>>;

    /// Change the kind of a phase
    async fn update_phase_kind(&self, phase_id: PhaseId, kind: PhaseKind) -> TournamentResult<()>;

    /// Record or clear the bracket champion of a phase
    async fn set_champion(
        &self,
        phase_id: PhaseId,
        champion: Option<TeamId>,
    ) -> TournamentResult<()>;

    /// Enroll a team in a tournament (`phase_id` = `None`) or in one of its phases
    async fn register_team(
        &self,
        tournament_id: TournamentId,
        phase_id: Option<PhaseId>,
        team_id: TeamId,
    ) -> TournamentResult<Registration>;

    /// Registrations of a scope in registration order.
    ///
    /// `Tournament` scope returns only the tournament-level registrations.
    async fn registrations(&self, scope: StandingsScope) -> TournamentResult<Vec<Registration>>;

    /// Store stats and rank of the given registrations
    async fn update_registrations(&self, registrations: &[Registration]) -> TournamentResult<()>;

    /// Delete every matchday and match of the phase and insert `matchdays` instead.
    /// Also clears the phase champion.
    async fn replace_matchdays(
        &self,
        phase_id: PhaseId,
        matchdays: &[NewMatchday],
    ) -> TournamentResult<Vec<Matchday>>;

    /// Add one matchday with its matches to the phase
    async fn append_matchday(
        &self,
        phase_id: PhaseId,
        matchday: &NewMatchday,
    ) -> TournamentResult<Matchday>;

    /// Matchdays of a phase by order
    async fn matchdays(&self, phase_id: PhaseId) -> TournamentResult<Vec<Matchday>>;

    /// Find matchday by ID
    async fn find_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Option<Matchday>>;

    /// Matches of a matchday in pairing order
    async fn matches_of_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Vec<Match>>;

    /// Find match by ID
    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    /// Store scores, result, completed flag and events of a match
    async fn update_match_result(&self, m: &Match) -> TournamentResult<()>;

    /// Zero the registration stats of a scope, clear the results of its matches and its
    /// recorded champions. `Tournament` scope covers phase-level registrations too.
    async fn reset_scope(&self, scope: StandingsScope) -> TournamentResult<()>;

    /// Check that storage is reachable
    async fn health_check(&self) -> TournamentResult<()>;
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
}

impl PgTournamentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn phase_with_matchdays(&self, row: PgRow) -> TournamentResult<Phase> {
        let id: i64 = row.get("id");
        let kind: String = row.get("kind");
        let matchday_ids = sqlx::query("SELECT id FROM matchdays WHERE phase_id = $1 ORDER BY ord")
            .bind(id)
            .fetch_all(self.pool.as_ref())
            .await?
            .iter()
            .map(|r| r.get::<i64, _>("id"))
            .collect();

        Ok(Phase {
            id,
            tournament_id: row.get("tournament_id"),
            name: row.get("name"),
            kind: kind.parse()?,
            matchday_ids,
            champion: row.get("champion_team_id"),
        })
    }

    async fn matchday_with_matches(&self, row: PgRow) -> TournamentResult<Matchday> {
        let id: i64 = row.get("id");
        let match_ids = sqlx::query("SELECT id FROM matches WHERE matchday_id = $1 ORDER BY position")
            .bind(id)
            .fetch_all(self.pool.as_ref())
            .await?
            .iter()
            .map(|r| r.get::<i64, _>("id"))
            .collect();

        Ok(Matchday {
            id,
            phase_id: row.get("phase_id"),
            order: row.get::<i32, _>("ord") as u32,
            date: row.get("scheduled_on"),
            match_ids,
        })
    }
}

/// Lock the phase row for the rest of the transaction
async fn lock_phase(tx: &mut Transaction<'_, Postgres>, phase_id: PhaseId) -> TournamentResult<()> {
    sqlx::query("SELECT id FROM phases WHERE id = $1 FOR UPDATE")
        .bind(phase_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(TournamentError::PhaseNotFound(phase_id))?;
    Ok(())
}

async fn insert_matchday(
    tx: &mut Transaction<'_, Postgres>,
    phase_id: PhaseId,
    draft: &NewMatchday,
) -> TournamentResult<Matchday> {
    let row = sqlx::query(
        "INSERT INTO matchdays (phase_id, ord, scheduled_on) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(phase_id)
    .bind(draft.order as i32)
    .bind(draft.date)
    .fetch_one(&mut **tx)
    .await?;
    let matchday_id: i64 = row.get("id");

    let mut match_ids = Vec::with_capacity(draft.matches.len());
    for (position, m) in draft.matches.iter().enumerate() {
        let row = sqlx::query(
            r#"
            INSERT INTO matches (matchday_id, position, team_a_id, team_b_id, played_on, result, completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(matchday_id)
        .bind(position as i32)
        .bind(m.team_a)
        .bind(m.team_b)
        .bind(m.date)
        .bind(m.result.map(MatchResult::as_str))
        .bind(m.completed)
        .fetch_one(&mut **tx)
        .await?;
        match_ids.push(row.get::<i64, _>("id"));
    }

    Ok(Matchday {
        id: matchday_id,
        phase_id,
        order: draft.order,
        date: draft.date,
        match_ids,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let result = row
        .get::<Option<String>, _>("result")
        .map(|r| r.parse::<MatchResult>())
        .transpose()?;
    let events: Vec<MatchEvent> = serde_json::from_value(row.get("events"))?;

    Ok(Match {
        id: row.get("id"),
        matchday_id: row.get("matchday_id"),
        team_a: row.get("team_a_id"),
        team_b: row.get("team_b_id"),
        date: row.get("played_on"),
        home_score: row.get::<Option<i32>, _>("home_score").map(|s| s as u32),
        away_score: row.get::<Option<i32>, _>("away_score").map(|s| s as u32),
        result,
        completed: row.get("completed"),
        events,
    })
}

fn registration_from_row(row: &PgRow) -> Registration {
    Registration {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        phase_id: row.get("phase_id"),
        team_id: row.get("team_id"),
        stats: Stats {
            played: row.get::<i32, _>("played") as u32,
            wins: row.get::<i32, _>("wins") as u32,
            draws: row.get::<i32, _>("draws") as u32,
            losses: row.get::<i32, _>("losses") as u32,
            goals_for: row.get::<i32, _>("goals_for") as u32,
            goals_against: row.get::<i32, _>("goals_against") as u32,
            goal_difference: row.get("goal_difference"),
            points: row.get("points"),
            fair_play_score: row.get("fair_play_score"),
        },
        rank: row.get::<Option<i32>, _>("rank").map(|r| r as u32),
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_phase(
        &self,
        tournament_id: TournamentId,
        name: &str,
        kind: PhaseKind,
    ) -> TournamentResult<Phase> {
        let row = with_default_timeout(async {
            Ok(sqlx::query(
                "INSERT INTO phases (tournament_id, name, kind) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(tournament_id)
            .bind(name)
            .bind(kind.as_str())
            .fetch_one(self.pool.as_ref())
            .await?)
        })
        .await?;

        Ok(Phase {
            id: row.get("id"),
            tournament_id,
            name: name.to_string(),
            kind,
            matchday_ids: Vec::new(),
            champion: None,
        })
    }

    async fn find_phase(&self, phase_id: PhaseId) -> TournamentResult<Option<Phase>> {
        let row = with_default_timeout(async {
            Ok(sqlx::query(
                "SELECT id, tournament_id, name, kind, champion_team_id FROM phases WHERE id = $1",
            )
            .bind(phase_id)
            .fetch_optional(self.pool.as_ref())
            .await?)
        })
        .await?;

        match row {
            Some(row) => Ok(Some(self.phase_with_matchdays(row).await?)),
            None => Ok(None),
        }
    }

    async fn phases_of_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Phase>> {
        let rows = with_default_timeout(async {
            Ok(sqlx::query(
                r#"
                SELECT id, tournament_id, name, kind, champion_team_id
                FROM phases
                WHERE tournament_id = $1
                ORDER BY id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(self.pool.as_ref())
            .await?)
        })
        .await?;

        let mut phases = Vec::with_capacity(rows.len());
        for row in rows {
            phases.push(self.phase_with_matchdays(row).await?);
        }
        Ok(phases)
    }

    async fn update_phase_kind(&self, phase_id: PhaseId, kind: PhaseKind) -> TournamentResult<()> {
        let result = sqlx::query("UPDATE phases SET kind = $1 WHERE id = $2")
            .bind(kind.as_str())
            .bind(phase_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::PhaseNotFound(phase_id));
        }
        Ok(())
    }

    async fn set_champion(
        &self,
        phase_id: PhaseId,
        champion: Option<TeamId>,
    ) -> TournamentResult<()> {
        let result = sqlx::query("UPDATE phases SET champion_team_id = $1 WHERE id = $2")
            .bind(champion)
            .bind(phase_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::PhaseNotFound(phase_id));
        }
        Ok(())
    }

    async fn register_team(
        &self,
        tournament_id: TournamentId,
        phase_id: Option<PhaseId>,
        team_id: TeamId,
    ) -> TournamentResult<Registration> {
        let row = sqlx::query(
            "INSERT INTO registrations (tournament_id, phase_id, team_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(tournament_id)
        .bind(phase_id)
        .bind(team_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(Registration {
            id: row.get("id"),
            tournament_id,
            phase_id,
            team_id,
            stats: Stats::default(),
            rank: None,
        })
    }

    async fn registrations(&self, scope: StandingsScope) -> TournamentResult<Vec<Registration>> {
        let rows = with_default_timeout(async {
            let query = match scope {
                StandingsScope::Phase(phase_id) => sqlx::query(
                    r#"
                    SELECT id, tournament_id, phase_id, team_id, played, wins, draws, losses,
                           goals_for, goals_against, goal_difference, points, fair_play_score, rank
                    FROM registrations
                    WHERE phase_id = $1
                    ORDER BY id
                    "#,
                )
                .bind(phase_id),
                StandingsScope::Tournament(tournament_id) => sqlx::query(
                    r#"
                    SELECT id, tournament_id, phase_id, team_id, played, wins, draws, losses,
                           goals_for, goals_against, goal_difference, points, fair_play_score, rank
                    FROM registrations
                    WHERE tournament_id = $1 AND phase_id IS NULL
                    ORDER BY id
                    "#,
                )
                .bind(tournament_id),
            };
            Ok(query.fetch_all(self.pool.as_ref()).await?)
        })
        .await?;

        Ok(rows.iter().map(registration_from_row).collect())
    }

    async fn update_registrations(&self, registrations: &[Registration]) -> TournamentResult<()> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            for registration in registrations {
                let stats = &registration.stats;
                sqlx::query(
                    r#"
                    UPDATE registrations
                    SET played = $1, wins = $2, draws = $3, losses = $4, goals_for = $5,
                        goals_against = $6, goal_difference = $7, points = $8,
                        fair_play_score = $9, rank = $10
                    WHERE id = $11
                    "#,
                )
                .bind(stats.played as i32)
                .bind(stats.wins as i32)
                .bind(stats.draws as i32)
                .bind(stats.losses as i32)
                .bind(stats.goals_for as i32)
                .bind(stats.goals_against as i32)
                .bind(stats.goal_difference)
                .bind(stats.points)
                .bind(stats.fair_play_score)
                .bind(registration.rank.map(|r| r as i32))
                .bind(registration.id)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn replace_matchdays(
        &self,
        phase_id: PhaseId,
        matchdays: &[NewMatchday],
    ) -> TournamentResult<Vec<Matchday>> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            lock_phase(&mut tx, phase_id).await?;

            sqlx::query(
                "DELETE FROM matches WHERE matchday_id IN (SELECT id FROM matchdays WHERE phase_id = $1)",
            )
            .bind(phase_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM matchdays WHERE phase_id = $1")
                .bind(phase_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE phases SET champion_team_id = NULL WHERE id = $1")
                .bind(phase_id)
                .execute(&mut *tx)
                .await?;

            let mut inserted = Vec::with_capacity(matchdays.len());
            for draft in matchdays {
                inserted.push(insert_matchday(&mut tx, phase_id, draft).await?);
            }

            // Dropping the transaction on any error above rolls everything back
            tx.commit().await?;
            Ok(inserted)
        })
        .await
    }

    async fn append_matchday(
        &self,
        phase_id: PhaseId,
        matchday: &NewMatchday,
    ) -> TournamentResult<Matchday> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            lock_phase(&mut tx, phase_id).await?;
            let inserted = insert_matchday(&mut tx, phase_id, matchday).await?;
            tx.commit().await?;
            Ok(inserted)
        })
        .await
    }

    async fn matchdays(&self, phase_id: PhaseId) -> TournamentResult<Vec<Matchday>> {
        let rows = with_default_timeout(async {
            Ok(sqlx::query(
                "SELECT id, phase_id, ord, scheduled_on FROM matchdays WHERE phase_id = $1 ORDER BY ord",
            )
            .bind(phase_id)
            .fetch_all(self.pool.as_ref())
            .await?)
        })
        .await?;

        let mut matchdays = Vec::with_capacity(rows.len());
        for row in rows {
            matchdays.push(self.matchday_with_matches(row).await?);
        }
        Ok(matchdays)
    }

    async fn find_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Option<Matchday>> {
        let row = sqlx::query("SELECT id, phase_id, ord, scheduled_on FROM matchdays WHERE id = $1")
            .bind(matchday_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        match row {
            Some(row) => Ok(Some(self.matchday_with_matches(row).await?)),
            None => Ok(None),
        }
    }

    async fn matches_of_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Vec<Match>> {
        let rows = with_default_timeout(async {
            Ok(sqlx::query(
                r#"
                SELECT id, matchday_id, team_a_id, team_b_id, played_on, home_score, away_score,
                       result, completed, events
                FROM matches
                WHERE matchday_id = $1
                ORDER BY position
                "#,
            )
            .bind(matchday_id)
            .fetch_all(self.pool.as_ref())
            .await?)
        })
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, matchday_id, team_a_id, team_b_id, played_on, home_score, away_score,
                   result, completed, events
            FROM matches
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn update_match_result(&self, m: &Match) -> TournamentResult<()> {
        let events = serde_json::to_value(&m.events)?;
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET home_score = $1, away_score = $2, result = $3, completed = $4, events = $5
            WHERE id = $6
            "#,
        )
        .bind(m.home_score.map(|s| s as i32))
        .bind(m.away_score.map(|s| s as i32))
        .bind(m.result.map(MatchResult::as_str))
        .bind(m.completed)
        .bind(events)
        .bind(m.id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::MatchNotFound(m.id));
        }
        Ok(())
    }

    async fn reset_scope(&self, scope: StandingsScope) -> TournamentResult<()> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            match scope {
                StandingsScope::Phase(phase_id) => {
                    lock_phase(&mut tx, phase_id).await?;
                    sqlx::query(
                        r#"
                        UPDATE registrations
                        SET played = 0, wins = 0, draws = 0, losses = 0, goals_for = 0,
                            goals_against = 0, goal_difference = 0, points = 0,
                            fair_play_score = 0, rank = NULL
                        WHERE phase_id = $1
                        "#,
                    )
                    .bind(phase_id)
                    .execute(&mut *tx)
                    .await?;
                    sqlx::query(
                        r#"
                        UPDATE matches
                        SET home_score = NULL, away_score = NULL, result = NULL,
                            completed = FALSE, events = '[]'::jsonb
                        WHERE team_b_id IS NOT NULL
                          AND matchday_id IN (SELECT id FROM matchdays WHERE phase_id = $1)
                        "#,
                    )
                    .bind(phase_id)
                    .execute(&mut *tx)
                    .await?;
                    sqlx::query("UPDATE phases SET champion_team_id = NULL WHERE id = $1")
                        .bind(phase_id)
                        .execute(&mut *tx)
                        .await?;
                }
                StandingsScope::Tournament(tournament_id) => {
                    sqlx::query(
                        "SELECT id FROM phases WHERE tournament_id = $1 ORDER BY id FOR UPDATE",
                    )
                    .bind(tournament_id)
                    .fetch_all(&mut *tx)
                    .await?;
                    sqlx::query(
                        r#"
                        UPDATE registrations
                        SET played = 0, wins = 0, draws = 0, losses = 0, goals_for = 0,
                            goals_against = 0, goal_difference = 0, points = 0,
                            fair_play_score = 0, rank = NULL
                        WHERE tournament_id = $1
                        "#,
                    )
                    .bind(tournament_id)
                    .execute(&mut *tx)
                    .await?;
                    sqlx::query(
                        r#"
                        UPDATE matches
                        SET home_score = NULL, away_score = NULL, result = NULL,
                            completed = FALSE, events = '[]'::jsonb
                        WHERE team_b_id IS NOT NULL
                          AND matchday_id IN (
                              SELECT md.id FROM matchdays md
                              JOIN phases p ON p.id = md.phase_id
                              WHERE p.tournament_id = $1
                          )
                        "#,
                    )
                    .bind(tournament_id)
                    .execute(&mut *tx)
                    .await?;
                    sqlx::query("UPDATE phases SET champion_team_id = NULL WHERE tournament_id = $1")
                        .bind(tournament_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn health_check(&self) -> TournamentResult<()> {
        with_default_timeout(async {
            sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
            Ok(())
        })
        .await
    }
}
