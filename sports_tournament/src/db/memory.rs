//! In-memory `TournamentRepository` for tests and database-less deployments.
//!
//! Writes run against a copy of the store that replaces the live one only on success,
//! so a failing write leaves nothing behind.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::repository::TournamentRepository;
use crate::tournament::{
    Match, MatchId, Matchday, MatchdayId, NewMatchday, Phase, PhaseId, PhaseKind, Registration,
    RegistrationId, StandingsScope, Stats, TeamId, TournamentError, TournamentId,
    TournamentResult,
};

#[derive(Debug, Clone, Default)]
struct Store {
    last_id: i64,
    phases: BTreeMap<PhaseId, Phase>,
    matchdays: BTreeMap<MatchdayId, Matchday>,
    matches: BTreeMap<MatchId, Match>,
    registrations: BTreeMap<RegistrationId, Registration>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn phase_mut(&mut self, phase_id: PhaseId) -> TournamentResult<&mut Phase> {
        self.phases
            .get_mut(&phase_id)
            .ok_or(TournamentError::PhaseNotFound(phase_id))
    }

    fn insert_matchday(
        &mut self,
        phase_id: PhaseId,
        draft: &NewMatchday,
    ) -> TournamentResult<Matchday> {
        self.phase_mut(phase_id)?;
        if self
            .matchdays
            .values()
            .any(|md| md.phase_id == phase_id && md.order == draft.order)
        {
            return Err(TournamentError::Storage(format!(
                "phase {phase_id} already has a matchday with order {}",
                draft.order
            )));
        }

        let matchday_id = self.next_id();
        let mut match_ids = Vec::with_capacity(draft.matches.len());
        for m in &draft.matches {
            let match_id = self.next_id();
            self.matches.insert(
                match_id,
                Match {
                    id: match_id,
                    matchday_id,
                    team_a: m.team_a,
                    team_b: m.team_b,
                    date: m.date,
                    home_score: None,
                    away_score: None,
                    result: m.result,
                    completed: m.completed,
                    events: Vec::new(),
                },
            );
            match_ids.push(match_id);
        }

        let matchday = Matchday {
            id: matchday_id,
            phase_id,
            order: draft.order,
            date: draft.date,
            match_ids,
        };
        self.matchdays.insert(matchday_id, matchday.clone());

        let phase = self.phase_mut(phase_id)?;
        phase.matchday_ids.push(matchday_id);
        let ordered = phase.matchday_ids.clone();
        let mut ordered: Vec<(u32, MatchdayId)> = ordered
            .into_iter()
            .filter_map(|id| self.matchdays.get(&id).map(|md| (md.order, id)))
            .collect();
        ordered.sort_unstable();
        self.phase_mut(phase_id)?.matchday_ids = ordered.into_iter().map(|(_, id)| id).collect();

        Ok(matchday)
    }

    fn clear_phase_schedule(&mut self, phase_id: PhaseId) -> TournamentResult<()> {
        let phase = self.phase_mut(phase_id)?;
        let matchday_ids = std::mem::take(&mut phase.matchday_ids);
        phase.champion = None;

        for matchday_id in matchday_ids {
            if let Some(matchday) = self.matchdays.remove(&matchday_id) {
                for match_id in matchday.match_ids {
                    self.matches.remove(&match_id);
                }
            }
        }
        Ok(())
    }

    fn reset_phase_results(&mut self, phase_id: PhaseId) -> TournamentResult<()> {
        let phase = self.phase_mut(phase_id)?;
        phase.champion = None;
        let matchday_ids = phase.matchday_ids.clone();

        let match_ids: Vec<MatchId> = matchday_ids
            .iter()
            .filter_map(|id| self.matchdays.get(id))
            .flat_map(|md| md.match_ids.iter().copied())
            .collect();
        for match_id in match_ids {
            if let Some(m) = self.matches.get_mut(&match_id) {
                m.clear_result();
            }
        }
        Ok(())
    }
}

/// `TournamentRepository` kept entirely in process memory
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
    fail_next_write: Arc<AtomicBool>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail after it has been applied to the working copy, before it
    /// becomes visible. Lets callers observe that a failed write changes nothing.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> TournamentResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| TournamentError::Storage("in-memory store poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> TournamentResult<T> {
        let store = self.lock()?;
        Ok(f(&store))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Store) -> TournamentResult<T>) -> TournamentResult<T> {
        let mut store = self.lock()?;
        let mut working = store.clone();
        let value = f(&mut working)?;

        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            log::warn!("Injected in-memory write failure, discarding changes");
            return Err(TournamentError::Storage("injected write failure".to_string()));
        }

        *store = working;
        Ok(value)
    }
}

#[async_trait]
impl TournamentRepository for InMemoryRepository {
    async fn create_phase(
        &self,
        tournament_id: TournamentId,
        name: &str,
        kind: PhaseKind,
    ) -> TournamentResult<Phase> {
        self.write(|store| {
            let phase = Phase {
                id: store.next_id(),
                tournament_id,
                name: name.to_string(),
                kind,
                matchday_ids: Vec::new(),
                champion: None,
            };
            store.phases.insert(phase.id, phase.clone());
            Ok(phase)
        })
    }

    async fn find_phase(&self, phase_id: PhaseId) -> TournamentResult<Option<Phase>> {
        self.read(|store| store.phases.get(&phase_id).cloned())
    }

    async fn phases_of_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Phase>> {
        self.read(|store| {
            store
                .phases
                .values()
                .filter(|p| p.tournament_id == tournament_id)
                .cloned()
                .collect()
        })
    }

    async fn update_phase_kind(&self, phase_id: PhaseId, kind: PhaseKind) -> TournamentResult<()> {
        self.write(|store| {
            store.phase_mut(phase_id)?.kind = kind;
            Ok(())
        })
    }

    async fn set_champion(
        &self,
        phase_id: PhaseId,
        champion: Option<TeamId>,
    ) -> TournamentResult<()> {
        self.write(|store| {
            store.phase_mut(phase_id)?.champion = champion;
            Ok(())
        })
    }

    async fn register_team(
        &self,
        tournament_id: TournamentId,
        phase_id: Option<PhaseId>,
        team_id: TeamId,
    ) -> TournamentResult<Registration> {
        self.write(|store| {
            if let Some(phase_id) = phase_id {
                store.phase_mut(phase_id)?;
            }
            let registration = Registration {
                id: store.next_id(),
                tournament_id,
                phase_id,
                team_id,
                stats: Stats::default(),
                rank: None,
            };
            store
                .registrations
                .insert(registration.id, registration.clone());
            Ok(registration)
        })
    }

    async fn registrations(&self, scope: StandingsScope) -> TournamentResult<Vec<Registration>> {
        self.read(|store| {
            store
                .registrations
                .values()
                .filter(|r| match scope {
                    StandingsScope::Phase(phase_id) => r.phase_id == Some(phase_id),
                    StandingsScope::Tournament(tournament_id) => {
                        r.tournament_id == tournament_id && r.phase_id.is_none()
                    }
                })
                .cloned()
                .collect()
        })
    }

    async fn update_registrations(&self, registrations: &[Registration]) -> TournamentResult<()> {
        self.write(|store| {
            for registration in registrations {
                let stored = store.registrations.get_mut(&registration.id).ok_or_else(|| {
                    TournamentError::Storage(format!(
                        "registration {} does not exist",
                        registration.id
                    ))
                })?;
                stored.stats = registration.stats;
                stored.rank = registration.rank;
            }
            Ok(())
        })
    }

    async fn replace_matchdays(
        &self,
        phase_id: PhaseId,
        matchdays: &[NewMatchday],
    ) -> TournamentResult<Vec<Matchday>> {
        self.write(|store| {
            store.clear_phase_schedule(phase_id)?;
            matchdays
                .iter()
                .map(|draft| store.insert_matchday(phase_id, draft))
                .collect()
        })
    }

    async fn append_matchday(
        &self,
        phase_id: PhaseId,
        matchday: &NewMatchday,
    ) -> TournamentResult<Matchday> {
        self.write(|store| store.insert_matchday(phase_id, matchday))
    }

    async fn matchdays(&self, phase_id: PhaseId) -> TournamentResult<Vec<Matchday>> {
        self.read(|store| {
            let mut matchdays: Vec<Matchday> = store
                .matchdays
                .values()
                .filter(|md| md.phase_id == phase_id)
                .cloned()
                .collect();
            matchdays.sort_by_key(|md| md.order);
            matchdays
        })
    }

    async fn find_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Option<Matchday>> {
        self.read(|store| store.matchdays.get(&matchday_id).cloned())
    }

    async fn matches_of_matchday(&self, matchday_id: MatchdayId) -> TournamentResult<Vec<Match>> {
        self.read(|store| {
            store
                .matchdays
                .get(&matchday_id)
                .map(|md| {
                    md.match_ids
                        .iter()
                        .filter_map(|id| store.matches.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    async fn find_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        self.read(|store| store.matches.get(&match_id).cloned())
    }

    async fn update_match_result(&self, m: &Match) -> TournamentResult<()> {
        self.write(|store| {
            let stored = store
                .matches
                .get_mut(&m.id)
                .ok_or(TournamentError::MatchNotFound(m.id))?;
            stored.home_score = m.home_score;
            stored.away_score = m.away_score;
            stored.result = m.result;
            stored.completed = m.completed;
            stored.events = m.events.clone();
            Ok(())
        })
    }

    async fn reset_scope(&self, scope: StandingsScope) -> TournamentResult<()> {
        self.write(|store| {
            let phase_ids: Vec<PhaseId> = match scope {
                StandingsScope::Phase(phase_id) => {
                    store.phase_mut(phase_id)?;
                    vec![phase_id]
                }
                StandingsScope::Tournament(tournament_id) => store
                    .phases
                    .values()
                    .filter(|p| p.tournament_id == tournament_id)
                    .map(|p| p.id)
                    .collect(),
            };

            for registration in store.registrations.values_mut() {
                let in_scope = match scope {
                    StandingsScope::Phase(phase_id) => registration.phase_id == Some(phase_id),
                    StandingsScope::Tournament(tournament_id) => {
                        registration.tournament_id == tournament_id
                    }
                };
                if in_scope {
                    registration.stats = Stats::default();
                    registration.rank = None;
                }
            }

            for phase_id in phase_ids {
                store.reset_phase_results(phase_id)?;
            }
            Ok(())
        })
    }

    async fn health_check(&self) -> TournamentResult<()> {
        self.lock().map(|_| ())
    }
}
