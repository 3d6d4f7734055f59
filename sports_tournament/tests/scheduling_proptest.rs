/// Property-based tests for fixture generation, bracket seeding and table aggregation
///
/// These tests check the structural invariants over randomly sized and ordered team lists.
use proptest::prelude::*;
use sports_tournament::bracket::{self, bracket_size, total_rounds};
use sports_tournament::fixture::{FixtureOptions, generate, rounds_per_leg};
use sports_tournament::standings::{StandingsConfig, aggregate};
use sports_tournament::tournament::{Match, TeamId, derive_result};
use std::collections::HashSet;

// Strategy to generate between `min` and `max` distinct team ids in random order
fn team_ids_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<TeamId>> {
    prop::collection::hash_set(1i64..10_000, min..=max)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #[test]
    fn test_every_pair_meets_once_per_leg(teams in team_ids_strategy(2, 20), double in any::<bool>()) {
        let options = FixtureOptions { double_round: double, ..FixtureOptions::default() };
        let matchdays = generate(&teams, &options).unwrap();

        let legs = if double { 2 } else { 1 };
        prop_assert_eq!(matchdays.len(), rounds_per_leg(teams.len()) * legs);

        let mut ordered_pairs = HashSet::new();
        let mut unordered_count = std::collections::HashMap::new();
        for md in &matchdays {
            let mut in_round = HashSet::new();
            for m in &md.matches {
                let away = m.team_b.unwrap();
                prop_assert_ne!(m.team_a, away);
                prop_assert!(in_round.insert(m.team_a), "team plays twice in a round");
                prop_assert!(in_round.insert(away), "team plays twice in a round");
                prop_assert!(ordered_pairs.insert((m.team_a, away)), "same home/away pairing twice");
                *unordered_count.entry((m.team_a.min(away), m.team_a.max(away))).or_insert(0) += 1;
            }
        }

        let n = teams.len();
        prop_assert_eq!(unordered_count.len(), n * (n - 1) / 2);
        prop_assert!(unordered_count.values().all(|&count| count == legs));
    }

    #[test]
    fn test_matchday_orders_are_contiguous(teams in team_ids_strategy(2, 15)) {
        let matchdays = generate(&teams, &FixtureOptions::double_round()).unwrap();
        for (index, md) in matchdays.iter().enumerate() {
            prop_assert_eq!(md.order as usize, index + 1);
        }
    }

    #[test]
    fn test_bracket_seeding_shape(teams in team_ids_strategy(2, 64)) {
        let round = bracket::seed(&teams, None).unwrap();
        let size = bracket_size(teams.len());

        prop_assert!(size.is_power_of_two());
        prop_assert!(size >= teams.len() && size < teams.len() * 2);
        prop_assert_eq!(round.matches.len(), size / 2);
        prop_assert_eq!(2u64.pow(total_rounds(teams.len())), size as u64);

        let byes: Vec<TeamId> = round.matches.iter().filter(|m| m.team_b.is_none()).map(|m| m.team_a).collect();
        prop_assert_eq!(&byes[..], &teams[..size - teams.len()]);
        prop_assert!(round.matches.iter().filter(|m| m.team_b.is_none()).all(|m| m.completed));

        let seated: HashSet<TeamId> = round
            .matches
            .iter()
            .flat_map(|m| std::iter::once(m.team_a).chain(m.team_b))
            .collect();
        prop_assert_eq!(seated.len(), teams.len());
    }

    #[test]
    fn test_table_conserves_goals_and_results(
        teams in team_ids_strategy(2, 10),
        scores in prop::collection::vec((0u32..6, 0u32..6), 0..30),
    ) {
        let pairings = generate(&teams, &FixtureOptions::double_round()).unwrap();
        let matches: Vec<Match> = pairings
            .iter()
            .flat_map(|md| md.matches.iter())
            .zip(scores.iter())
            .enumerate()
            .map(|(i, (m, &(home, away)))| Match {
                id: i as i64,
                matchday_id: 0,
                team_a: m.team_a,
                team_b: m.team_b,
                date: None,
                home_score: Some(home),
                away_score: Some(away),
                result: derive_result(Some(home), Some(away)),
                completed: true,
                events: Vec::new(),
            })
            .collect();

        let table = aggregate(&teams, &matches, &StandingsConfig::default());

        let goals_for: u32 = table.iter().map(|r| r.stats.goals_for).sum();
        let goals_against: u32 = table.iter().map(|r| r.stats.goals_against).sum();
        prop_assert_eq!(goals_for, goals_against);

        let wins: u32 = table.iter().map(|r| r.stats.wins).sum();
        let losses: u32 = table.iter().map(|r| r.stats.losses).sum();
        prop_assert_eq!(wins, losses);

        let played: u32 = table.iter().map(|r| r.stats.played).sum();
        prop_assert_eq!(played as usize, matches.len() * 2);

        for pair in table.windows(2) {
            prop_assert!(pair[0].stats.ranking_key() >= pair[1].stats.ranking_key());
            prop_assert_eq!(pair[0].rank + 1, pair[1].rank);
        }
    }
}
