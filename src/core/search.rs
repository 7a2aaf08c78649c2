/// Cast assignment search.
///
/// Fills the open living roles of one situation by cross-casting characters
/// that already exist. Candidates are found by simulating each assignment on
/// a clone of the graph; a branch-and-bound backtracking search then picks
/// the cheapest permutation, where cost is edges left dangling minus
/// dangling edges resolved. The winner is replayed on the real graph.
///
/// `plan_open_roles` runs the same search over every open role of the graph
/// at once. There a role may be left open, and fewer open roles beats a
/// lower cost.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::graph::{CastGraph, RoleId, SituationId};
use crate::core::random::RandomSource;
use crate::schema::character::CharacterId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no character can play any open role of situation {0:?}")]
    NoCandidate(SituationId),
    #[error("no consistent assignment covers the open roles of situation {0:?}")]
    NoFeasiblePermutation(SituationId),
    #[error("search for situation {situation:?} gave up after {nodes} nodes")]
    BudgetExhausted { situation: SituationId, nodes: usize },
    #[error("search over all open roles gave up after {nodes} nodes")]
    GlobalBudgetExhausted { nodes: usize },
}

/// An open role and the characters able to play it on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCandidates {
    pub role: RoleId,
    pub characters: Vec<CharacterId>,
}

/// The permutation chosen for a situation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPlan {
    pub assignments: Vec<(RoleId, CharacterId)>,
    pub cost: i64,
    /// Open roles nobody could play, or that the search left open; they
    /// stay phantoms.
    pub skipped: Vec<RoleId>,
    pub nodes: usize,
    /// The node budget ran out before the tree was exhausted.
    pub truncated: bool,
}

/// Characters that could take `role` given the graph as it stands.
pub fn candidates_for(graph: &CastGraph, role: RoleId) -> Vec<CharacterId> {
    graph
        .characters
        .iter()
        .map(|c| c.id)
        .filter(|c| match graph.simulate_assignment(*c, role) {
            Ok(_) => true,
            Err(e) => {
                debug!(character = c.0, role = role.0, error = %e, "not a candidate");
                false
            }
        })
        .collect()
}

/// A complete path: the assignments made and the roles passed over.
type Leaf = (Vec<(RoleId, CharacterId)>, Vec<RoleId>);

struct Search<'a> {
    open: &'a [RoleCandidates],
    budget: usize,
    nodes: usize,
    /// Whether a role may be passed over to keep the rest of the path alive.
    allow_skip: bool,
    path: Vec<(RoleId, CharacterId)>,
    passed: Vec<RoleId>,
    /// Roles passed over, then cost; lower is better in that order.
    best_score: Option<(usize, i64)>,
    best: Vec<Leaf>,
    /// Best score each time a complete path was recorded.
    history: Vec<(usize, i64)>,
}

impl<'a> Search<'a> {
    fn new(open: &'a [RoleCandidates], budget: usize) -> Self {
        Self {
            open,
            budget,
            nodes: 0,
            allow_skip: false,
            path: Vec::with_capacity(open.len()),
            passed: Vec::new(),
            best_score: None,
            best: Vec::new(),
            history: Vec::new(),
        }
    }

    fn allowing_skips(mut self) -> Self {
        self.allow_skip = true;
        self
    }

    fn exhausted(&self) -> bool {
        self.nodes >= self.budget
    }

    /// Equal scores stay in play so ties can be broken at random.
    fn beaten(&self, passed: usize, cost: i64) -> bool {
        self.best_score.is_some_and(|best| (passed, cost) > best)
    }

    fn descend(&mut self, graph: &CastGraph, depth: usize, cost: i64) {
        if self.exhausted() {
            return;
        }
        self.nodes += 1;

        if depth == self.open.len() {
            self.record(cost);
            return;
        }

        // The graph rejects a character taking two roles of one situation
        // or more roles than it has room for.
        let open = self.open;
        let slot = &open[depth];
        for character in &slot.characters {
            let Ok((next, outcome)) = graph.simulate_assignment(*character, slot.role) else {
                continue;
            };
            let cost = cost + outcome.cost();
            if self.beaten(self.passed.len(), cost) {
                continue;
            }
            self.path.push((slot.role, *character));
            self.descend(&next, depth + 1, cost);
            self.path.pop();
            if self.exhausted() {
                return;
            }
        }

        if self.allow_skip && !self.beaten(self.passed.len() + 1, cost) {
            self.passed.push(slot.role);
            self.descend(graph, depth + 1, cost);
            self.passed.pop();
        }
    }

    fn record(&mut self, cost: i64) {
        let score = (self.passed.len(), cost);
        let leaf = (self.path.clone(), self.passed.clone());
        match self.best_score {
            Some(best) if score > best => return,
            Some(best) if score == best => self.best.push(leaf),
            _ => {
                self.best_score = Some(score);
                self.best = vec![leaf];
            }
        }
        self.history.push(score);
    }
}

/// Find the cheapest consistent permutation for a situation's open roles
/// without touching `graph`.
pub fn plan_situation<R: RandomSource>(
    graph: &CastGraph,
    situation: SituationId,
    rng: &mut R,
    node_budget: usize,
) -> Result<SearchPlan, SearchError> {
    let mut open = Vec::new();
    let mut skipped = Vec::new();
    for role in graph.unassigned_living_roles(situation) {
        let characters = candidates_for(graph, role);
        if characters.is_empty() {
            warn!(role = role.0, situation = situation.0, "no candidate for role");
            skipped.push(role);
        } else {
            open.push(RoleCandidates { role, characters });
        }
    }
    if open.is_empty() {
        return Err(SearchError::NoCandidate(situation));
    }

    let mut search = Search::new(&open, node_budget);
    search.descend(graph, 0, 0);
    let truncated = search.exhausted();
    debug!(
        situation = situation.0,
        nodes = search.nodes,
        improvements = search.history.len(),
        ties = search.best.len(),
        "search finished"
    );

    let Some((_, cost)) = search.best_score else {
        return Err(if truncated {
            SearchError::BudgetExhausted {
                situation,
                nodes: search.nodes,
            }
        } else {
            SearchError::NoFeasiblePermutation(situation)
        });
    };
    if truncated {
        warn!(situation = situation.0, nodes = search.nodes, "search budget exhausted, keeping best so far");
    }

    let (assignments, _) = rng.pick(&search.best).cloned().unwrap_or_default();
    Ok(SearchPlan {
        assignments,
        cost,
        skipped,
        nodes: search.nodes,
        truncated,
    })
}

/// Find the cheapest way to fill as many of the graph's open living roles as
/// possible, across every situation at once, without touching `graph`.
pub fn plan_open_roles<R: RandomSource>(
    graph: &CastGraph,
    rng: &mut R,
    node_budget: usize,
) -> Result<SearchPlan, SearchError> {
    let mut open = Vec::new();
    let mut skipped = Vec::new();
    for role in graph.open_living_roles() {
        let characters = candidates_for(graph, role);
        if characters.is_empty() {
            skipped.push(role);
        } else {
            open.push(RoleCandidates { role, characters });
        }
    }
    if open.is_empty() {
        return Ok(SearchPlan {
            skipped,
            ..SearchPlan::default()
        });
    }
    // Tightest roles first, so complete fills turn up early.
    open.sort_by_key(|slot| slot.characters.len());

    let mut search = Search::new(&open, node_budget).allowing_skips();
    search.descend(graph, 0, 0);
    let truncated = search.exhausted();
    debug!(
        roles = open.len(),
        nodes = search.nodes,
        improvements = search.history.len(),
        ties = search.best.len(),
        "global search finished"
    );

    let Some((_, cost)) = search.best_score else {
        return Err(SearchError::GlobalBudgetExhausted { nodes: search.nodes });
    };
    let (assignments, passed) = rng.pick(&search.best).cloned().unwrap_or_default();
    skipped.extend(passed);
    Ok(SearchPlan {
        assignments,
        cost,
        skipped,
        nodes: search.nodes,
        truncated,
    })
}

/// Plan and commit every open living role of the graph at once.
pub fn fill_open_roles<R: RandomSource>(
    graph: &mut CastGraph,
    rng: &mut R,
    node_budget: usize,
) -> Result<SearchPlan, SearchError> {
    let plan = plan_open_roles(graph, rng, node_budget)?;
    commit(graph, &plan);
    info!(
        cast = plan.assignments.len(),
        cost = plan.cost,
        phantoms = plan.skipped.len(),
        truncated = plan.truncated,
        "open roles cross-cast together"
    );
    Ok(plan)
}

fn commit(graph: &mut CastGraph, plan: &SearchPlan) {
    for (role, character) in &plan.assignments {
        if let Err(e) = graph.try_assign_role(*character, *role) {
            warn!(role = role.0, character = character.0, error = %e, "planned assignment failed on commit");
        }
    }
}

/// Plan and commit the open roles of one situation on the real graph.
pub fn fill_situation<R: RandomSource>(
    graph: &mut CastGraph,
    situation: SituationId,
    rng: &mut R,
    node_budget: usize,
) -> Result<SearchPlan, SearchError> {
    let plan = plan_situation(graph, situation, rng, node_budget)?;
    commit(graph, &plan);
    info!(
        situation = situation.0,
        cast = plan.assignments.len(),
        cost = plan.cost,
        phantoms = plan.skipped.len(),
        "situation cross-cast"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::{ScriptedRandom, SeededRandom};
    use crate::schema::character::AgeRange;
    use crate::schema::relation::{MaritalKind, OutgoingKind, RelationKind};
    use crate::schema::template::{RoleConstraints, RoleTemplateId, SituationTemplateId};
    use proptest::prelude::*;
    use std::collections::HashSet;

    const MARRIED: RelationKind = RelationKind::Marital(MaritalKind::Married);
    const HATE: RelationKind = RelationKind::Outgoing(OutgoingKind::Hate);

    fn open_situation(graph: &mut CastGraph, roles: usize) -> (SituationId, Vec<RoleId>) {
        let s = graph.add_situation(SituationTemplateId(0));
        let ids = (0..roles)
            .map(|i| graph.add_role(s, RoleTemplateId(i), RoleConstraints::default()))
            .collect();
        (s, ids)
    }

    #[test]
    fn fills_open_role_with_other_character() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let other = g.add_character(AgeRange::default());
        let (s, roles) = open_situation(&mut g, 2);
        g.try_assign_role(owner, roles[0]).unwrap();
        g.set_owner(s, owner);

        let plan = fill_situation(&mut g, s, &mut ScriptedRandom::zeros(), 1000).unwrap();
        assert_eq!(plan.assignments, vec![(roles[1], other)]);
        assert_eq!(g.role(roles[1]).assigned, Some(other));
        assert!(g.unassigned_living_roles(s).is_empty());
    }

    #[test]
    fn resolving_a_dangling_edge_lowers_cost() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let enemy = g.add_character(AgeRange::default());
        let (s, roles) = open_situation(&mut g, 3);
        g.add_relation(roles[0], HATE, roles[1]);
        g.add_relation(roles[2], HATE, roles[0]);
        g.try_assign_role(owner, roles[0]).unwrap();
        let third = g.add_character(AgeRange::default());

        // Resolving owner's hate earns -1; the third role's own hate points
        // at an assigned role, so it adds nothing pending.
        let plan = plan_situation(&g, s, &mut ScriptedRandom::zeros(), 1000).unwrap();
        assert_eq!(plan.cost, -1);
        assert_eq!(plan.assignments.len(), 2);
        let cast: Vec<_> = plan.assignments.iter().map(|(_, c)| *c).collect();
        assert!(cast.contains(&enemy) && cast.contains(&third));
    }

    #[test]
    fn married_character_is_not_a_candidate_for_second_marriage() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let wed = g.add_character(AgeRange::default());
        let (s1, first) = open_situation(&mut g, 2);
        g.add_relation(first[0], MARRIED, first[1]);
        g.try_assign_role(wed, first[0]).unwrap();
        g.set_owner(s1, wed);

        let (s2, second) = open_situation(&mut g, 2);
        g.add_relation(second[1], MARRIED, second[0]);
        g.try_assign_role(owner, second[0]).unwrap();

        assert_eq!(candidates_for(&g, second[1]), Vec::<CharacterId>::new());
        assert_eq!(
            plan_situation(&g, s2, &mut ScriptedRandom::zeros(), 1000),
            Err(SearchError::NoCandidate(s2))
        );
    }

    #[test]
    fn one_character_cannot_fill_two_roles() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let only = g.add_character(AgeRange::default());
        let (s, roles) = open_situation(&mut g, 3);
        g.try_assign_role(owner, roles[0]).unwrap();

        assert_eq!(candidates_for(&g, roles[1]), vec![only]);
        assert_eq!(candidates_for(&g, roles[2]), vec![only]);
        assert_eq!(
            plan_situation(&g, s, &mut ScriptedRandom::zeros(), 1000),
            Err(SearchError::NoFeasiblePermutation(s))
        );
    }

    #[test]
    fn budget_exhaustion_without_result() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        for _ in 0..3 {
            g.add_character(AgeRange::default());
        }
        let (s, roles) = open_situation(&mut g, 3);
        g.try_assign_role(owner, roles[0]).unwrap();

        assert!(matches!(
            plan_situation(&g, s, &mut ScriptedRandom::zeros(), 1),
            Err(SearchError::BudgetExhausted { nodes: 1, .. })
        ));
        let plan = plan_situation(&g, s, &mut ScriptedRandom::zeros(), 3).unwrap();
        assert!(plan.truncated);
        assert_eq!(plan.assignments.len(), 2);
    }

    #[test]
    fn ties_are_broken_by_the_random_source() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let a = g.add_character(AgeRange::default());
        let b = g.add_character(AgeRange::default());
        let (s, roles) = open_situation(&mut g, 2);
        g.try_assign_role(owner, roles[0]).unwrap();

        let first = plan_situation(&g, s, &mut ScriptedRandom::new(&[0]), 1000).unwrap();
        let second = plan_situation(&g, s, &mut ScriptedRandom::new(&[1]), 1000).unwrap();
        assert_eq!(first.assignments, vec![(roles[1], a)]);
        assert_eq!(second.assignments, vec![(roles[1], b)]);
    }

    #[test]
    fn global_pass_fills_what_owner_order_strands() {
        // Three owners, one open role each. Filling situation 0 then 1 in
        // order can leave situation 2 with only its own owner free.
        let mut g = CastGraph::new();
        let mut open = Vec::new();
        for _ in 0..3 {
            let c = g.add_character(AgeRange::default());
            let (s, roles) = open_situation(&mut g, 2);
            g.try_assign_role(c, roles[0]).unwrap();
            g.set_owner(s, c);
            open.push(roles[1]);
        }
        let (s0, s1) = (g.role(open[0]).situation, g.role(open[1]).situation);
        let mut greedy = g.clone();
        let mut rng = ScriptedRandom::zeros();
        fill_situation(&mut greedy, s0, &mut rng, 1000).unwrap();
        fill_situation(&mut greedy, s1, &mut rng, 1000).unwrap();
        assert_eq!(greedy.open_living_roles(), vec![open[2]]);
        assert!(candidates_for(&greedy, open[2]).is_empty());

        let plan = fill_open_roles(&mut g, &mut ScriptedRandom::zeros(), 1000).unwrap();
        assert_eq!(plan.assignments.len(), 3);
        assert!(plan.skipped.is_empty());
        assert!(g.open_living_roles().is_empty());
        assert!(g.characters.iter().all(|c| c.assigned_roles.len() == 2));
    }

    #[test]
    fn global_pass_leaves_unfillable_roles_open() {
        let mut g = CastGraph::new();
        let owner = g.add_character(AgeRange::default());
        let only = g.add_character(AgeRange::default());
        let (s, roles) = open_situation(&mut g, 3);
        g.try_assign_role(owner, roles[0]).unwrap();
        g.set_owner(s, owner);

        let plan = plan_open_roles(&g, &mut ScriptedRandom::zeros(), 1000).unwrap();
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].1, only);
        assert_eq!(plan.skipped.len(), 1);
        assert!(!plan.truncated);
    }

    #[test]
    fn global_pass_with_nothing_open() {
        let mut g = CastGraph::new();
        let c = g.add_character(AgeRange::default());
        let (_, roles) = open_situation(&mut g, 1);
        g.try_assign_role(c, roles[0]).unwrap();
        assert_eq!(
            plan_open_roles(&g, &mut ScriptedRandom::zeros(), 1000),
            Ok(SearchPlan::default())
        );
    }

    fn random_graph(seed: u64, characters: usize, roles: usize) -> (CastGraph, SituationId) {
        let mut rng = SeededRandom::new(seed);
        let mut g = CastGraph::new();
        for _ in 0..characters {
            g.add_character(AgeRange::default());
        }
        // Some side situations give characters existing edges.
        for c in 0..characters {
            let (_, side) = open_situation(&mut g, 2);
            let kind = [MARRIED, HATE, RelationKind::Outgoing(OutgoingKind::Love)][rng.range(3)];
            g.add_relation(side[0], kind, side[1]);
            let _ = g.try_assign_role(CharacterId(c), side[0]);
        }
        let (s, open) = open_situation(&mut g, roles);
        for i in 0..roles {
            let j = rng.range(roles);
            if i != j {
                let kind = [MARRIED, HATE][rng.range(2)];
                g.add_relation(open[i], kind, open[j]);
            }
        }
        (g, s)
    }

    proptest! {
        #[test]
        fn permutations_use_distinct_characters(seed in 0u64..500, roles in 1usize..4) {
            let (g, s) = random_graph(seed, 5, roles);
            let mut rng = SeededRandom::new(seed);
            if let Ok(plan) = plan_situation(&g, s, &mut rng, 10_000) {
                let used: HashSet<_> = plan.assignments.iter().map(|(_, c)| *c).collect();
                prop_assert_eq!(used.len(), plan.assignments.len());
                let roles: HashSet<_> = plan.assignments.iter().map(|(r, _)| *r).collect();
                prop_assert_eq!(roles.len(), plan.assignments.len());
            }
        }

        #[test]
        fn best_score_never_increases(seed in 0u64..500, roles in 1usize..4) {
            let (g, s) = random_graph(seed, 5, roles);
            let open: Vec<RoleCandidates> = g
                .unassigned_living_roles(s)
                .into_iter()
                .map(|role| RoleCandidates { role, characters: candidates_for(&g, role) })
                .filter(|rc| !rc.characters.is_empty())
                .collect();
            let mut search = Search::new(&open, 10_000);
            search.descend(&g, 0, 0);
            for pair in search.history.windows(2) {
                prop_assert!(pair[1] <= pair[0]);
            }
            if let (Some(best), Some(last)) = (search.best_score, search.history.last()) {
                prop_assert_eq!(best, *last);
            }
        }

        #[test]
        fn committed_plan_matches_simulation(seed in 0u64..300) {
            let (mut g, s) = random_graph(seed, 5, 2);
            let mut rng = SeededRandom::new(seed);
            if let Ok(plan) = fill_situation(&mut g, s, &mut rng, 10_000) {
                for (role, character) in &plan.assignments {
                    prop_assert_eq!(g.role(*role).assigned, Some(*character));
                }
                for c in &g.characters {
                    prop_assert!(c.assigned_roles.len() <= crate::core::graph::MAX_ROLES_PER_CHARACTER);
                }
            }
        }
    }
}
