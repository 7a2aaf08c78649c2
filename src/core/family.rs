/// Family grouping and derived kinship.
///
/// Characters joined by familial or marital edges, directly or through a
/// chain, share a family id. Derived kinship composes two resolved familial
/// hops into an indirect fact ("grandfather of D through B").

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::graph::CastGraph;
use crate::core::kinship::compose;
use crate::schema::character::CharacterId;
use crate::schema::relation::{FamilialKind, RelationKind};

/// Union-find over dense indices with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// Partition characters into families and record each character's
/// `family_id`. Ids are dense, numbered in order of first appearance.
/// Returns the number of families.
pub fn group_families(graph: &mut CastGraph) -> usize {
    let mut sets = DisjointSet::new(graph.characters.len());
    for character in &graph.characters {
        for edge in graph.edges_of(character.id) {
            if !edge.kind.links_family() {
                continue;
            }
            if let Some(target) = edge.target_character {
                sets.union(character.id.0, target.0);
            }
        }
    }

    let mut ids: Vec<Option<usize>> = vec![None; graph.characters.len()];
    let mut count = 0;
    for i in 0..graph.characters.len() {
        let root = sets.find(i);
        let family = *ids[root].get_or_insert_with(|| {
            count += 1;
            count - 1
        });
        graph.set_family(CharacterId(i), family);
    }
    info!(characters = graph.characters.len(), families = count, "families grouped");
    count
}

/// A kinship fact inferred from two hops: `from` is `kind` of `to`,
/// by way of `via`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedKinship {
    pub from: CharacterId,
    pub via: CharacterId,
    pub to: CharacterId,
    pub kind: FamilialKind,
}

fn familial_edges(graph: &CastGraph, c: CharacterId) -> Vec<(FamilialKind, CharacterId)> {
    graph
        .edges_of(c)
        .filter_map(|e| match (e.kind, e.target_character) {
            (RelationKind::Familial(kind), Some(target)) => Some((kind, target)),
            _ => None,
        })
        .collect()
}

/// Compose every resolved two-hop familial chain C → B → D.
///
/// A result is kept when it asserts real kinship and C has no direct
/// familial edge to D already. The first chain found for a pair wins.
pub fn derive_kinship(graph: &CastGraph) -> Vec<DerivedKinship> {
    let edges: Vec<_> = graph
        .characters
        .iter()
        .map(|c| familial_edges(graph, c.id))
        .collect();

    let mut derived: Vec<DerivedKinship> = Vec::new();
    for (c, own) in edges.iter().enumerate() {
        let from = CharacterId(c);
        for &(first, via) in own {
            for &(second, to) in &edges[via.0] {
                if to == from {
                    continue;
                }
                let kind = compose(first, second);
                if !kind.is_kin() {
                    continue;
                }
                if own.iter().any(|(_, t)| *t == to) {
                    continue;
                }
                if derived.iter().any(|d| d.from == from && d.to == to) {
                    continue;
                }
                derived.push(DerivedKinship { from, via, to, kind });
            }
        }
    }
    derived
}
