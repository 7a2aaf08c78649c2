/// The cast graph: an index-addressed arena of characters, situation
/// instances, role instances and relation instances, plus the role-binding
/// engine that keeps it consistent.
///
/// Every cross reference is an index, so `Clone` yields a fully independent
/// copy that speculative search can mutate freely.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::schema::character::{AgeRange, CharacterId, GenderSet};
use crate::schema::relation::{FamilialKind, RelationKind};
use crate::schema::template::{RoleConstraints, RoleTemplateId, SituationTemplateId};

/// A character may play roles in at most this many situations at once.
pub const MAX_ROLES_PER_CHARACTER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SituationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("role {0:?} is already assigned")]
    RoleTaken(RoleId),
    #[error("character {0:?} already plays the maximum number of roles")]
    CapacityReached(CharacterId),
    #[error("character {0:?} already plays a role in situation {1:?}")]
    SameSituation(CharacterId, SituationId),
    #[error("aliveness of character {0:?} does not match role {1:?}")]
    AlivenessMismatch(CharacterId, RoleId),
    #[error("age range of character {0:?} does not overlap role {1:?}")]
    AgeMismatch(CharacterId, RoleId),
    #[error("genders of character {0:?} do not intersect role {1:?}")]
    GenderMismatch(CharacterId, RoleId),
    #[error("relation {kind:?} conflicts with the relations of character {character:?}")]
    RelationConflict {
        character: CharacterId,
        kind: RelationKind,
    },
}

/// Result of checking one edge against a character's existing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// A new distinct edge, safe to add.
    Compatible,
    /// The same edge already exists; nothing to add.
    Redundant,
    /// The edge contradicts an existing one.
    Incompatible,
}

/// Bookkeeping of a committed assignment, used by the search cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assignment {
    /// Dangling edges pointing at the role that now reach a character.
    pub delta_resolved: usize,
    /// New edges whose target role is still unassigned.
    pub delta_pending: usize,
}

impl Assignment {
    pub fn cost(&self) -> i64 {
        self.delta_pending as i64 - self.delta_resolved as i64
    }
}

/// One resolved dramatic situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationInstance {
    pub id: SituationId,
    pub template: SituationTemplateId,
    pub roles: Vec<RoleId>,
    /// The character seeded into this situation's primary role.
    pub owner: Option<CharacterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInstance {
    pub id: RoleId,
    /// Ordinal inside the owning situation.
    pub index: usize,
    pub template: RoleTemplateId,
    pub situation: SituationId,
    pub constraints: RoleConstraints,
    pub assigned: Option<CharacterId>,
    pub outgoing: Vec<RelationId>,
    pub incoming: Vec<RelationId>,
}

impl RoleInstance {
    pub fn is_dead(&self) -> bool {
        self.constraints.is_dead
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationInstance {
    pub id: RelationId,
    pub kind: RelationKind,
    pub source: RoleId,
    pub target: RoleId,
    /// Filled once the target role is assigned.
    pub target_character: Option<CharacterId>,
    /// Filled once the source role is assigned.
    pub owner: Option<CharacterId>,
}

/// Mutable per-character state accumulated while roles are bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConstraints {
    pub id: CharacterId,
    pub is_dead: bool,
    pub ages: AgeRange,
    pub genders: GenderSet,
    pub assigned_roles: Vec<RoleId>,
    /// Distinct edges owned by this character, from all its roles.
    pub relations: Vec<RelationId>,
    pub family_id: Option<usize>,
}

/// The light view of an edge used by compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeView {
    pub kind: RelationKind,
    pub target_role: RoleId,
    pub target_character: Option<CharacterId>,
}

impl EdgeView {
    fn same_target(&self, other: &EdgeView) -> bool {
        match (self.target_character, other.target_character) {
            (Some(a), Some(b)) => a == b,
            _ => self.target_role == other.target_role,
        }
    }
}

/// Compare a candidate edge with one existing edge of the same character.
///
/// Familial `Unspecified` is one-sided: a new unspecified edge next to any
/// familial edge is redundant, while a concrete kind next to an existing
/// unspecified edge is a compatible refinement. `Unrelated` behaves like any
/// other concrete kind and clashes with real kinship.
pub fn compare_edges(existing: &EdgeView, candidate: &EdgeView) -> Integration {
    use RelationKind::*;

    if existing.same_target(candidate) {
        if existing.kind == candidate.kind {
            return Integration::Redundant;
        }
        return match (existing.kind, candidate.kind) {
            (Familial(_), Familial(FamilialKind::Unspecified)) => Integration::Redundant,
            (Familial(FamilialKind::Unspecified), Familial(_)) => Integration::Compatible,
            (Familial(_), Familial(_))
            | (Marital(_), Marital(_))
            | (Outgoing(_), Outgoing(_))
            | (Incoming(_), Incoming(_)) => Integration::Incompatible,
            _ => Integration::Compatible,
        };
    }

    if candidate.kind.is_exclusive() && existing.kind == candidate.kind {
        Integration::Incompatible
    } else {
        Integration::Compatible
    }
}

/// Check a candidate edge against every existing edge of a character.
pub fn integrate(existing: &[EdgeView], candidate: &EdgeView) -> Integration {
    let mut outcome = Integration::Compatible;
    for edge in existing {
        match compare_edges(edge, candidate) {
            Integration::Incompatible => return Integration::Incompatible,
            Integration::Redundant => outcome = Integration::Redundant,
            Integration::Compatible => {}
        }
    }
    outcome
}

/// Every mutation a successful assignment will perform, computed up front.
#[derive(Debug)]
struct AssignmentPlan {
    character: CharacterId,
    role: RoleId,
    ages: AgeRange,
    genders: GenderSet,
    added: Vec<RelationId>,
    delta_resolved: usize,
    delta_pending: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastGraph {
    pub characters: Vec<CharacterConstraints>,
    pub situations: Vec<SituationInstance>,
    pub roles: Vec<RoleInstance>,
    pub relations: Vec<RelationInstance>,
}

impl CastGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a living, unconstrained character.
    pub fn add_character(&mut self, ages: AgeRange) -> CharacterId {
        let id = CharacterId(self.characters.len());
        self.characters.push(CharacterConstraints {
            id,
            is_dead: false,
            ages,
            genders: GenderSet::any(),
            assigned_roles: Vec::new(),
            relations: Vec::new(),
            family_id: None,
        });
        id
    }

    pub fn add_situation(&mut self, template: SituationTemplateId) -> SituationId {
        let id = SituationId(self.situations.len());
        self.situations.push(SituationInstance {
            id,
            template,
            roles: Vec::new(),
            owner: None,
        });
        id
    }

    pub fn add_role(
        &mut self,
        situation: SituationId,
        template: RoleTemplateId,
        constraints: RoleConstraints,
    ) -> RoleId {
        let id = RoleId(self.roles.len());
        let index = self.situations[situation.0].roles.len();
        self.roles.push(RoleInstance {
            id,
            index,
            template,
            situation,
            constraints,
            assigned: None,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        self.situations[situation.0].roles.push(id);
        id
    }

    /// Wire an edge between two roles of the same situation.
    pub fn add_relation(&mut self, source: RoleId, kind: RelationKind, target: RoleId) -> RelationId {
        let id = RelationId(self.relations.len());
        self.relations.push(RelationInstance {
            id,
            kind,
            source,
            target,
            target_character: self.roles[target.0].assigned,
            owner: self.roles[source.0].assigned,
        });
        self.roles[source.0].outgoing.push(id);
        self.roles[target.0].incoming.push(id);
        id
    }

    /// Record the character seeded into a situation's primary role.
    pub fn set_owner(&mut self, situation: SituationId, character: CharacterId) {
        self.situations[situation.0].owner = Some(character);
    }

    pub fn set_family(&mut self, character: CharacterId, family: usize) {
        self.characters[character.0].family_id = Some(family);
    }

    pub fn character(&self, id: CharacterId) -> &CharacterConstraints {
        &self.characters[id.0]
    }

    pub fn situation(&self, id: SituationId) -> &SituationInstance {
        &self.situations[id.0]
    }

    pub fn role(&self, id: RoleId) -> &RoleInstance {
        &self.roles[id.0]
    }

    pub fn relation(&self, id: RelationId) -> &RelationInstance {
        &self.relations[id.0]
    }

    /// Edges currently owned by a character.
    pub fn edges_of(&self, character: CharacterId) -> impl Iterator<Item = &RelationInstance> + '_ {
        self.characters[character.0]
            .relations
            .iter()
            .map(move |id| &self.relations[id.0])
    }

    /// Living roles of a situation that nobody plays yet.
    pub fn unassigned_living_roles(&self, situation: SituationId) -> Vec<RoleId> {
        self.situations[situation.0]
            .roles
            .iter()
            .copied()
            .filter(|r| {
                let role = &self.roles[r.0];
                !role.is_dead() && !role.is_assigned()
            })
            .collect()
    }

    /// Living roles still waiting for a character, across every situation.
    pub fn open_living_roles(&self) -> Vec<RoleId> {
        self.roles
            .iter()
            .filter(|role| !role.is_dead() && !role.is_assigned())
            .map(|role| role.id)
            .collect()
    }

    /// Roles left without a character.
    pub fn phantom_roles(&self) -> impl Iterator<Item = &RoleInstance> + '_ {
        self.roles.iter().filter(|r| !r.is_assigned())
    }

    fn edge_view(&self, relation: &RelationInstance) -> EdgeView {
        EdgeView {
            kind: relation.kind,
            target_role: relation.target,
            target_character: self.roles[relation.target.0].assigned,
        }
    }

    fn edge_views(&self, character: CharacterId, skip: Option<RelationId>) -> Vec<EdgeView> {
        self.characters[character.0]
            .relations
            .iter()
            .filter(|id| Some(**id) != skip)
            .map(|id| self.edge_view(&self.relations[id.0]))
            .collect()
    }

    /// Bind a character to a role.
    ///
    /// Every check runs before anything is written, so a failed attempt
    /// leaves the graph untouched.
    pub fn try_assign_role(
        &mut self,
        character: CharacterId,
        role: RoleId,
    ) -> Result<Assignment, AssignError> {
        match self.plan_assignment(character, role) {
            Ok(plan) => {
                let outcome = self.apply(plan);
                debug!(
                    character = character.0,
                    role = role.0,
                    resolved = outcome.delta_resolved,
                    pending = outcome.delta_pending,
                    "role assigned"
                );
                Ok(outcome)
            }
            Err(e) => {
                debug!(character = character.0, role = role.0, error = %e, "assignment rejected");
                Err(e)
            }
        }
    }

    /// Run `try_assign_role` on a deep copy, leaving `self` as it was.
    pub fn simulate_assignment(
        &self,
        character: CharacterId,
        role: RoleId,
    ) -> Result<(CastGraph, Assignment), AssignError> {
        let mut copy = self.clone();
        let outcome = copy.try_assign_role(character, role)?;
        Ok((copy, outcome))
    }

    fn plan_assignment(
        &self,
        character: CharacterId,
        role_id: RoleId,
    ) -> Result<AssignmentPlan, AssignError> {
        let role = &self.roles[role_id.0];
        let ch = &self.characters[character.0];

        if role.is_assigned() {
            return Err(AssignError::RoleTaken(role_id));
        }
        if ch.assigned_roles.len() >= MAX_ROLES_PER_CHARACTER {
            return Err(AssignError::CapacityReached(character));
        }
        if ch
            .assigned_roles
            .iter()
            .any(|r| self.roles[r.0].situation == role.situation)
        {
            return Err(AssignError::SameSituation(character, role.situation));
        }
        if ch.is_dead != role.constraints.is_dead {
            return Err(AssignError::AlivenessMismatch(character, role_id));
        }
        let ages = ch
            .ages
            .intersect(&role.constraints.ages)
            .ok_or(AssignError::AgeMismatch(character, role_id))?;
        let genders = ch.genders.intersect(&role.constraints.genders);
        if genders.is_empty() {
            return Err(AssignError::GenderMismatch(character, role_id));
        }

        let mut plan = AssignmentPlan {
            character,
            role: role_id,
            ages,
            genders,
            added: Vec::new(),
            delta_resolved: 0,
            delta_pending: 0,
        };

        // Outgoing edges join this character's set.
        let mut own = self.edge_views(character, None);
        for rel_id in &role.outgoing {
            let view = self.edge_view(&self.relations[rel_id.0]);
            match integrate(&own, &view) {
                Integration::Incompatible => {
                    return Err(AssignError::RelationConflict {
                        character,
                        kind: view.kind,
                    })
                }
                Integration::Redundant => {}
                Integration::Compatible => {
                    if view.target_character.is_none() {
                        plan.delta_pending += 1;
                    }
                    own.push(view);
                    plan.added.push(*rel_id);
                }
            }
        }

        // Incoming edges of already-cast roles now reach this character;
        // re-check them from their owner's side.
        let mut owner_views: FxHashMap<CharacterId, Vec<(RelationId, EdgeView)>> =
            FxHashMap::default();
        for rel_id in &role.incoming {
            let relation = &self.relations[rel_id.0];
            let Some(owner) = relation.owner else {
                continue;
            };
            if !self.characters[owner.0].relations.contains(rel_id) {
                continue;
            }

            let views = owner_views.entry(owner).or_insert_with(|| {
                self.characters[owner.0]
                    .relations
                    .iter()
                    .map(|id| (*id, self.edge_view(&self.relations[id.0])))
                    .collect()
            });
            let resolved = EdgeView {
                kind: relation.kind,
                target_role: role_id,
                target_character: Some(character),
            };
            let others: Vec<EdgeView> = views
                .iter()
                .filter(|(id, _)| id != rel_id)
                .map(|(_, v)| *v)
                .collect();

            match integrate(&others, &resolved) {
                Integration::Incompatible => {
                    return Err(AssignError::RelationConflict {
                        character: owner,
                        kind: relation.kind,
                    })
                }
                Integration::Redundant | Integration::Compatible => {
                    if let Some(entry) = views.iter_mut().find(|(id, _)| id == rel_id) {
                        entry.1 = resolved;
                    }
                }
            }
            plan.delta_resolved += 1;
        }

        Ok(plan)
    }

    fn apply(&mut self, plan: AssignmentPlan) -> Assignment {
        let AssignmentPlan {
            character,
            role,
            ages,
            genders,
            added,
            delta_resolved,
            delta_pending,
        } = plan;

        self.roles[role.0].assigned = Some(character);

        let outgoing = self.roles[role.0].outgoing.clone();
        for rel_id in outgoing {
            let target = self.relations[rel_id.0].target;
            let target_character = self.roles[target.0].assigned;
            let relation = &mut self.relations[rel_id.0];
            relation.owner = Some(character);
            relation.target_character = target_character;
        }

        let incoming = self.roles[role.0].incoming.clone();
        for rel_id in incoming {
            self.relations[rel_id.0].target_character = Some(character);
        }

        let ch = &mut self.characters[character.0];
        ch.assigned_roles.push(role);
        ch.relations.extend(added);
        ch.ages = ages;
        ch.genders = genders;

        Assignment {
            delta_resolved,
            delta_pending,
        }
    }
}
