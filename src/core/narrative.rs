/// Relation text for the finished cast.
///
/// Each owned edge becomes one line such as "Father of Ada" or "Hates
/// Bertram". Edges that point at a phantom role are described through the
/// phantom's own resolved edges instead, e.g. "Murdered the daughter of Ada".

use crate::core::family::DerivedKinship;
use crate::core::graph::{CastGraph, RelationInstance, RoleId};
use crate::schema::character::{CharacterId, Gender};
use crate::schema::relation::{
    CrimeKind, FamilialKind, IncomingKind, MaritalKind, OutgoingKind, RelationKind,
};

/// What the narrative layer needs to know about a finalized character.
#[derive(Debug, Clone, Copy)]
pub struct Persona<'a> {
    pub name: &'a str,
    pub gender: Gender,
}

/// Gender-aware kinship label: what the source is to the target.
pub fn kinship_label(kind: FamilialKind, gender: Option<Gender>) -> &'static str {
    use FamilialKind::*;
    use Gender::*;

    match (kind, gender) {
        (Parent, Some(Male)) => "Father",
        (Parent, Some(Female)) => "Mother",
        (Parent, None) => "Parent",
        (Child, Some(Male)) => "Son",
        (Child, Some(Female)) => "Daughter",
        (Child, None) => "Child",
        (Sibling, Some(Male)) => "Brother",
        (Sibling, Some(Female)) => "Sister",
        (Sibling, None) => "Sibling",
        (Avuncular, Some(Male)) => "Uncle",
        (Avuncular, Some(Female)) => "Aunt",
        (Avuncular, None) => "Aunt or uncle",
        (Nibling, Some(Male)) => "Nephew",
        (Nibling, Some(Female)) => "Niece",
        (Nibling, None) => "Niece or nephew",
        (Grandparent, Some(Male)) => "Grandfather",
        (Grandparent, Some(Female)) => "Grandmother",
        (Grandparent, None) => "Grandparent",
        (Grandchild, Some(Male)) => "Grandson",
        (Grandchild, Some(Female)) => "Granddaughter",
        (Grandchild, None) => "Grandchild",
        (GrandAvuncular, Some(Male)) => "Great-uncle",
        (GrandAvuncular, Some(Female)) => "Great-aunt",
        (GrandAvuncular, None) => "Great-aunt or great-uncle",
        (GrandNibling, Some(Male)) => "Great-nephew",
        (GrandNibling, Some(Female)) => "Great-niece",
        (GrandNibling, None) => "Great-niece or great-nephew",
        (Cousin, _) => "Cousin",
        (Unspecified, _) => "Relative",
        (Unrelated, _) => "Unrelated",
    }
}

/// The verb phrase that precedes the target's name, or `None` for edges
/// that state nothing (`MaritalKind::None`).
pub fn relation_phrase(kind: RelationKind, gender: Option<Gender>) -> Option<String> {
    let phrase = match kind {
        RelationKind::Familial(FamilialKind::Unrelated) => "Unrelated to".to_string(),
        RelationKind::Familial(k) => format!("{} of", kinship_label(k, gender)),
        RelationKind::Marital(MaritalKind::None) => return None,
        RelationKind::Marital(MaritalKind::Married) => "Married to".to_string(),
        RelationKind::Marital(MaritalKind::Divorced) => "Divorced from".to_string(),
        RelationKind::Outgoing(k) => match k {
            OutgoingKind::Love => "Loves",
            OutgoingKind::Like => "Likes",
            OutgoingKind::Hate => "Hates",
            OutgoingKind::Rivalry => "Rival of",
        }
        .to_string(),
        RelationKind::Incoming(k) => match k {
            IncomingKind::Loved => "Loved by",
            IncomingKind::Liked => "Liked by",
            IncomingKind::Hated => "Hated by",
            IncomingKind::Rivaled => "Rivaled by",
        }
        .to_string(),
        RelationKind::Crime(k) => match k {
            CrimeKind::Murder => "Murdered",
            CrimeKind::Murdered => "Was murdered by",
            CrimeKind::Adultery => "Committed adultery with",
        }
        .to_string(),
    };
    Some(phrase)
}

/// The noun naming what the source of `kind` is to its target, used when
/// describing a phantom ("the daughter of Ada").
fn relation_noun(kind: RelationKind, gender: Option<Gender>) -> Option<String> {
    let noun = match kind {
        RelationKind::Familial(FamilialKind::Unrelated) => return None,
        RelationKind::Familial(k) => kinship_label(k, gender).to_lowercase(),
        RelationKind::Marital(MaritalKind::None) => return None,
        RelationKind::Marital(MaritalKind::Married) => "spouse".to_string(),
        RelationKind::Marital(MaritalKind::Divorced) => "former spouse".to_string(),
        RelationKind::Crime(CrimeKind::Murder) => "killer".to_string(),
        RelationKind::Crime(CrimeKind::Murdered) => "victim".to_string(),
        RelationKind::Crime(CrimeKind::Adultery) => "lover".to_string(),
        RelationKind::Incoming(IncomingKind::Loved) => "beloved".to_string(),
        RelationKind::Incoming(IncomingKind::Liked) | RelationKind::Outgoing(OutgoingKind::Like) => {
            "friend".to_string()
        }
        RelationKind::Incoming(IncomingKind::Hated) | RelationKind::Outgoing(OutgoingKind::Hate) => {
            "enemy".to_string()
        }
        RelationKind::Incoming(IncomingKind::Rivaled)
        | RelationKind::Outgoing(OutgoingKind::Rivalry) => "rival".to_string(),
        RelationKind::Outgoing(OutgoingKind::Love) => "admirer".to_string(),
    };
    Some(noun)
}

/// Describe the phantom role `phantom` as seen by `viewer`.
///
/// A `Murdered` edge on the phantom names its killer; the phantom itself is
/// labeled through its highest-priority resolved edge to someone other than
/// the viewer. Without any such edge it is "a stranger".
fn describe_phantom(
    graph: &CastGraph,
    people: &[Persona],
    viewer: CharacterId,
    phantom: RoleId,
) -> String {
    let role = graph.role(phantom);
    let gender = role.constraints.genders.single();
    let resolved: Vec<&RelationInstance> = role
        .outgoing
        .iter()
        .map(|id| graph.relation(*id))
        .filter(|r| r.target_character.is_some())
        .collect();

    let murderer = resolved.iter().find_map(|r| match (r.kind, r.target_character) {
        (RelationKind::Crime(CrimeKind::Murdered), Some(killer)) => Some(killer),
        _ => None,
    });

    let mut labels: Vec<(u8, String)> = resolved
        .iter()
        .filter_map(|r| {
            let target = r.target_character?;
            if target == viewer || r.kind == RelationKind::Crime(CrimeKind::Murdered) {
                return None;
            }
            let noun = relation_noun(r.kind, gender)?;
            Some((r.kind.attribution_rank(), format!("the {} of {}", noun, people[target.0].name)))
        })
        .collect();
    labels.sort_by_key(|(rank, _)| *rank);

    let mut text = labels
        .into_iter()
        .next()
        .map(|(_, label)| label)
        .unwrap_or_else(|| "a stranger".to_string());
    if let Some(killer) = murderer {
        if killer != viewer {
            text.push_str(&format!(", murdered by {}", people[killer.0].name));
        }
    }
    text
}

/// Render one line per edge owned by `character`, followed by derived
/// kinship facts it is the subject of.
pub fn describe_character(
    graph: &CastGraph,
    people: &[Persona],
    character: CharacterId,
    derived: &[DerivedKinship],
) -> Vec<String> {
    let gender = Some(people[character.0].gender);
    let mut lines = Vec::new();

    for edge in graph.edges_of(character) {
        let Some(phrase) = relation_phrase(edge.kind, gender) else {
            continue;
        };
        let target = match edge.target_character {
            Some(target) => people[target.0].name.to_string(),
            None => describe_phantom(graph, people, character, edge.target),
        };
        let line = format!("{} {}", phrase, target);
        // Two situations can resolve to the same fact about the same person.
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    for fact in derived.iter().filter(|d| d.from == character) {
        lines.push(format!(
            "{} of {} (through {})",
            kinship_label(fact.kind, gender),
            people[fact.to.0].name,
            people[fact.via.0].name
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::character::{AgeRange, GenderSet};
    use crate::schema::template::{RoleConstraints, RoleTemplateId, SituationTemplateId};

    const PEOPLE: [Persona<'static>; 3] = [
        Persona { name: "Ada", gender: Gender::Female },
        Persona { name: "Bertram", gender: Gender::Male },
        Persona { name: "Cora", gender: Gender::Female },
    ];

    fn dead_role(genders: GenderSet) -> RoleConstraints {
        RoleConstraints {
            is_dead: true,
            genders,
            ..RoleConstraints::default()
        }
    }

    #[test]
    fn kinship_labels_follow_gender() {
        assert_eq!(kinship_label(FamilialKind::Parent, Some(Gender::Male)), "Father");
        assert_eq!(kinship_label(FamilialKind::Nibling, Some(Gender::Female)), "Niece");
        assert_eq!(kinship_label(FamilialKind::GrandAvuncular, Some(Gender::Male)), "Great-uncle");
        assert_eq!(kinship_label(FamilialKind::Cousin, Some(Gender::Female)), "Cousin");
        assert_eq!(kinship_label(FamilialKind::Child, None), "Child");
    }

    #[test]
    fn phrases() {
        let married = RelationKind::Marital(MaritalKind::Married);
        assert_eq!(relation_phrase(married, None).as_deref(), Some("Married to"));
        assert_eq!(relation_phrase(RelationKind::Marital(MaritalKind::None), None), None);
        assert_eq!(
            relation_phrase(RelationKind::Incoming(IncomingKind::Hated), None).as_deref(),
            Some("Hated by")
        );
        assert_eq!(
            relation_phrase(RelationKind::Familial(FamilialKind::Sibling), Some(Gender::Female))
                .as_deref(),
            Some("Sister of")
        );
    }

    #[test]
    fn resolved_edges_name_their_targets() {
        let mut g = CastGraph::new();
        let ada = g.add_character(AgeRange::default());
        let bertram = g.add_character(AgeRange::default());
        let s = g.add_situation(SituationTemplateId(0));
        let a = g.add_role(s, RoleTemplateId(0), RoleConstraints::default());
        let b = g.add_role(s, RoleTemplateId(1), RoleConstraints::default());
        g.add_relation(a, RelationKind::Familial(FamilialKind::Parent), b);
        g.add_relation(b, RelationKind::Outgoing(OutgoingKind::Hate), a);
        g.try_assign_role(ada, a).unwrap();
        g.try_assign_role(bertram, b).unwrap();

        assert_eq!(describe_character(&g, &PEOPLE, ada, &[]), vec!["Mother of Bertram"]);
        assert_eq!(describe_character(&g, &PEOPLE, bertram, &[]), vec!["Hates Ada"]);
    }

    #[test]
    fn repeated_fact_is_printed_once() {
        let hate = RelationKind::Outgoing(OutgoingKind::Hate);
        let mut g = CastGraph::new();
        let ada = g.add_character(AgeRange::default());
        let bertram = g.add_character(AgeRange::default());
        for _ in 0..2 {
            let s = g.add_situation(SituationTemplateId(0));
            let a = g.add_role(s, RoleTemplateId(0), RoleConstraints::default());
            let b = g.add_role(s, RoleTemplateId(1), RoleConstraints::default());
            g.add_relation(a, hate, b);
            g.try_assign_role(ada, a).unwrap();
            g.try_assign_role(bertram, b).unwrap();
        }

        assert_eq!(g.edges_of(ada).count(), 2);
        assert_eq!(describe_character(&g, &PEOPLE, ada, &[]), vec!["Hates Bertram"]);
    }

    #[test]
    fn murdered_phantom_is_described_through_its_kin() {
        let mut g = CastGraph::new();
        let ada = g.add_character(AgeRange::default());
        let bertram = g.add_character(AgeRange::default());
        let s = g.add_situation(SituationTemplateId(0));
        let killer = g.add_role(s, RoleTemplateId(0), RoleConstraints::default());
        let victim = g.add_role(s, RoleTemplateId(1), dead_role(GenderSet::only(Gender::Female)));
        let mother = g.add_role(s, RoleTemplateId(2), RoleConstraints::default());
        g.add_relation(killer, RelationKind::Crime(CrimeKind::Murder), victim);
        g.add_relation(victim, RelationKind::Crime(CrimeKind::Murdered), killer);
        g.add_relation(victim, RelationKind::Familial(FamilialKind::Child), mother);
        g.try_assign_role(bertram, killer).unwrap();
        g.try_assign_role(ada, mother).unwrap();

        assert_eq!(
            describe_character(&g, &PEOPLE, bertram, &[]),
            vec!["Murdered the daughter of Ada"]
        );
    }

    #[test]
    fn phantom_with_a_foreign_killer() {
        let mut g = CastGraph::new();
        let ada = g.add_character(AgeRange::default());
        let _bertram = g.add_character(AgeRange::default());
        let cora = g.add_character(AgeRange::default());
        let s = g.add_situation(SituationTemplateId(0));
        let mourner = g.add_role(s, RoleTemplateId(0), RoleConstraints::default());
        let father = g.add_role(s, RoleTemplateId(1), dead_role(GenderSet::only(Gender::Male)));
        let killer = g.add_role(s, RoleTemplateId(2), RoleConstraints::default());
        g.add_relation(mourner, RelationKind::Familial(FamilialKind::Child), father);
        g.add_relation(father, RelationKind::Crime(CrimeKind::Murdered), killer);
        g.try_assign_role(ada, mourner).unwrap();
        g.try_assign_role(cora, killer).unwrap();

        assert_eq!(
            describe_character(&g, &PEOPLE, ada, &[]),
            vec!["Daughter of a stranger, murdered by Cora"]
        );
    }

    #[test]
    fn unknown_victim_is_a_stranger() {
        let mut g = CastGraph::new();
        let ada = g.add_character(AgeRange::default());
        let bertram = g.add_character(AgeRange::default());
        let s = g.add_situation(SituationTemplateId(0));
        let killer = g.add_role(s, RoleTemplateId(0), RoleConstraints::default());
        let victim = g.add_role(s, RoleTemplateId(1), dead_role(GenderSet::any()));
        g.add_relation(killer, RelationKind::Crime(CrimeKind::Murder), victim);
        g.try_assign_role(bertram, killer).unwrap();

        assert!(describe_character(&g, &PEOPLE, ada, &[]).is_empty());
        assert_eq!(
            describe_character(&g, &PEOPLE, bertram, &[]),
            vec!["Murdered a stranger"]
        );
    }

    #[test]
    fn derived_kinship_mentions_the_intermediary() {
        let g = {
            let mut g = CastGraph::new();
            for _ in 0..3 {
                g.add_character(AgeRange::default());
            }
            g
        };
        let derived = [DerivedKinship {
            from: CharacterId(1),
            via: CharacterId(0),
            to: CharacterId(2),
            kind: FamilialKind::Grandparent,
        }];
        assert_eq!(
            describe_character(&g, &PEOPLE, CharacterId(1), &derived),
            vec!["Grandfather of Cora (through Ada)"]
        );
    }
}
