/// Situation resolution: collapse a template's expression tree into a
/// concrete role list, then instantiate it into the cast graph.

use tracing::debug;

use crate::core::graph::{CastGraph, SituationId};
use crate::core::random::RandomSource;
use crate::schema::template::{
    ExpressionNode, RoleTemplateId, SituationTemplateId, TemplateError, TemplateLibrary,
};

/// Evaluate a situation template's expression tree.
///
/// `And` concatenates its present children, `Or` picks one present child
/// uniformly, a role leaf yields itself. A missing root or an empty result
/// is an error; the caller retries with another template.
pub fn resolve<R: RandomSource>(
    library: &TemplateLibrary,
    template: SituationTemplateId,
    rng: &mut R,
) -> Result<Vec<RoleTemplateId>, TemplateError> {
    let situation = library.situation(template);
    let root = situation
        .root
        .as_ref()
        .ok_or_else(|| TemplateError::NullRoot(situation.id.clone()))?;

    let mut roles = Vec::new();
    evaluate(root, rng, &mut roles);
    if roles.is_empty() {
        return Err(TemplateError::EmptyResolution(situation.id.clone()));
    }
    Ok(roles)
}

fn evaluate<R: RandomSource>(node: &ExpressionNode, rng: &mut R, out: &mut Vec<RoleTemplateId>) {
    match node {
        ExpressionNode::Role(id) => out.push(*id),
        ExpressionNode::And(children) => {
            for child in children.iter().flatten() {
                evaluate(child, rng, out);
            }
        }
        ExpressionNode::Or(children) => {
            let present: Vec<&ExpressionNode> = children.iter().flatten().collect();
            if !present.is_empty() {
                let chosen = present[rng.range(present.len())];
                evaluate(chosen, rng, out);
            }
        }
    }
}

/// Create a situation instance with one role instance per resolved role
/// template and wire the relation templates between sibling roles.
///
/// A relation whose target template did not make it into `resolved`
/// produces no edge.
pub fn instantiate(
    graph: &mut CastGraph,
    library: &TemplateLibrary,
    template: SituationTemplateId,
    resolved: &[RoleTemplateId],
) -> SituationId {
    let situation = graph.add_situation(template);
    let roles: Vec<_> = resolved
        .iter()
        .map(|id| graph.add_role(situation, *id, library.role(*id).constraints))
        .collect();

    let mut edges = 0;
    for (i, source) in roles.iter().enumerate() {
        for relation in &library.role(resolved[i]).relations {
            let target = resolved
                .iter()
                .enumerate()
                .find(|(j, id)| *j != i && **id == relation.target)
                .map(|(j, _)| roles[j]);
            if let Some(target) = target {
                graph.add_relation(*source, relation.kind, target);
                edges += 1;
            }
        }
    }

    debug!(
        situation = situation.0,
        template = %library.situation(template).id,
        roles = roles.len(),
        edges,
        "situation instantiated"
    );
    situation
}
