/// Immutable dramatic-situation templates and their RON loader.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use super::character::{AgeRange, GenderSet};
use super::relation::{RelationKind, RelationTemplate};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("situation '{0}' has no root expression")]
    NullRoot(String),
    #[error("situation '{0}' resolved to no roles")]
    EmptyResolution(String),
    #[error("unknown role '{role}' referenced from {context}")]
    UnknownRole { role: String, context: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Index of a role template inside a `TemplateLibrary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleTemplateId(pub usize);

/// Index of a situation template inside a `TemplateLibrary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SituationTemplateId(pub usize);

/// The constraints a role places on whoever plays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConstraints {
    pub is_dead: bool,
    pub ages: AgeRange,
    pub genders: GenderSet,
}

impl Default for RoleConstraints {
    fn default() -> Self {
        Self {
            is_dead: false,
            ages: AgeRange::default(),
            genders: GenderSet::any(),
        }
    }
}

/// An abstract character slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub name: String,
    pub constraints: RoleConstraints,
    pub relations: Vec<RelationTemplate>,
}

impl RoleTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constraints: RoleConstraints::default(),
            relations: Vec::new(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.constraints.is_dead
    }
}

/// A boolean expression over role templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionNode {
    Role(RoleTemplateId),
    /// Every present child contributes.
    And(Vec<Option<ExpressionNode>>),
    /// One child, chosen at random, contributes.
    Or(Vec<Option<ExpressionNode>>),
}

impl ExpressionNode {
    /// Every role template reachable from this node, whichever branches win.
    pub fn referenced_roles(&self) -> Vec<RoleTemplateId> {
        let mut out = Vec::new();
        self.collect_roles(&mut out);
        out
    }

    fn collect_roles(&self, out: &mut Vec<RoleTemplateId>) {
        match self {
            Self::Role(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Self::And(children) | Self::Or(children) => {
                for child in children.iter().flatten() {
                    child.collect_roles(out);
                }
            }
        }
    }
}

/// An archetypal dramatic scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub root: Option<ExpressionNode>,
}

/// The loaded set of role and situation templates for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateLibrary {
    pub roles: Vec<RoleTemplate>,
    pub situations: Vec<SituationTemplate>,
}

// RON shapes: roles are referred to by name in the file and by index in
// memory, so loading goes through these intermediate structs.

#[derive(Debug, Deserialize)]
struct RonRelation {
    kind: RelationKind,
    target: String,
}

#[derive(Debug, Deserialize)]
struct RonRole {
    #[serde(default)]
    is_dead: bool,
    #[serde(default = "default_min_age")]
    min_age: u32,
    #[serde(default = "default_max_age")]
    max_age: u32,
    #[serde(default)]
    genders: GenderSet,
    #[serde(default)]
    relations: Vec<RonRelation>,
}

fn default_min_age() -> u32 {
    AgeRange::default().min
}

fn default_max_age() -> u32 {
    AgeRange::default().max
}

#[derive(Debug, Deserialize)]
enum RonNode {
    Role(String),
    And(Vec<RonNode>),
    Or(Vec<RonNode>),
    Empty,
}

#[derive(Debug, Deserialize)]
struct RonSituation {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default = "empty_node")]
    root: RonNode,
}

fn empty_node() -> RonNode {
    RonNode::Empty
}

#[derive(Debug, Deserialize)]
struct RonLibrary {
    roles: BTreeMap<String, RonRole>,
    #[serde(default)]
    situations: Vec<RonSituation>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a template library from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<TemplateLibrary, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a template library from a RON string.
    pub fn parse_ron(input: &str) -> Result<TemplateLibrary, TemplateError> {
        let raw: RonLibrary = ron::from_str(input)?;

        let ids: HashMap<String, RoleTemplateId> = raw
            .roles
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), RoleTemplateId(i)))
            .collect();
        let lookup = |role: &str, context: &str| {
            ids.get(role).copied().ok_or_else(|| TemplateError::UnknownRole {
                role: role.to_string(),
                context: context.to_string(),
            })
        };

        let mut library = TemplateLibrary::new();
        for (name, ron_role) in &raw.roles {
            let mut relations = Vec::with_capacity(ron_role.relations.len());
            for rel in &ron_role.relations {
                relations.push(RelationTemplate {
                    kind: rel.kind,
                    target: lookup(&rel.target, &format!("role '{}'", name))?,
                });
            }
            library.roles.push(RoleTemplate {
                name: name.clone(),
                constraints: RoleConstraints {
                    is_dead: ron_role.is_dead,
                    ages: AgeRange::new(ron_role.min_age, ron_role.max_age),
                    genders: ron_role.genders,
                },
                relations,
            });
        }

        for situation in raw.situations {
            let context = format!("situation '{}'", situation.id);
            let root = convert_node(&situation.root, &|role| lookup(role, &context))?;
            library.situations.push(SituationTemplate {
                name: if situation.name.is_empty() {
                    situation.id.clone()
                } else {
                    situation.name
                },
                id: situation.id,
                category: situation.category,
                root,
            });
        }

        Ok(library)
    }

    pub fn add_role(&mut self, role: RoleTemplate) -> RoleTemplateId {
        self.roles.push(role);
        RoleTemplateId(self.roles.len() - 1)
    }

    /// Add an outgoing relation template from one role to another.
    pub fn relate(&mut self, from: RoleTemplateId, kind: RelationKind, to: RoleTemplateId) {
        self.roles[from.0].relations.push(RelationTemplate { kind, target: to });
    }

    pub fn add_situation(&mut self, situation: SituationTemplate) -> SituationTemplateId {
        self.situations.push(situation);
        SituationTemplateId(self.situations.len() - 1)
    }

    pub fn role(&self, id: RoleTemplateId) -> &RoleTemplate {
        &self.roles[id.0]
    }

    pub fn situation(&self, id: SituationTemplateId) -> &SituationTemplate {
        &self.situations[id.0]
    }

    pub fn role_by_name(&self, name: &str) -> Option<RoleTemplateId> {
        self.roles
            .iter()
            .position(|r| r.name == name)
            .map(RoleTemplateId)
    }

    /// Merge another library into this one. Situations are appended; role
    /// indices of `other` are shifted past the existing roles.
    pub fn merge(&mut self, other: TemplateLibrary) {
        let offset = self.roles.len();
        let shift = |id: RoleTemplateId| RoleTemplateId(id.0 + offset);
        for mut role in other.roles {
            for rel in &mut role.relations {
                rel.target = shift(rel.target);
            }
            self.roles.push(role);
        }
        for mut situation in other.situations {
            if let Some(root) = situation.root.as_mut() {
                shift_node(root, offset);
            }
            self.situations.push(situation);
        }
    }
}

fn convert_node<F>(node: &RonNode, lookup: &F) -> Result<Option<ExpressionNode>, TemplateError>
where
    F: Fn(&str) -> Result<RoleTemplateId, TemplateError>,
{
    let converted = match node {
        RonNode::Empty => return Ok(None),
        RonNode::Role(name) => ExpressionNode::Role(lookup(name)?),
        RonNode::And(children) => ExpressionNode::And(convert_children(children, lookup)?),
        RonNode::Or(children) => ExpressionNode::Or(convert_children(children, lookup)?),
    };
    Ok(Some(converted))
}

fn convert_children<F>(
    children: &[RonNode],
    lookup: &F,
) -> Result<Vec<Option<ExpressionNode>>, TemplateError>
where
    F: Fn(&str) -> Result<RoleTemplateId, TemplateError>,
{
    children.iter().map(|c| convert_node(c, lookup)).collect()
}

fn shift_node(node: &mut ExpressionNode, offset: usize) {
    match node {
        ExpressionNode::Role(id) => id.0 += offset,
        ExpressionNode::And(children) | ExpressionNode::Or(children) => {
            for child in children.iter_mut().flatten() {
                shift_node(child, offset);
            }
        }
    }
}
