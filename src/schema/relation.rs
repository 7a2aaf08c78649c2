use serde::{Deserialize, Serialize};

use super::template::RoleTemplateId;

/// Kinship from the source's point of view: `Parent` means "source is a
/// parent of target".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FamilialKind {
    Unspecified,
    Parent,
    Child,
    Grandparent,
    Grandchild,
    Sibling,
    Avuncular,
    Nibling,
    GrandAvuncular,
    GrandNibling,
    Cousin,
    Unrelated,
}

impl FamilialKind {
    pub const ALL: [FamilialKind; 12] = [
        Self::Unspecified,
        Self::Parent,
        Self::Child,
        Self::Grandparent,
        Self::Grandchild,
        Self::Sibling,
        Self::Avuncular,
        Self::Nibling,
        Self::GrandAvuncular,
        Self::GrandNibling,
        Self::Cousin,
        Self::Unrelated,
    ];

    /// True for kinds that assert an actual blood relation.
    pub fn is_kin(&self) -> bool {
        !matches!(self, Self::Unspecified | Self::Unrelated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaritalKind {
    None,
    Married,
    Divorced,
}

/// A feeling the source holds towards the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutgoingKind {
    Love,
    Like,
    Hate,
    Rivalry,
}

/// A feeling the target holds towards the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomingKind {
    Loved,
    Liked,
    Hated,
    Rivaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrimeKind {
    /// Source murdered the target.
    Murder,
    /// Source was murdered by the target.
    Murdered,
    /// Source committed adultery involving the target.
    Adultery,
}

/// The typed payload of a relation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Familial(FamilialKind),
    Marital(MaritalKind),
    Outgoing(OutgoingKind),
    Incoming(IncomingKind),
    Crime(CrimeKind),
}

impl RelationKind {
    /// Familial and marital edges bind characters into one family.
    pub fn links_family(&self) -> bool {
        matches!(self, Self::Familial(_) | Self::Marital(_))
    }

    /// Kinds a character may hold at most once, whatever the target.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            Self::Marital(MaritalKind::Married)
                | Self::Outgoing(OutgoingKind::Love)
                | Self::Outgoing(OutgoingKind::Rivalry)
        )
    }

    /// Rank used when picking which edge describes a character indirectly.
    /// Lower ranks win.
    pub fn attribution_rank(&self) -> u8 {
        match self {
            Self::Familial(_) => 0,
            Self::Marital(_) => 1,
            Self::Crime(_) => 2,
            Self::Incoming(_) => 3,
            Self::Outgoing(_) => 4,
        }
    }
}

/// A directed edge between two role templates of the same situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationTemplate {
    pub kind: RelationKind,
    pub target: RoleTemplateId,
}
