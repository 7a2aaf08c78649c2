use serde::{Deserialize, Serialize};

/// Newtype wrapper for character indices inside a cast graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub usize);

/// Gender of a character or of the characters a role accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Male => 0b01,
            Self::Female => 0b10,
        }
    }
}

/// A set of genders, stored as a bitmask. Serialized as a plain list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Gender>", into = "Vec<Gender>")]
pub struct GenderSet(u8);

impl GenderSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn any() -> Self {
        Self(0b11)
    }

    pub fn only(gender: Gender) -> Self {
        Self(gender.bit())
    }

    pub fn contains(&self, gender: Gender) -> bool {
        self.0 & gender.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersect(&self, other: &GenderSet) -> GenderSet {
        GenderSet(self.0 & other.0)
    }

    pub fn intersects(&self, other: &GenderSet) -> bool {
        !self.intersect(other).is_empty()
    }

    /// The single gender in the set, if there is exactly one.
    pub fn single(&self) -> Option<Gender> {
        let mut members = self.iter();
        match (members.next(), members.next()) {
            (Some(g), None) => Some(g),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Gender> + '_ {
        Gender::ALL.into_iter().filter(move |g| self.contains(*g))
    }
}

impl Default for GenderSet {
    fn default() -> Self {
        Self::any()
    }
}

impl From<Vec<Gender>> for GenderSet {
    fn from(genders: Vec<Gender>) -> Self {
        genders
            .into_iter()
            .fold(GenderSet::empty(), |set, g| GenderSet(set.0 | g.bit()))
    }
}

impl From<GenderSet> for Vec<Gender> {
    fn from(set: GenderSet) -> Self {
        set.iter().collect()
    }
}

/// An inclusive age interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Intersection of two intervals, or `None` when they do not overlap.
    pub fn intersect(&self, other: &AgeRange) -> Option<AgeRange> {
        let range = AgeRange::new(self.min.max(other.min), self.max.min(other.max));
        if range.is_empty() {
            None
        } else {
            Some(range)
        }
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self::new(18, 81)
    }
}
