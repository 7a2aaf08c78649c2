/// Kinship composition.
///
/// `compose(a, b)` answers: if I am `a` of X, and X is `b` of Y, what am I
/// of Y? The table is neither symmetric nor associative, so callers always
/// compose "my relation to X" with "X's relation to Y" in that order.
///
/// Rows for grandparent, grandchild, avuncular, nibling, grand-avuncular,
/// grand-nibling and cousin chains are not filled in yet; those cells yield
/// `Unspecified`, meaning no new fact is inferred.

use crate::schema::relation::FamilialKind;

pub fn compose(mine: FamilialKind, theirs: FamilialKind) -> FamilialKind {
    use FamilialKind::*;

    match (mine, theirs) {
        (Unrelated, _) | (_, Unrelated) => Unrelated,
        (Unspecified, _) | (_, Unspecified) => Unspecified,

        (Parent, Parent) => Grandparent,
        (Parent, Child) => Unrelated,
        (Parent, Sibling) => Parent,
        (Parent, Avuncular) => Grandparent,
        (Parent, Nibling) => Sibling,
        (Parent, GrandNibling) => Nibling,
        (Parent, Cousin) => Avuncular,

        (Child, Parent) => Sibling,
        (Child, Child) => Grandchild,
        (Child, Sibling) => Avuncular,
        (Child, Avuncular) => Cousin,
        (Child, Nibling) => GrandAvuncular,

        (Sibling, Parent) => Avuncular,
        (Sibling, Child) => Child,
        (Sibling, Grandparent) => GrandAvuncular,
        (Sibling, Grandchild) => Grandchild,
        (Sibling, Sibling) => Sibling,
        (Sibling, Nibling) => Nibling,
        (Sibling, GrandNibling) => GrandNibling,
        (Sibling, Cousin) => Cousin,

        _ => Unspecified,
    }
}

/// Fold a chain of kinship hops, left to right.
///
/// An empty chain asserts nothing and yields `Unspecified`.
pub fn compose_chain(chain: &[FamilialKind]) -> FamilialKind {
    let mut hops = chain.iter().copied();
    match hops.next() {
        Some(first) => hops.fold(first, compose),
        None => FamilialKind::Unspecified,
    }
}
