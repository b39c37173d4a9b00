//! Operator tags for container refs.
//!
//! A ref is created with a set of operator tags and only exposes the
//! corresponding methods. Misuse (for example calling `insert` on a ref
//! built for lookups) is rejected at compile time rather than at runtime.

mod sealed {
    pub trait Sealed {}
}

/// Marker for the per-key insert capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insert;

/// Marker for the per-key membership-test capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contains;

/// Marker for the per-key lookup capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Find;

/// Marker for the per-key erase capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Erase;

/// A non-empty set of operator tags.
///
/// Implemented for the four bare tags and for tuples of distinct tags. The
/// empty tuple never implements this trait, so a ref cannot be created with
/// no capabilities.
pub trait OperatorSet: sealed::Sealed + Copy {}

/// Witness that an [`OperatorSet`] contains a particular tag.
pub trait Has<Tag>: OperatorSet {}

macro_rules! impl_has {
    ($tuple:ty; $($tag:ident),+) => {
        $(
            impl Has<$tag> for $tuple {}
        )+
    };
}

macro_rules! impl_operator_set {
    ($(($($tag:ident),+)),* $(,)?) => {
        $(
            impl sealed::Sealed for ($($tag,)+) {}
            impl OperatorSet for ($($tag,)+) {}
            impl_has!(($($tag,)+); $($tag),+);
        )*
    };
}

macro_rules! impl_bare_tag {
    ($($tag:ident),+) => {
        $(
            impl sealed::Sealed for $tag {}
            impl OperatorSet for $tag {}
            impl Has<$tag> for $tag {}
        )+
    };
}

impl_bare_tag!(Insert, Contains, Find, Erase);

impl_operator_set!(
    (Insert),
    (Contains),
    (Find),
    (Erase),
    (Insert, Contains),
    (Insert, Find),
    (Insert, Erase),
    (Contains, Find),
    (Contains, Erase),
    (Find, Erase),
    (Insert, Contains, Find),
    (Insert, Contains, Erase),
    (Insert, Find, Erase),
    (Contains, Find, Erase),
    (Insert, Contains, Find, Erase),
);

#[cfg(test)]
mod tests {
    use super::*;

    fn witness_insert<O: Has<Insert>>(_: O) {}
    fn witness_find<O: Has<Find>>(_: O) {}
    fn witness_all<O: Has<Insert> + Has<Contains> + Has<Find> + Has<Erase>>(_: O) {}

    #[test]
    fn tuples_witness_each_member_tag() {
        witness_insert(Insert);
        witness_insert((Insert,));
        witness_insert((Insert, Find));
        witness_find((Insert, Find));
        witness_find((Contains, Find, Erase));
        witness_all((Insert, Contains, Find, Erase));
    }
}
