//! Key/value pair type shared by the map container and its bulk APIs.

/// A trivially copyable key/value pair.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pair<First, Second> {
    /// The key.
    pub first: First,
    /// The mapped value.
    pub second: Second,
}

impl<First, Second> Pair<First, Second> {
    /// Creates a new pair.
    pub const fn new(first: First, second: Second) -> Self {
        Self { first, second }
    }
}

impl<First, Second> From<(First, Second)> for Pair<First, Second> {
    fn from((first, second): (First, Second)) -> Self {
        Self { first, second }
    }
}
