use std::fmt;

/// Position of a child among its siblings: ordered by `group` first, then by
/// `index` within the group.
///
/// The reserved groups partition a node's children into bands. Callers may
/// declare children into any other group value to place them between (or
/// around) the reserved bands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sorting {
    pub group: i32,
    pub index: usize,
}

impl Sorting {
    /// Children cloned as part of a template hierarchy.
    pub const STATIC_CHILDREN: i32 = 1000;
    /// Children a node declares for itself.
    pub const INTERNAL_CHILDREN: i32 = 2000;
    /// Children declared into a node by its owner.
    pub const OWNER_CHILDREN: i32 = 3000;

    pub const fn new(group: i32, index: usize) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group: {}, index: {}", self.group, self.index)
    }
}
