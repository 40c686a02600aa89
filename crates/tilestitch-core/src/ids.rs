//! View and group identifiers.
//!
//! A [`ViewId`] names one tile at one timepoint. A [`Group`] is the unit the
//! registration works on: one or more views that are aggregated into a single
//! representative image (e.g. all channels of one physical tile).

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier of one acquired tile at one timepoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewId {
    pub timepoint: u32,
    pub setup: u32,
}

impl ViewId {
    pub const fn new(timepoint: u32, setup: u32) -> Self {
        Self { timepoint, setup }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}s{}", self.timepoint, self.setup)
    }
}

/// Non-empty set of views registered together.
///
/// Ordering is lexicographic over the sorted views, which makes `(Group, Group)`
/// pair keys canonical once sorted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ViewId>", into = "Vec<ViewId>")]
pub struct Group {
    views: BTreeSet<ViewId>,
    representative: ViewId,
}

impl Group {
    pub fn new(views: impl IntoIterator<Item = ViewId>) -> Result<Self, CoreError> {
        let views: BTreeSet<ViewId> = views.into_iter().collect();
        let representative = *views.first().ok_or(CoreError::EmptyGroup)?;
        Ok(Self {
            views,
            representative,
        })
    }

    /// Degenerate single-view group.
    pub fn single(view: ViewId) -> Self {
        Self {
            views: BTreeSet::from([view]),
            representative: view,
        }
    }

    #[inline]
    pub fn views(&self) -> &BTreeSet<ViewId> {
        &self.views
    }

    /// Smallest view id; used wherever a group needs one concrete view.
    #[inline]
    pub fn representative(&self) -> ViewId {
        self.representative
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    #[inline]
    pub fn contains(&self, view: &ViewId) -> bool {
        self.views.contains(view)
    }

    /// Sorted timepoints covered by this group.
    pub fn timepoints(&self) -> Vec<u32> {
        let tps: BTreeSet<u32> = self.views.iter().map(|v| v.timepoint).collect();
        tps.into_iter().collect()
    }
}

impl From<ViewId> for Group {
    fn from(view: ViewId) -> Self {
        Self::single(view)
    }
}

impl TryFrom<Vec<ViewId>> for Group {
    type Error = CoreError;

    fn try_from(views: Vec<ViewId>) -> Result<Self, Self::Error> {
        Self::new(views)
    }
}

impl From<Group> for Vec<ViewId> {
    fn from(group: Group) -> Self {
        group.views.into_iter().collect()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.views.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "}}")
    }
}

/// Order a pair of groups canonically (smaller first).
pub fn canonical_pair(a: &Group, b: &Group) -> (Group, Group) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}
