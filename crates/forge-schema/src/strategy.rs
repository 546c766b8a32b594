//! API creation strategies
//!
//! A reference property declares, through `apiCreationStrategy`, whether the
//! referenced object is created before or after the object embedding it and
//! how the generated id flows between the two requests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Value of the `apiCreationStrategy` schema extension
///
/// Absence of the field means the property is sent as ordinary embedded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreationStrategy {
    /// Parent created first; child posted under `.../parentType/parentId`
    ParentFirstRouteId,

    /// Parent created first; child's `childRefToParent` field receives the parent id
    ParentFirstBodyId,

    /// Child created first; the parent's own field receives the child id
    ChildFirstBodyId,
}

impl CreationStrategy {
    /// Wire name as it appears in schema files
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentFirstRouteId => "parentFirstRouteId",
            Self::ParentFirstBodyId => "parentFirstBodyId",
            Self::ChildFirstBodyId => "childFirstBodyId",
        }
    }

    /// Check if the parent request is dispatched before the child
    #[inline]
    #[must_use]
    pub fn is_parent_first(&self) -> bool {
        matches!(self, Self::ParentFirstRouteId | Self::ParentFirstBodyId)
    }

    /// Check if the child request is dispatched before the parent
    #[inline]
    #[must_use]
    pub fn is_child_first(&self) -> bool {
        matches!(self, Self::ChildFirstBodyId)
    }
}

impl std::fmt::Display for CreationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised strategy name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown apiCreationStrategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for CreationStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parentFirstRouteId" => Ok(Self::ParentFirstRouteId),
            "parentFirstBodyId" => Ok(Self::ParentFirstBodyId),
            "childFirstBodyId" => Ok(Self::ChildFirstBodyId),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Resolved dependency between a parent and a referenced child
///
/// Built once at schema load from the strategy plus `childRefToParent`,
/// so traversal never re-inspects raw keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Link {
    /// Child route embeds the parent id
    ParentRoute,

    /// Child body field receives the parent id
    ParentBody {
        /// Field in the child's body set to the parent's generated id
        child_ref_to_parent: String,
    },

    /// Parent body field receives the child id
    ChildBody,
}

impl Link {
    /// Strategy this link was resolved from
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> CreationStrategy {
        match self {
            Self::ParentRoute => CreationStrategy::ParentFirstRouteId,
            Self::ParentBody { .. } => CreationStrategy::ParentFirstBodyId,
            Self::ChildBody => CreationStrategy::ChildFirstBodyId,
        }
    }

    /// Check if the parent is sent first
    #[inline]
    #[must_use]
    pub fn is_parent_first(&self) -> bool {
        self.strategy().is_parent_first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_strategies() {
        assert_eq!(
            "parentFirstRouteId".parse::<CreationStrategy>(),
            Ok(CreationStrategy::ParentFirstRouteId)
        );
        assert_eq!(
            "parentFirstBodyId".parse::<CreationStrategy>(),
            Ok(CreationStrategy::ParentFirstBodyId)
        );
        assert_eq!(
            "childFirstBodyId".parse::<CreationStrategy>(),
            Ok(CreationStrategy::ChildFirstBodyId)
        );
    }

    #[test]
    fn parse_unknown_strategy() {
        let err = "siblingFirst".parse::<CreationStrategy>().unwrap_err();
        assert_eq!(err.0, "siblingFirst");
    }

    #[test]
    fn display_round_trips_wire_name() {
        for s in [
            CreationStrategy::ParentFirstRouteId,
            CreationStrategy::ParentFirstBodyId,
            CreationStrategy::ChildFirstBodyId,
        ] {
            assert_eq!(s.to_string().parse::<CreationStrategy>(), Ok(s));
        }
    }

    #[test]
    fn direction_predicates() {
        assert!(CreationStrategy::ParentFirstRouteId.is_parent_first());
        assert!(CreationStrategy::ParentFirstBodyId.is_parent_first());
        assert!(!CreationStrategy::ChildFirstBodyId.is_parent_first());
        assert!(CreationStrategy::ChildFirstBodyId.is_child_first());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&CreationStrategy::ParentFirstBodyId).unwrap();
        assert_eq!(json, "\"parentFirstBodyId\"");
    }

    #[test]
    fn link_reports_strategy() {
        let link = Link::ParentBody {
            child_ref_to_parent: "orderId".to_string(),
        };
        assert_eq!(link.strategy(), CreationStrategy::ParentFirstBodyId);
        assert!(link.is_parent_first());
        assert!(!Link::ChildBody.is_parent_first());
    }
}
