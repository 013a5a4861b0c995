use serde::{Deserialize, Serialize};

/// Well-known group ids of the host forum
pub struct Group;

impl Group {
    pub const ADMINISTRATOR_ID: i64 = 1;
    pub const GUEST_ID: i64 = 2;
    pub const MEMBER_ID: i64 = 3;
    pub const MODERATOR_ID: i64 = 4;
}

/// The user a search runs on behalf of.
///
/// Passed explicitly into query building and result merging; nothing in the
/// crate resolves a "current user" on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    /// User id, `0` for guests
    pub id: i64,

    /// Groups the user belongs to
    #[serde(default)]
    pub groups: Vec<i64>,

    /// Whether the user confirmed their email address
    #[serde(default)]
    pub email_confirmed: bool,

    /// Whether the user may see hidden discussions
    #[serde(default)]
    pub can_view_hidden: bool,
}

impl Actor {
    /// An anonymous visitor
    pub fn guest() -> Self {
        Self::default()
    }

    /// A registered user with a confirmed email address
    pub fn user(id: i64, groups: Vec<i64>) -> Self {
        Self {
            id,
            groups,
            email_confirmed: true,
            can_view_hidden: false,
        }
    }

    pub fn with_hidden_access(mut self, allowed: bool) -> Self {
        self.can_view_hidden = allowed;
        self
    }

    pub fn is_guest(&self) -> bool {
        self.id <= 0
    }

    /// Groups used for visibility filtering.
    ///
    /// Everyone is implicitly a guest; users with a confirmed email are
    /// members as well.
    pub fn search_groups(&self) -> Vec<i64> {
        let mut groups = self.groups.clone();
        groups.push(Group::GUEST_ID);
        if self.email_confirmed {
            groups.push(Group::MEMBER_ID);
        }
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// Hidden discussions are only loaded for signed-in users holding the
    /// hide permission.
    pub fn may_view_hidden(&self) -> bool {
        !self.is_guest() && self.can_view_hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_groups() {
        let actor = Actor::guest();
        assert!(actor.is_guest());
        assert_eq!(actor.search_groups(), vec![Group::GUEST_ID]);
    }

    #[test]
    fn test_confirmed_user_is_member() {
        let actor = Actor::user(7, vec![Group::MODERATOR_ID]);
        assert_eq!(
            actor.search_groups(),
            vec![Group::GUEST_ID, Group::MEMBER_ID, Group::MODERATOR_ID]
        );
    }

    #[test]
    fn test_unconfirmed_user_is_not_member() {
        let actor = Actor {
            id: 9,
            groups: vec![],
            email_confirmed: false,
            can_view_hidden: false,
        };
        assert_eq!(actor.search_groups(), vec![Group::GUEST_ID]);
    }

    #[test]
    fn test_guest_never_views_hidden() {
        let actor = Actor::guest().with_hidden_access(true);
        assert!(!actor.may_view_hidden());
        assert!(Actor::user(1, vec![]).with_hidden_access(true).may_view_hidden());
    }
}
