use super::filter::{Connector, WhereClause, WhereGroup};
use crate::traits::Filterable;

/// Something a finished [`WhereGroup`] can be attached to
pub trait GroupParent: Sized {
    fn attach_group(self, group: WhereGroup) -> Self;

    /// Open a group whose members are joined with OR
    fn or_group(self) -> GroupBuilder<Self> {
        GroupBuilder::new(self, Connector::Or)
    }

    /// Open a group whose members are joined with AND
    fn and_group(self) -> GroupBuilder<Self> {
        GroupBuilder::new(self, Connector::And)
    }

    /// Attach a prebuilt group
    fn where_group(self, group: WhereGroup) -> Self {
        self.attach_group(group)
    }
}

/// Sub-builder for one parenthesized group
///
/// Owns its parent until [`GroupBuilder::end`] hands it back with the group
/// attached, so a group cannot be left half-built or closed twice.
#[must_use = "call end() to attach the group to its parent"]
pub struct GroupBuilder<P: GroupParent> {
    parent: P,
    group: WhereGroup,
}

impl<P: GroupParent> GroupBuilder<P> {
    fn new(parent: P, connector: Connector) -> Self {
        Self {
            parent,
            group: WhereGroup::new(connector),
        }
    }

    /// Wrap the whole group in NOT
    pub fn not(mut self) -> Self {
        self.group.negate = !self.group.negate;
        self
    }

    /// Close the group and return to the parent
    pub fn end(self) -> P {
        self.parent.attach_group(self.group)
    }
}

impl<P: GroupParent> Filterable for GroupBuilder<P> {
    fn push_clause(mut self, clause: WhereClause) -> Self {
        self.group.conditions.push(clause);
        self
    }
}

impl<P: GroupParent> GroupParent for GroupBuilder<P> {
    fn attach_group(mut self, group: WhereGroup) -> Self {
        self.group.subgroups.push(group);
        self
    }
}
