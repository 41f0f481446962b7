//! Role-to-capability mapping: the single source of truth for what each
//! authorization tier may do.
//!
//! Pure data, no I/O. Display layers receive capability sets from the list
//! controller and never re-derive permissions themselves.

use serde::{Deserialize, Serialize};

/// Authorization tier of an authenticated user.
///
/// The set is open: any unrecognized role string degrades to `User`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
    SuperUser,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "superuser" => Role::SuperUser,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
            Role::SuperUser => "SuperUser",
        }
    }
}

/// A permitted action against the inventory.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Add,
    Edit,
    Delete,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "View",
            Capability::Add => "Add",
            Capability::Edit => "Edit",
            Capability::Delete => "Delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    view: bool,
    add: bool,
    edit: bool,
    delete: bool,
}

impl CapabilitySet {
    pub fn allows(&self, cap: Capability) -> bool {
        match cap {
            Capability::View => self.view,
            Capability::Add => self.add,
            Capability::Edit => self.edit,
            Capability::Delete => self.delete,
        }
    }

    pub fn to_vec(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        if self.view {
            caps.push(Capability::View);
        }
        if self.add {
            caps.push(Capability::Add);
        }
        if self.edit {
            caps.push(Capability::Edit);
        }
        if self.delete {
            caps.push(Capability::Delete);
        }
        caps
    }

    /// Per-row action affordances: the subset of capabilities that apply to
    /// an individual item rather than the list as a whole.
    pub fn row_actions(&self) -> Vec<Capability> {
        let mut actions = Vec::new();
        if self.edit {
            actions.push(Capability::Edit);
        }
        if self.delete {
            actions.push(Capability::Delete);
        }
        actions
    }
}

/// Map a role to its capability set.
///
/// SuperUser deliberately gets view+edit only; the two reference variants
/// disagreed on delete rights, and this mapping is the documented decision.
pub fn capabilities(role: Role) -> CapabilitySet {
    match role {
        Role::User => CapabilitySet {
            view: true,
            ..Default::default()
        },
        Role::Admin => CapabilitySet {
            view: true,
            add: true,
            edit: true,
            delete: true,
        },
        Role::SuperUser => CapabilitySet {
            view: true,
            edit: true,
            ..Default::default()
        },
    }
}
