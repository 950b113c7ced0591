use serde::{Deserialize, Serialize};

/// Effective role of a caller on an estate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// Parse a stored role string. Only the exact spellings
    /// `OWNER`, `EDITOR` and `VIEWER` are recognized.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "OWNER" => Some(Role::Owner),
            "EDITOR" => Some(Role::Editor),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Editor => "EDITOR",
            Role::Viewer => "VIEWER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission flags a role carries on an estate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_edit: bool,
    pub can_view_sensitive: bool,
}

/// Map a role to its capabilities.
///
/// The two flags are decided separately even though they agree today.
pub fn capabilities_for(role: Role) -> Capabilities {
    let can_edit = match role {
        Role::Owner | Role::Editor => true,
        Role::Viewer => false,
    };
    let can_view_sensitive = match role {
        Role::Owner | Role::Editor => true,
        Role::Viewer => false,
    };
    Capabilities {
        can_edit,
        can_view_sensitive,
    }
}
