//! Permission sets as the repositories report them, and the principal deltas
//! submitted when granting or revoking access.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Kind of access a principal can be granted on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    View,
    Edit,
}

impl PermissionKind {
    /// Path segment used by the permissions endpoints
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            other => Err(crate::Error::invalid(
                "permission",
                format!("expected 'view' or 'edit', got '{other}'"),
            )),
        }
    }
}

/// Users and roles holding each kind of access to a record.
///
/// Principal lists keep the order the backend returned them in. Use
/// [`PermissionSet::same_principals`] to compare two sets by meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(default)]
    pub view: Vec<String>,
    #[serde(default)]
    pub edit: Vec<String>,
    #[serde(rename = "viewRoles", default, skip_serializing_if = "Option::is_none")]
    pub view_roles: Option<Vec<String>>,
    #[serde(rename = "editRoles", default, skip_serializing_if = "Option::is_none")]
    pub edit_roles: Option<Vec<String>>,
    /// Anything else the backend reports (pending users, for instance)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PermissionSet {
    /// Principals holding the given kind of access
    #[must_use]
    pub fn principals(&self, kind: PermissionKind) -> &[String] {
        match kind {
            PermissionKind::View => &self.view,
            PermissionKind::Edit => &self.edit,
        }
    }

    /// Add principals to `view`, skipping ones already present and keeping
    /// first-seen order
    pub fn union_view<I, S>(&mut self, principals: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        union_into(&mut self.view, principals);
    }

    /// Compare two sets ignoring the order of principals
    #[must_use]
    pub fn same_principals(&self, other: &Self) -> bool {
        fn as_set(list: &[String]) -> BTreeSet<&str> {
            list.iter().map(String::as_str).collect()
        }
        fn roles(list: Option<&Vec<String>>) -> BTreeSet<&str> {
            list.map_or_else(BTreeSet::new, |l| as_set(l))
        }

        as_set(&self.view) == as_set(&other.view)
            && as_set(&self.edit) == as_set(&other.edit)
            && roles(self.view_roles.as_ref()) == roles(other.view_roles.as_ref())
            && roles(self.edit_roles.as_ref()) == roles(other.edit_roles.as_ref())
    }
}

pub(crate) fn union_into<I, S>(target: &mut Vec<String>, principals: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for principal in principals {
        let principal = principal.into();
        if !target.contains(&principal) {
            target.push(principal);
        }
    }
}

/// Principals to add to, or remove from, one kind of access.
///
/// The backend merges (grant) or subtracts (revoke) these lists from its
/// current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalDelta {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(rename = "pendingUsers", default, skip_serializing_if = "Vec::is_empty")]
    pub pending_users: Vec<String>,
}

impl PrincipalDelta {
    #[must_use]
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
            pending_users: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pending<I, S>(mut self, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending_users = pending.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.pending_users.is_empty()
    }
}
