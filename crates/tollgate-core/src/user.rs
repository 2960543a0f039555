//! Directory user records.
//!
//! Read-only to this service: membership data is written by an external
//! directory synchronization process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A user as seen in the directory. A missing `groups` field and an empty
/// set both mean "no memberships".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeSet<String>>,
}

impl UserRecord {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            groups: None,
        }
    }

    pub fn with_groups<I, S>(user: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: user.into(),
            groups: Some(groups.into_iter().map(Into::into).collect()),
        }
    }

    /// True when the user has any membership data at all.
    pub fn has_groups(&self) -> bool {
        self.groups.as_ref().is_some_and(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_groups_both_mean_no_memberships() {
        let bare = UserRecord::new("alice");
        assert!(!bare.has_groups());

        let empty = UserRecord::with_groups("bob", Vec::<String>::new());
        assert!(!empty.has_groups());

        let member = UserRecord::with_groups("carol", ["ops"]);
        assert!(member.has_groups());
    }

    #[test]
    fn groups_field_is_omitted_when_absent() {
        let bare = UserRecord::new("alice");
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("groups").is_none());

        let parsed: UserRecord = serde_json::from_str(r#"{"user":"alice"}"#).unwrap();
        assert_eq!(parsed.groups, None);
    }
}
