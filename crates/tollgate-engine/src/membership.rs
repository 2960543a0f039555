//! Group membership evaluation.

use crate::error::AuthError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tollgate_store::UserDirectory;

/// True iff every required group is present in the actual set. Exact
/// string match, order-independent, no case folding.
pub fn contains_all(required: &[String], actual: &BTreeSet<String>) -> bool {
    required.iter().all(|group| actual.contains(group))
}

/// Decides whether a user satisfies a required group set, reading the
/// user's current memberships from the directory.
pub struct MembershipEvaluator {
    directory: Arc<dyn UserDirectory>,
}

impl MembershipEvaluator {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Fetch exactly one user record and test set containment.
    ///
    /// An empty requirement is vacuously satisfied, even for users with
    /// no stored groups; the user record itself must still exist.
    pub async fn evaluate(&self, required: &[String], user: &str) -> Result<bool, AuthError> {
        if user.is_empty() {
            return Err(AuthError::InvalidArgument("user"));
        }

        let mut matches = self.directory.find_user(user).await?;
        let matched = matches.len();
        let record = match matches.pop() {
            Some(record) if matched == 1 => record,
            _ => {
                return Err(AuthError::NotFoundOrAmbiguous {
                    entity: "user",
                    key: user.to_string(),
                    matched,
                });
            }
        };

        if required.is_empty() {
            return Ok(true);
        }

        match &record.groups {
            Some(groups) if !groups.is_empty() => Ok(contains_all(required, groups)),
            _ => Ok(false),
        }
    }
}
