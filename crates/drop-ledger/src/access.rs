//! Admin authorization.
//!
//! Commands that touch another team's score, recount, or reset ask an
//! [`Authorizer`]. The default policy is a static allow-list of identities.

use std::collections::HashSet;

/// Decides whether an identity may run admin commands.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, identity: &str) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_authorized(&self, identity: &str) -> bool {
        self(identity)
    }
}

/// Allow-list of admin identities, compared exactly.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    admins: HashSet<String>,
}

impl AllowList {
    pub fn new(admins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl Authorizer for AllowList {
    fn is_authorized(&self, identity: &str) -> bool {
        self.admins.contains(identity)
    }
}
