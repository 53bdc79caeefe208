use std::fmt::Display;

use crate::repository::{Uid, UidValidity};

/// A message is identified by its uid together with the uid validity of the folder at the
/// time it was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageIdentity {
    uid_validity: UidValidity,
    uid: Uid,
}

impl MessageIdentity {
    pub fn new(uid_validity: UidValidity, uid: Uid) -> Self {
        Self { uid_validity, uid }
    }

    pub fn uid_validity(&self) -> UidValidity {
        self.uid_validity
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }
}

impl Display for MessageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.uid_validity, self.uid)
    }
}
