use std::fmt::Display;

/// Token the server attaches to a folder at select time. A changed value invalidates every
/// [`Uid`](super::Uid) recorded under the previous one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
#[repr(transparent)]
pub struct UidValidity(u32);

impl UidValidity {
    pub fn new(validity: u32) -> Self {
        Self(validity)
    }
}

impl Display for UidValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for UidValidity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<&u32> for UidValidity {
    fn from(value: &u32) -> Self {
        Self(*value)
    }
}

impl From<UidValidity> for u32 {
    fn from(value: UidValidity) -> Self {
        value.0
    }
}
