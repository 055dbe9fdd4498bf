use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Identity of an anonymous upload session, carried in the `X-Guest-ID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestId(Uuid);

impl GuestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for GuestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
