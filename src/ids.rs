use std::fmt;
use std::str::FromStr;

use ulid::Ulid;

/// Header a caller uses to supply (and receives back) the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, a ULID so ids sort by arrival time
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Adopt a caller supplied id; `None` when the header is not a ULID
    #[must_use]
    pub fn adopt(header_value: &str) -> Option<Self> {
        header_value.trim().parse().ok()
    }

    /// Milliseconds since the Unix epoch at which the id was minted
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}
