use serde::{Deserialize, Serialize};

/// Outcome label assigned to an event by the triple-barrier rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Profit,  // Hit the upper (profit) barrier
    Timeout, // Hit the time barrier
    Loss,    // Hit the lower (loss) barrier
}

impl Label {
    pub fn value(self) -> i64 {
        match self {
            Self::Profit => 1,
            Self::Timeout => 0,
            Self::Loss => -1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Profit),
            0 => Some(Self::Timeout),
            -1 => Some(Self::Loss),
            _ => None,
        }
    }
}
