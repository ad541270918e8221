//! Domain identifiers (strongly-typed IDs).
//!
//! Session serial はバックエンドが払い出す不透明な値です。
//! 「まだ作成されていない」を表すために予約済みの sentinel を持ちます。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a worker session, assigned by the session backend.
///
/// `SessionSerial::UNASSIGNED` is reserved: a backend never hands it out, and
/// the control loop rejects it if one does.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionSerial(i64);

impl SessionSerial {
    /// Sentinel for "no session created yet".
    pub const UNASSIGNED: Self = Self(i64::MIN);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        *self != Self::UNASSIGNED
    }
}

impl Default for SessionSerial {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for SessionSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "serial-{}", self.0)
        } else {
            f.write_str("serial-unassigned")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_sentinel() {
        let serial = SessionSerial::default();
        assert!(!serial.is_assigned());
        assert_eq!(serial.to_string(), "serial-unassigned");
    }

    #[test]
    fn assigned_serial_displays_value() {
        let serial = SessionSerial::new(42);
        assert!(serial.is_assigned());
        assert_eq!(serial.as_i64(), 42);
        assert_eq!(serial.to_string(), "serial-42");
    }
}
