use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Stable numeric camera identity (the `cameras.id` primary key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(pub i64);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CameraId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A registered camera and the credentials for its alert stream.
///
/// Loaded once at startup and immutable for the lifetime of a
/// supervisor run. The secret never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct CameraEndpoint {
    pub id: CameraId,
    /// Display name from the console; may be empty.
    pub name: String,
    /// `host`, `host:port`, or a full `ws://` URL.
    pub address: String,
    pub username: String,
    pub secret: SecretString,
}

impl CameraEndpoint {
    /// Name for logs and alert bodies: the display name when set,
    /// otherwise the address.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str) -> CameraEndpoint {
        CameraEndpoint {
            id: CameraId(1),
            name: name.into(),
            address: "192.168.1.64".into(),
            username: "admin".into(),
            secret: SecretString::from("hunter2".to_string()),
        }
    }

    #[test]
    fn label_falls_back_to_address() {
        assert_eq!(endpoint("Gate").label(), "Gate");
        assert_eq!(endpoint("  ").label(), "192.168.1.64");
    }

    #[test]
    fn debug_hides_secret() {
        let debug = format!("{:?}", endpoint("Gate"));
        assert!(!debug.contains("hunter2"));
    }
}
