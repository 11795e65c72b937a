//! Status enums for locally owned entities.

use serde::{Deserialize, Serialize};

/// Whether a client account is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// Newly created clients start here.
    #[default]
    Activated,
    Deactivated,
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activated => write!(f, "activated"),
            Self::Deactivated => write!(f, "deactivated"),
        }
    }
}

impl std::str::FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activated" => Ok(Self::Activated),
            "deactivated" => Ok(Self::Deactivated),
            _ => Err(format!("invalid client status: {s}")),
        }
    }
}
