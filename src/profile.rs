//! Runner profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::runs::UnknownVariant;

/// Gender, used for age-graded comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Stable encoding used by both the local schema and remote documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            other => Err(UnknownVariant::new("gender", other)),
        }
    }
}

/// The single runner profile stored on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name
    pub name: String,
    pub gender: Gender,
    /// Age in years
    pub age: u32,
}

impl UserProfile {
    /// Create a profile.
    pub fn new(name: impl Into<String>, gender: Gender, age: u32) -> Self {
        Self {
            name: name.into(),
            gender,
            age,
        }
    }
}
