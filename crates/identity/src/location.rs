//! Read-only geographic lookups referenced by users.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: i32,
    pub country_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i32,
    pub state_id: i32,
    pub name: String,
}

/// Names resolved for a user's location ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationNames {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}
