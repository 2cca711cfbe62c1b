//! Runtime configuration.
//!
//! Everything is resolved once at startup and passed down as values; the
//! adapter and the sync engine never read ambient state.

use std::collections::BTreeMap;

pub const DEFAULT_MP_API_URL: &str =
    "https://standrew.ministryplatform.com/ministryplatformapi/procs/api_church_specific_get_events";

/// The rooms we mirror events for. Records in any other room are discarded
/// during sync.
pub const TRACKED_ROOMS: &[(i64, &str)] = &[
    (100, "Sanctuary"),
    (128, "Smith"),
    (131, "Small Group Room 131"),
    (126, "Small Group Room 126"),
    (120, "Small Group Room 120"),
    (121, "Small Group Room 121"),
    (122, "Small Group Room 122"),
    (123, "Small Group Room 123"),
    (124, "Small Group Room 124"),
    (226, "Movie Theater"),
];

pub fn tracked_rooms() -> BTreeMap<i64, String> {
    TRACKED_ROOMS
        .iter()
        .map(|(room_id, room_name)| (*room_id, room_name.to_string()))
        .collect()
}

#[derive(Clone, Debug)]
pub struct MinistryPlatformConfig {
    pub api_url: String,
    /// Bearer credential for the upstream API. Absent means sync calls fail
    /// with a configuration error before any network attempt.
    pub bearer_token: Option<String>,
}

impl MinistryPlatformConfig {
    /// Reads `MP_API_URL` and `MP_BEARER_TOKEN` from the environment,
    /// falling back to the compiled-in endpoint. CLI flags override either
    /// (see main.rs).
    pub fn from_env() -> Self {
        MinistryPlatformConfig {
            api_url: std::env::var("MP_API_URL").unwrap_or_else(|_| DEFAULT_MP_API_URL.to_string()),
            bearer_token: std::env::var("MP_BEARER_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
        }
    }
}
