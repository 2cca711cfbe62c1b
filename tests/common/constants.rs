//! Shared constants for end-to-end tests

/// Regular test user seeded into every test database
pub const TEST_USER: &str = "jsmith";
pub const TEST_PASS: &str = "correct-horse-battery";

/// Second test user, used for authorship checks
pub const SECOND_USER: &str = "mjones";
pub const SECOND_PASS: &str = "hunter2-but-longer";

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Rooms from the compiled-in allow-list used by the fixtures
pub const SANCTUARY_ROOM: i64 = 100;
pub const SMITH_ROOM: i64 = 128;
/// A room id outside the allow-list
pub const UNTRACKED_ROOM: i64 = 999;

/// External event ids used in the default source payload
pub const SERVICE_EVENT: i64 = 501;
pub const YOUTH_EVENT: i64 = 502;
pub const CANCELLED_EVENT: i64 = 503;
pub const UNTRACKED_EVENT: i64 = 504;
