// Wire protocol of the lower-case endpoint.
pub const PAYLOAD: &str = "FOO";
pub const VERSION_PREFIX: char = '_';

/// Used as the result key when the server never announced its version.
pub const UNKNOWN_VERSION: &str = "unknown";

// Tag of the unreleased build, always listed last by the summary table.
pub const SNAPSHOT_VERSION: &str = "999-SNAPSHOT";

// Configuration defaults
pub const DEFAULT_NUMBER_OF_CLIENTS: usize = 1000;
pub const DEFAULT_NUMBER_OF_MESSAGES: usize = 1000;
pub const DEFAULT_SERVER_HOST: &str = "localhost";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SERVER_PATH: &str = "/to-lower-case";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RESULTS_DIR: &str = "target/results";

// Process exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_DEGRADED: u8 = 1;
pub const EXIT_FATAL: u8 = 2;
