// Project-wide constants
//
// Centralised here so ports, timeouts and model defaults have one source of
// truth. Import via `use crate::config::constants::*;`.

/// Default bind address for the HTTP service (localhost only).
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Origins the bundled web frontend is served from during development.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8000"];

/// Request bodies above this size are rejected.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Default Gemini model for every agent.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default maximum output tokens per model call.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Interpreter the benchmarker executes Python artifacts with.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Deadline for one benchmark execution or one test-suite run.
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 10;

/// Scratch directory the mock dataset checks bugs out into.
pub const DEFAULT_WORK_DIR: &str = "mock_workspace";

/// Environment variable carrying the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable overriding the server bind address.
pub const BIND_ADDR_ENV: &str = "STUDIO_BIND_ADDR";
