use crate::session::ScanSession;
use serde::{Deserialize, Serialize};

/// Per-session policy toggles, resolved exactly once at session start.
///
/// Environment overrides win; operator-note substrings are kept as a
/// compatibility path for older session tooling that encoded policy in
/// free-form notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub allow_simulated_backend: bool,
    pub require_strict_intrinsic_gate: bool,
}

const ALLOW_SIMULATED_ENV: &str = "BENCHSCAN_ALLOW_SIMULATED_BACKEND";
const STRICT_INTRINSIC_ENV: &str = "BENCHSCAN_REQUIRE_INTRINSIC_FRAMES";

impl PolicyConfig {
    pub fn resolve(session: &ScanSession) -> Self {
        let notes = session.operator_notes.to_ascii_lowercase();
        Self {
            allow_simulated_backend: env_flag(ALLOW_SIMULATED_ENV) || notes.contains("test"),
            require_strict_intrinsic_gate: env_flag(STRICT_INTRINSIC_ENV)
                || notes.contains("require-intrinsic")
                || notes.contains("calibration-strict"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => {
            let value = value.to_ascii_lowercase();
            value == "1" || value == "true" || value == "yes"
        }
        Err(_) => false,
    }
}
