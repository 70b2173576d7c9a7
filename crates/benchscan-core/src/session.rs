use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Identity of one scan session.
///
/// Immutable once created; every stage reads it and none writes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSession {
    pub session_id: String,
    /// Unix timestamp in milliseconds.
    pub started_at_ms: u64,
    /// Camera the operator asked for; preflight may route to another device.
    pub camera_device_id: String,
    pub operator_notes: String,
    pub units: String,
}

impl ScanSession {
    pub fn new(
        session_id: impl Into<String>,
        camera_device_id: impl Into<String>,
        operator_notes: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            started_at_ms: now_millis(),
            camera_device_id: camera_device_id.into(),
            operator_notes: operator_notes.into(),
            units: "mm".to_string(),
        }
    }

    /// Copy of this session routed to a different camera device.
    pub fn with_camera_device(&self, device_id: impl Into<String>) -> Self {
        Self {
            camera_device_id: device_id.into(),
            ..self.clone()
        }
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
