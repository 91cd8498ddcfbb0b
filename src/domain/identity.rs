// Session identity - opaque keys resolved once at session start
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Checkpoint key
    pub username: String,
    /// Time-series key
    pub subject_id: u32,
    /// Selects the recorded dataset instead of the synthetic one
    pub use_real_data: bool,
}

impl SessionIdentity {
    pub fn new(username: impl Into<String>, subject_id: u32, use_real_data: bool) -> Self {
        Self {
            username: username.into(),
            subject_id,
            use_real_data,
        }
    }
}
