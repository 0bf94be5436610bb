use serde::{Deserialize, Serialize};

/// Display format of `created_at`/`updated_at`, e.g. `12 Aug, 2025`.
pub const DISPLAY_DATE_FORMAT: &str = "%d %b, %Y";

/// One manageable voice agent.
///
/// Dates are display strings and are never parsed. `id` is not guaranteed to
/// be unique: the seed data ships four agents sharing `V - 1234`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub voice: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<AgentProfile>,
}

impl AgentRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        created_at: impl Into<String>,
        updated_at: impl Into<String>,
        voice: impl Into<String>,
        active: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: created_at.into(),
            updated_at: updated_at.into(),
            voice: voice.into(),
            active,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: AgentProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// `needle` must already be lowercase.
    pub(crate) fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        [&self.id, &self.name, &self.voice]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub transcript_language: String,
}

/// Seed agents the console starts with.
pub fn sample_agents() -> Vec<AgentRecord> {
    vec![
        AgentRecord::new("V - 1234", "Neha", "12 Aug, 2025", "12 Aug, 2025", "Elliot", true),
        AgentRecord::new("V - 1234", "Sneha", "12 Aug, 2025", "12 Aug, 2025", "Cope", true),
        AgentRecord::new("V - 1234", "Shubham", "12 Aug, 2025", "12 Aug, 2025", "Elliot", true),
        AgentRecord::new("V - 1234", "Vikram", "12 Aug, 2025", "12 Aug, 2025", "Elliot", true),
        AgentRecord::new("V - 1235", "Aditi", "13 Aug, 2025", "14 Aug, 2025", "Shimmer", false),
    ]
}
