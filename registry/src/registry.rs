use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use validator::{Validate, ValidationErrors};

use crate::errors::{RegistryError, Result};
use crate::projection::{project_view, Page, ViewQuery};
use crate::record::{sample_agents, AgentProfile, AgentRecord, DISPLAY_DATE_FORMAT};

/// Voices an agent can be created with.
pub const VOICES: [&str; 3] = ["Elliot", "Cope", "Shimmer"];

const AGENT_ID_PREFIX: &str = "V - ";
const FIRST_AGENT_NUMBER: u64 = 1234;

/// Sets `active` on the first record whose id equals `id`.
///
/// Ids may repeat, so only the earliest match in collection order is touched.
/// Returns `false` and leaves the collection alone when nothing matches.
pub fn set_status(records: &mut [AgentRecord], id: &str, active: bool) -> bool {
    match records.iter_mut().find(|record| record.id == id) {
        Some(record) => {
            record.active = active;
            true
        }
        None => false,
    }
}

/// Unvalidated input of the "Add AI Agent" form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AgentDraft {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "name must be 1-128 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "voice is required"))]
    pub voice: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    #[validate(length(max = 2000, message = "prompt must be at most 2000 characters"))]
    pub prompt: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "transcript output language is required"))]
    pub transcript_language: String,
}

fn default_active() -> bool {
    true
}

impl AgentDraft {
    pub fn new(
        name: impl Into<String>,
        voice: impl Into<String>,
        transcript_language: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            voice: voice.into(),
            active: true,
            prompt: None,
            transcript_language: transcript_language.into(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    fn normalized(self) -> Self {
        let prompt = self
            .prompt
            .map(|prompt| prompt.trim().to_string())
            .filter(|prompt| !prompt.is_empty());
        Self {
            name: self.name.trim().to_string(),
            voice: self.voice.trim().to_string(),
            active: self.active,
            prompt,
            transcript_language: self.transcript_language.trim().to_string(),
        }
    }
}

fn first_violation(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().copied().collect();
    fields.sort_unstable();
    fields
        .into_iter()
        .find_map(|field| {
            field_errors.get(field).and_then(|list| list.first()).map(|err| {
                err.message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .unwrap_or_else(|| "draft is invalid".to_string())
}

fn canonical_voice(raw: &str) -> Result<&'static str> {
    VOICES
        .iter()
        .copied()
        .find(|voice| voice.eq_ignore_ascii_case(raw))
        .ok_or_else(|| RegistryError::UnknownVoice(raw.to_string()))
}

fn next_agent_id(records: &[AgentRecord]) -> String {
    let next = records
        .iter()
        .filter_map(|record| record.id.strip_prefix(AGENT_ID_PREFIX))
        .filter_map(|suffix| suffix.trim().parse::<u64>().ok())
        .max()
        .map(|highest| highest.saturating_add(1))
        .unwrap_or(FIRST_AGENT_NUMBER);
    format!("{AGENT_ID_PREFIX}{next}")
}

/// Owns the agent collection shown by the console.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    records: Vec<AgentRecord>,
}

impl AgentRegistry {
    pub fn new(records: Vec<AgentRecord>) -> Self {
        Self { records }
    }

    pub fn seeded() -> Self {
        Self::new(sample_agents())
    }

    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn project(&self, view: &ViewQuery) -> Page<'_> {
        project_view(&self.records, view)
    }

    #[instrument(skip(self))]
    pub fn set_status(&mut self, id: &str, active: bool) -> bool {
        let updated = set_status(&mut self.records, id, active);
        if updated {
            info!(agent_id = id, active, "agent status changed");
        } else {
            debug!(agent_id = id, "status change ignored, no such agent");
        }
        updated
    }

    pub fn create(&mut self, draft: AgentDraft) -> Result<AgentRecord> {
        self.create_on(draft, Local::now().date_naive())
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn create_on(&mut self, draft: AgentDraft, date: NaiveDate) -> Result<AgentRecord> {
        let draft = draft.normalized();
        draft
            .validate()
            .map_err(|errors| RegistryError::InvalidDraft(first_violation(&errors)))?;
        let voice = canonical_voice(&draft.voice)?;

        let stamp = date.format(DISPLAY_DATE_FORMAT).to_string();
        let record = AgentRecord::new(
            next_agent_id(&self.records),
            draft.name,
            stamp.clone(),
            stamp,
            voice,
            draft.active,
        )
        .with_profile(AgentProfile {
            prompt: draft.prompt,
            transcript_language: draft.transcript_language,
        });
        self.records.push(record.clone());
        info!(agent_id = %record.id, "agent created");
        Ok(record)
    }
}
