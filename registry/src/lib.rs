//! Agent registry for the voice-agent admin console.
//!
//! Holds the agent records, derives the filtered and paginated view the
//! console lists, and signs operators in against the authentication service.

pub mod auth;
pub mod errors;
pub mod projection;
pub mod record;
pub mod registry;
pub mod session;

pub use auth::{
    AuthError, AuthService, Credentials, HttpAuthService, LoginFlow, LoginOutcome, LoginReply,
    LoginRequest,
};
pub use errors::{RegistryError, Result};
pub use projection::{project, Page, PageSizes, StatusFilter, ViewQuery};
pub use record::{sample_agents, AgentProfile, AgentRecord};
pub use registry::{set_status, AgentDraft, AgentRegistry, VOICES};
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionStore};
