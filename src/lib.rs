//! Tournament Registration Bot
//!
//! Keeps a persistent "Register" prompt in a Discord channel, lets verified
//! members open a registration form while a tournament is open, and records
//! each accepted submission in SQLite.
//!
//! ## Module Structure
//!
//! - `platform/`: Discord object model and the `ChatTransport` seam
//! - `discord_client`: REST implementation of `ChatTransport`
//! - `eligibility`: verified-role / open-tournament gate
//! - `registration_form`: modal definition, validation, submission
//! - `registration_store`: SQLite registrations table
//! - `prompt`: startup scan, resume or post of the prompt
//! - `interactions`: interaction model and dispatch table
//! - `server`: signed interactions endpoint
//! - `context`: process-wide context
//! - `config`: file and CLI configuration

pub mod config;
pub mod context;
pub mod discord_client;
pub mod eligibility;
pub mod error;
pub mod interactions;
pub mod platform;
pub mod prompt;
pub mod registration_form;
pub mod registration_store;
pub mod server;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::BotConfig;
pub use context::AppContext;
pub use discord_client::DiscordClient;
pub use eligibility::{Decision, EligibilityGate};
pub use error::{
    ConfigError, PromptError, StorageError, SubmitError, TransportError, ValidationError,
};
pub use interactions::{Interaction, InteractionResponse, InteractionRouter};
pub use platform::{ChannelId, ChatTransport, GuildId, UserId};
pub use prompt::{PromptLifecycle, PromptState, REGISTER_BUTTON_ID};
pub use registration_form::{RegistrationForm, SubmissionReceipt};
pub use registration_store::{
    Registration, SqliteSubmissionStore, SubmissionStore, TeammateSlots,
};
pub use server::{ServerState, SignatureVerifier};
