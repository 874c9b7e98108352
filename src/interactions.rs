//! Interaction routing
//!
//! Every inbound interaction gets exactly one response. Button presses and
//! modal submits are routed by interaction type and custom id through a
//! table rebuilt at each startup, so prompts posted by an earlier process
//! keep working.

use crate::context::AppContext;
use crate::eligibility::Decision;
use crate::platform::{ChannelId, Component, GuildId, OutgoingMessage, RoleId, User, UserId};
use crate::prompt::{prompt_message, REGISTER_BUTTON_ID};
use crate::registration_form::{self, MODAL_CUSTOM_ID, MODAL_TITLE};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Slash command that re-posts the prompt
pub const POST_PROMPT_COMMAND: &str = "post_register_message";

/// `ADMINISTRATOR` permission bit
pub const ADMINISTRATOR_PERMISSION: u64 = 1 << 3;

const EPHEMERAL_FLAG: u64 = 1 << 6;

const NOT_ADMIN_MESSAGE: &str = "❌ You need administrator permission to use this command.";
const UNKNOWN_INTERACTION_MESSAGE: &str = "⚠️ This interaction is no longer supported.";

// ============================================================================
// WIRE MODEL
// ============================================================================

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;
pub const INTERACTION_MODAL_SUBMIT: u8 = 5;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_MODAL: u8 = 9;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    /// Present for interactions inside a guild
    #[serde(default)]
    pub member: Option<Member>,
    /// Present for interactions in DMs
    #[serde(default)]
    pub user: Option<User>,
}

impl Interaction {
    pub fn invoker(&self) -> Option<UserId> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Permission bitfield as a decimal string
    #[serde(default)]
    pub permissions: Option<String>,
}

impl Member {
    pub fn is_administrator(&self) -> bool {
        self.permissions
            .as_deref()
            .and_then(|p| p.parse::<u64>().ok())
            .map(|bits| bits & ADMINISTRATOR_PERMISSION != 0)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    /// Command name
    #[serde(default)]
    pub name: Option<String>,
    /// Component or modal custom id
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Modal rows
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    /// Reply visible only to the invoker
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: Some(content.into()),
                flags: Some(EPHEMERAL_FLAG),
                ..Default::default()
            }),
        }
    }

    /// Reply visible to the whole channel
    pub fn channel_message(message: OutgoingMessage) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: Some(message.content),
                components: message.components,
                ..Default::default()
            }),
        }
    }

    pub fn modal(custom_id: &str, title: &str, components: Vec<Component>) -> Self {
        Self {
            kind: RESPONSE_MODAL,
            data: Some(ResponseData {
                custom_id: Some(custom_id.to_string()),
                title: Some(title.to_string()),
                components,
                ..Default::default()
            }),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.flags)
            .is_some_and(|f| f & EPHEMERAL_FLAG != 0)
    }

    pub fn content(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.content.as_deref())
    }
}

// ============================================================================
// ROUTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRoute {
    RegisterButton,
    RegistrationModal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRoute {
    PostPrompt,
}

pub struct InteractionRouter {
    ctx: Arc<AppContext>,
    /// Interaction type, then custom id
    components: HashMap<u8, HashMap<&'static str, ComponentRoute>>,
    commands: HashMap<&'static str, CommandRoute>,
}

impl InteractionRouter {
    /// Build the dispatch tables. Called once per process start.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let components = HashMap::from([
            (
                INTERACTION_MESSAGE_COMPONENT,
                HashMap::from([(REGISTER_BUTTON_ID, ComponentRoute::RegisterButton)]),
            ),
            (
                INTERACTION_MODAL_SUBMIT,
                HashMap::from([(MODAL_CUSTOM_ID, ComponentRoute::RegistrationModal)]),
            ),
        ]);
        let commands = HashMap::from([(POST_PROMPT_COMMAND, CommandRoute::PostPrompt)]);
        debug!(
            "Registered {} component handler(s) and {} command(s)",
            components.values().map(HashMap::len).sum::<usize>(),
            commands.len()
        );
        Self {
            ctx,
            components,
            commands,
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub async fn dispatch(&self, interaction: &Interaction) -> InteractionResponse {
        let data = interaction.data.clone().unwrap_or_default();
        match interaction.kind {
            INTERACTION_PING => InteractionResponse::pong(),
            INTERACTION_APPLICATION_COMMAND => {
                let name = data.name.as_deref().unwrap_or_default();
                match self.commands.get(name) {
                    Some(CommandRoute::PostPrompt) => self.post_prompt(interaction),
                    None => unknown("command", name),
                }
            }
            INTERACTION_MESSAGE_COMPONENT | INTERACTION_MODAL_SUBMIT => {
                let custom_id = data.custom_id.as_deref().unwrap_or_default();
                let route = self
                    .components
                    .get(&interaction.kind)
                    .and_then(|table| table.get(custom_id));
                match route {
                    Some(ComponentRoute::RegisterButton) => self.register_button(interaction).await,
                    Some(ComponentRoute::RegistrationModal) => {
                        self.registration_modal(interaction, &data.components)
                    }
                    None => unknown("component", custom_id),
                }
            }
            other => unknown("interaction type", &other.to_string()),
        }
    }

    /// Gate the button press, then open the form
    async fn register_button(&self, interaction: &Interaction) -> InteractionResponse {
        let attributes = self.member_attributes(interaction).await;
        let decision = self
            .ctx
            .gate
            .evaluate(&attributes, &self.ctx.config.registration.tournaments);

        if let Some(message) = decision.denial_message() {
            info!(
                "Registration denied for user {:?}: {:?}",
                interaction.invoker(),
                decision
            );
            return InteractionResponse::ephemeral(message);
        }
        debug_assert_eq!(decision, Decision::Allow);

        InteractionResponse::modal(
            MODAL_CUSTOM_ID,
            MODAL_TITLE,
            registration_form::modal_components(),
        )
    }

    fn registration_modal(
        &self,
        interaction: &Interaction,
        components: &[Component],
    ) -> InteractionResponse {
        let Some(submitter) = interaction.invoker() else {
            warn!("Modal submission without an invoking user");
            return InteractionResponse::ephemeral(UNKNOWN_INTERACTION_MESSAGE);
        };

        let fields = registration_form::field_values(components);
        match self.ctx.form.submit_fields(submitter, &fields) {
            Ok(receipt) => InteractionResponse::ephemeral(receipt.confirmation_message()),
            Err(e) => {
                info!("Registration from user {} rejected: {}", submitter, e);
                InteractionResponse::ephemeral(e.user_message())
            }
        }
    }

    /// Post the prompt in the invoking channel, unconditionally
    fn post_prompt(&self, interaction: &Interaction) -> InteractionResponse {
        let is_admin = interaction
            .member
            .as_ref()
            .is_some_and(Member::is_administrator);
        if !is_admin {
            warn!(
                "User {:?} tried to post the registration prompt without permission",
                interaction.invoker()
            );
            return InteractionResponse::ephemeral(NOT_ADMIN_MESSAGE);
        }

        info!(
            "Posting registration prompt in channel {:?} on request of {:?}",
            interaction.channel_id,
            interaction.invoker()
        );
        InteractionResponse::channel_message(prompt_message(&self.ctx.prompt_text))
    }

    /// Role ids plus role names for the invoking member. Name resolution is
    /// bounded by the response deadline; on failure only ids are used.
    async fn member_attributes(&self, interaction: &Interaction) -> HashSet<String> {
        let Some(member) = interaction.member.as_ref() else {
            return HashSet::new();
        };

        let mut attributes: HashSet<String> =
            member.roles.iter().map(|r| r.to_string()).collect();

        let Some(guild) = interaction.guild_id.or(self.ctx.config.discord.guild_id) else {
            return attributes;
        };
        if member.roles.is_empty() {
            return attributes;
        }

        let deadline = self.ctx.config.registration.response_deadline();
        match tokio::time::timeout(deadline, self.ctx.transport.guild_role_names(guild)).await {
            Ok(Ok(names)) => {
                attributes.extend(
                    member
                        .roles
                        .iter()
                        .filter_map(|role| names.get(role).cloned()),
                );
            }
            Ok(Err(e)) => warn!("Failed to resolve role names for guild {}: {}", guild, e),
            Err(_) => warn!(
                "Role name lookup for guild {} exceeded {:?}",
                guild, deadline
            ),
        }
        attributes
    }
}

fn unknown(what: &str, name: &str) -> InteractionResponse {
    warn!("Unhandled {}: {:?}", what, name);
    InteractionResponse::ephemeral(UNKNOWN_INTERACTION_MESSAGE)
}
