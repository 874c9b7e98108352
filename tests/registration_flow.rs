//! Integration tests for the registration flow
//!
//! Drives the router and prompt lifecycle together over the in-memory
//! transport: restart behaviour, gate-to-form hand-off and concurrent
//! submissions against an on-disk store.

use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use tourney_signup::interactions::{
    INTERACTION_MESSAGE_COMPONENT, INTERACTION_MODAL_SUBMIT, RESPONSE_MODAL,
};
use tourney_signup::platform::memory::MemoryTransport;
use tourney_signup::platform::{RoleId, User};
use tourney_signup::prompt::is_registration_prompt;
use tourney_signup::registration_form::MODAL_CUSTOM_ID;
use tourney_signup::{
    AppContext, BotConfig, ChannelId, GuildId, Interaction, InteractionRouter, PromptError,
    PromptState, SqliteSubmissionStore, SubmissionStore, UserId, REGISTER_BUTTON_ID,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

const CHANNEL: ChannelId = ChannelId(1377744313840173096);
const GUILD: GuildId = GuildId(1371506090382069881);
const VERIFIED: RoleId = RoleId(31337);

fn bot() -> User {
    User {
        id: UserId(1),
        username: "registrar".to_string(),
    }
}

fn config() -> BotConfig {
    let mut config = BotConfig::default();
    config.registration.channel_id = Some(CHANNEL);
    config.registration.tournaments = vec!["Spring Showdown 2025".to_string()];
    config.discord.guild_id = Some(GUILD);
    config
}

fn transport() -> Arc<MemoryTransport> {
    let transport = Arc::new(MemoryTransport::new(bot()));
    transport.add_channel(CHANNEL);
    transport.add_role(GUILD, VERIFIED, "🌐 Verified");
    transport
}

fn context(
    transport: &Arc<MemoryTransport>,
    store: &SqliteSubmissionStore,
) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        config(),
        Arc::new(store.clone()),
        transport.clone(),
    ))
}

fn live_prompts(transport: &MemoryTransport) -> usize {
    transport
        .messages(CHANNEL)
        .iter()
        .filter(|m| is_registration_prompt(m, bot().id))
        .count()
}

fn modal_submit(user: u64, primary: &str) -> Interaction {
    serde_json::from_value(json!({
        "type": INTERACTION_MODAL_SUBMIT,
        "member": {"user": {"id": user.to_string()}, "roles": [VERIFIED.to_string()]},
        "data": {
            "custom_id": MODAL_CUSTOM_ID,
            "components": [
                {"type": 1, "components": [{"type": 4, "custom_id": "primary_name", "value": primary}]},
                {"type": 1, "components": [{"type": 4, "custom_id": "teammate_1", "value": "Alex"}]}
            ]
        }
    }))
    .unwrap()
}

// ============================================================================
// PROMPT LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_restarts_keep_a_single_prompt() {
    let transport = transport();
    let store = SqliteSubmissionStore::in_memory().unwrap();

    let first = context(&transport, &store).start_prompt().await.unwrap();
    assert!(matches!(first, PromptState::Posted(_)));

    // Second and third process starts find the prompt from the first one
    for _ in 0..2 {
        let state = context(&transport, &store).start_prompt().await.unwrap();
        assert!(matches!(state, PromptState::Found(_)));
    }

    assert_eq!(transport.sent_count(), 1);
    assert_eq!(live_prompts(&transport), 1);
}

#[tokio::test]
async fn test_missing_channel_aborts_prompt_only() {
    let transport = Arc::new(MemoryTransport::new(bot()));
    let store = SqliteSubmissionStore::in_memory().unwrap();
    let ctx = context(&transport, &store);

    let err = ctx.start_prompt().await.unwrap_err();
    assert!(matches!(err, PromptError::Configuration(_)));

    // Submissions still work without a prompt
    let router = InteractionRouter::new(ctx);
    let response = router.dispatch(&modal_submit(42, "Steve")).await;
    assert!(response.content().unwrap().starts_with("✅"));
    assert_eq!(store.count().unwrap(), 1);
}

// ============================================================================
// BUTTON TO FORM
// ============================================================================

#[tokio::test]
async fn test_button_press_then_submit() {
    let transport = transport();
    let store = SqliteSubmissionStore::in_memory().unwrap();
    let ctx = context(&transport, &store);
    ctx.start_prompt().await.unwrap();

    // Handlers come from a fresh router, not from the message that was posted
    let router = InteractionRouter::new(ctx);

    let press: Interaction = serde_json::from_value(json!({
        "type": INTERACTION_MESSAGE_COMPONENT,
        "channel_id": CHANNEL.to_string(),
        "member": {"user": {"id": "42"}, "roles": [VERIFIED.to_string()]},
        "data": {"custom_id": REGISTER_BUTTON_ID}
    }))
    .unwrap();
    let response = router.dispatch(&press).await;
    assert_eq!(response.kind, RESPONSE_MODAL);

    let response = router.dispatch(&modal_submit(42, " Steve ")).await;
    assert!(response.is_ephemeral());
    assert_eq!(
        response.content(),
        Some("✅ Registration successful!\nYour IGN: Steve\nTeammates: Alex")
    );
    assert_eq!(store.count().unwrap(), 1);
}

// ============================================================================
// CONCURRENT SUBMISSIONS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_on_disk() {
    let dir = tempdir().unwrap();
    let store = SqliteSubmissionStore::open(&dir.path().join("registrations.db")).unwrap();
    let router = Arc::new(InteractionRouter::new(context(&transport(), &store)));

    let tasks = (0..32u64).map(|user| {
        let router = router.clone();
        tokio::spawn(async move {
            router
                .dispatch(&modal_submit(1000 + user, &format!("player{}", user)))
                .await
        })
    });
    let responses = futures::future::join_all(tasks).await;

    for response in responses {
        let response = response.unwrap();
        assert!(response.content().unwrap().starts_with("✅"));
    }

    assert_eq!(store.count().unwrap(), 32);
    let mut ids = Vec::new();
    for user in 0..32u64 {
        let rows = store.list_by_submitter(UserId(1000 + user)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary_name, format!("player{}", user));
        assert_eq!(rows[0].teammates.names(), vec!["Alex"]);
        ids.push(rows[0].id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 32);
}
