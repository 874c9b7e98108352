//! Process-wide context
//!
//! Built once at startup and shared by reference with every handler.

use crate::config::BotConfig;
use crate::eligibility::EligibilityGate;
use crate::error::{ConfigError, PromptError};
use crate::platform::ChatTransport;
use crate::prompt::{PromptLifecycle, PromptState, DEFAULT_PROMPT_TEXT};
use crate::registration_form::RegistrationForm;
use crate::registration_store::SubmissionStore;
use std::sync::Arc;
use tracing::{error, info};

pub struct AppContext {
    pub config: BotConfig,
    pub gate: EligibilityGate,
    pub form: RegistrationForm,
    pub store: Arc<dyn SubmissionStore>,
    pub transport: Arc<dyn ChatTransport>,
    pub prompt_text: String,
}

impl AppContext {
    pub fn new(
        config: BotConfig,
        store: Arc<dyn SubmissionStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            gate: EligibilityGate::new(config.registration.verified_role.clone()),
            form: RegistrationForm::new(store.clone()),
            store,
            transport,
            prompt_text: DEFAULT_PROMPT_TEXT.to_string(),
            config,
        }
    }

    /// Make sure the registration channel hosts a prompt.
    ///
    /// Failures are logged and returned; they never take the process down,
    /// since interaction handling works without this step.
    pub async fn start_prompt(&self) -> Result<PromptState, PromptError> {
        let Some(channel) = self.config.registration.channel_id else {
            error!("No registration channel configured; skipping prompt startup");
            return Err(PromptError::Configuration(ConfigError::Missing(
                "registration.channel_id",
            )));
        };

        let mut lifecycle = PromptLifecycle::new(
            self.transport.clone(),
            channel,
            self.prompt_text.clone(),
            self.config.registration.history_window,
        );

        match lifecycle.ensure_prompt().await {
            Ok(state) => {
                info!("Registration prompt ready in channel {}: {:?}", channel, state);
                Ok(state)
            }
            Err(e) => {
                error!("Registration prompt startup aborted: {}", e);
                Err(e)
            }
        }
    }
}
