//! Registration form handling
//!
//! Builds the registration modal and turns a submitted modal into a stored
//! registration:
//! 1. trim the primary name and reject it if blank
//! 2. trim teammates, drop blanks, keep order, ignore extras
//! 3. pack teammates into the fixed teammate slots
//! 4. insert exactly one row

use crate::error::{SubmitError, ValidationError};
use crate::platform::{Component, UserId};
use crate::registration_store::{NewRegistration, SubmissionStore, TeammateSlots, TEAMMATE_SLOTS};
use std::sync::Arc;
use tracing::{error, info};

/// Custom id of the registration modal
pub const MODAL_CUSTOM_ID: &str = "register_modal";
pub const MODAL_TITLE: &str = "Tournament Registration";

pub const PRIMARY_FIELD_ID: &str = "primary_name";
pub const TEAMMATE_FIELD_IDS: [&str; TEAMMATE_SLOTS] = ["teammate_1", "teammate_2", "teammate_3"];

const EMPTY_NAME_MESSAGE: &str = "❌ Your in-game name cannot be empty.";
const STORAGE_FAILURE_MESSAGE: &str =
    "❌ Registration could not be saved. Please try again later.";

/// Result of a successful submission, echoed back to the member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub registration_id: i64,
    pub primary_name: String,
    pub teammates: Vec<String>,
}

impl SubmissionReceipt {
    pub fn confirmation_message(&self) -> String {
        let teammates = if self.teammates.is_empty() {
            "None".to_string()
        } else {
            self.teammates.join(", ")
        };
        format!(
            "✅ Registration successful!\nYour IGN: {}\nTeammates: {}",
            self.primary_name, teammates
        )
    }
}

impl SubmitError {
    /// Text shown to the member. Storage details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmitError::Validation(ValidationError::EmptyPrimaryName) => EMPTY_NAME_MESSAGE,
            SubmitError::Storage(_) => STORAGE_FAILURE_MESSAGE,
        }
    }
}

/// Trim and validate raw form values
pub fn normalize<S: AsRef<str>>(
    raw_primary_name: &str,
    raw_teammates: &[S],
) -> Result<(String, Vec<String>), ValidationError> {
    let primary_name = raw_primary_name.trim();
    if primary_name.is_empty() {
        return Err(ValidationError::EmptyPrimaryName);
    }

    let teammates = raw_teammates
        .iter()
        .take(TEAMMATE_SLOTS)
        .map(|raw| raw.as_ref().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    Ok((primary_name.to_string(), teammates))
}

/// The four modal field values, primary name first. Missing fields read as
/// empty strings.
pub fn field_values(components: &[Component]) -> Vec<String> {
    std::iter::once(PRIMARY_FIELD_ID)
        .chain(TEAMMATE_FIELD_IDS)
        .map(|field| {
            components
                .iter()
                .find_map(|c| c.find_value(field))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Modal components: one text input per action row
pub fn modal_components() -> Vec<Component> {
    let mut rows = vec![Component::action_row(vec![Component::text_input(
        PRIMARY_FIELD_ID,
        "Your Minecraft IGN",
        true,
    )
    .with_placeholder("Enter your username")])];

    for (i, field) in TEAMMATE_FIELD_IDS.iter().enumerate() {
        rows.push(Component::action_row(vec![Component::text_input(
            field,
            &format!("Teammate {} (optional)", i + 1),
            false,
        )]));
    }
    rows
}

#[derive(Clone)]
pub struct RegistrationForm {
    store: Arc<dyn SubmissionStore>,
}

impl RegistrationForm {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// Validate and record one submission. Nothing is written unless the
    /// input is valid; a failed insert is returned, not retried.
    pub fn submit<S: AsRef<str>>(
        &self,
        submitter_id: UserId,
        raw_primary_name: &str,
        raw_teammates: &[S],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let (primary_name, teammates) = normalize(raw_primary_name, raw_teammates)?;

        let registration = NewRegistration {
            submitter_id,
            primary_name,
            teammates: TeammateSlots::pack(teammates.iter().cloned()),
        };

        let stored = self.store.insert(&registration).map_err(|e| {
            error!(
                "Failed to store registration for user {}: {}",
                submitter_id, e
            );
            e
        })?;

        info!(
            "Registration #{} stored for user {} ({} teammate(s))",
            stored.id,
            submitter_id,
            teammates.len()
        );

        Ok(SubmissionReceipt {
            registration_id: stored.id,
            primary_name: stored.primary_name,
            teammates,
        })
    }

    /// Submit the raw modal field values (slot 0 is the primary name)
    pub fn submit_fields(
        &self,
        submitter_id: UserId,
        fields: &[String],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let (primary, teammates) = match fields.split_first() {
            Some((primary, rest)) => (primary.as_str(), rest),
            None => ("", &[][..]),
        };
        self.submit(submitter_id, primary, teammates)
    }
}
