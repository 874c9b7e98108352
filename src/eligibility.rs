//! Registration eligibility
//!
//! Decides whether a member may open the registration form. The caller
//! flattens whatever the platform knows about the member (role ids, role
//! names) into a set of string tokens; the gate only checks for the
//! configured verified token and for an open tournament.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role a member must hold unless configured otherwise
pub const DEFAULT_VERIFIED_ROLE: &str = "🌐 Verified";

const NO_TOURNAMENT_MESSAGE: &str =
    "⚠️ There are currently no active tournaments. Registration is disabled.";
const NOT_VERIFIED_MESSAGE: &str = "❌ You must verify your profile first!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    DenyNotVerified,
    DenyNoTournament,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Text shown to the member when the gate refuses them
    pub fn denial_message(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::DenyNotVerified => Some(NOT_VERIFIED_MESSAGE),
            Decision::DenyNoTournament => Some(NO_TOURNAMENT_MESSAGE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EligibilityGate {
    verified_token: String,
}

impl EligibilityGate {
    pub fn new(verified_token: impl Into<String>) -> Self {
        Self {
            verified_token: verified_token.into(),
        }
    }

    pub fn verified_token(&self) -> &str {
        &self.verified_token
    }

    /// Evaluate a member against the open tournament roster.
    ///
    /// An empty roster wins over a missing role so that members are told
    /// registration is closed rather than asked to verify for nothing.
    pub fn evaluate(&self, attributes: &HashSet<String>, open_tournaments: &[String]) -> Decision {
        if open_tournaments.is_empty() {
            return Decision::DenyNoTournament;
        }
        if !attributes.contains(&self.verified_token) {
            return Decision::DenyNotVerified;
        }
        Decision::Allow
    }
}

impl Default for EligibilityGate {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFIED_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(tokens: &[&str]) -> HashSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn roster() -> Vec<String> {
        vec!["Spring Showdown 2025".to_string()]
    }

    #[test]
    fn test_verified_member_with_open_tournament_is_allowed() {
        let gate = EligibilityGate::default();
        let decision = gate.evaluate(&attrs(&["Member", DEFAULT_VERIFIED_ROLE]), &roster());
        assert_eq!(decision, Decision::Allow);
        assert!(decision.is_allowed());
        assert_eq!(decision.denial_message(), None);
    }

    #[test]
    fn test_unverified_member_is_denied() {
        let gate = EligibilityGate::default();
        for tokens in [&[][..], &["Member"][..], &["Verified"][..]] {
            let decision = gate.evaluate(&attrs(tokens), &roster());
            assert_eq!(decision, Decision::DenyNotVerified);
        }
    }

    #[test]
    fn test_empty_roster_takes_precedence() {
        let gate = EligibilityGate::default();
        assert_eq!(
            gate.evaluate(&attrs(&[]), &[]),
            Decision::DenyNoTournament
        );
        assert_eq!(
            gate.evaluate(&attrs(&[DEFAULT_VERIFIED_ROLE]), &[]),
            Decision::DenyNoTournament
        );
    }

    #[test]
    fn test_custom_token() {
        let gate = EligibilityGate::new("1377000000000000001");
        assert_eq!(
            gate.evaluate(&attrs(&["1377000000000000001"]), &roster()),
            Decision::Allow
        );
        assert_eq!(
            gate.evaluate(&attrs(&[DEFAULT_VERIFIED_ROLE]), &roster()),
            Decision::DenyNotVerified
        );
    }

    #[test]
    fn test_denial_messages() {
        assert!(Decision::DenyNoTournament
            .denial_message()
            .unwrap()
            .contains("no active tournaments"));
        assert!(Decision::DenyNotVerified
            .denial_message()
            .unwrap()
            .contains("verify your profile"));
    }
}
