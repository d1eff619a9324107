// src/identifiers.rs
// ============================================================================
// Module: Orchestrator Identifiers
// Description: Newtype identifiers used across the orchestrator core.
// Purpose: Prevent accidental mixing of unrelated string identifiers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every identifier that crosses a component boundary is wrapped in its own
//! type so that, for example, a `DecisionId` can never be passed where a
//! `CorrelationId` is expected.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

macro_rules! string_identifier {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds an identifier from any owned or borrowed string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_identifier!(CorrelationId, "Identifies one inbound event across its lifetime.");
string_identifier!(DecisionId, "Identifies one persisted Decision row.");
string_identifier!(PlanId, "Identifies one Plan definition.");
string_identifier!(ExecutionId, "Identifies one Plan execution attempt.");
string_identifier!(StepId, "Identifies one PlanStep within its owning Plan.");

impl CorrelationId {
    /// Generates a random 128-bit correlation id, hex-encoded.
    ///
    /// Used when an inbound event omits `correlation_id`.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        let mut hex = String::with_capacity(32);
        for byte in bytes {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }
}
