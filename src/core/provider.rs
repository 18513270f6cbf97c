use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::message::Sender;

/// A destination for one user turn: a single provider, or the combined
/// all-provider dialog the backend runs server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTarget {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "anthropic")]
    Anthropic,
    #[value(name = "all")]
    All,
}

impl ProviderTarget {
    /// Wire name used in request payloads and on the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderTarget::OpenAi => "openai",
            ProviderTarget::Anthropic => "anthropic",
            ProviderTarget::All => "all",
        }
    }

    /// Transcript sender for responses from this target. The combined
    /// dialog's verdict is attributed to the `final` sender.
    pub fn sender(self) -> Sender {
        match self {
            ProviderTarget::OpenAi => Sender::OpenAi,
            ProviderTarget::Anthropic => Sender::Anthropic,
            ProviderTarget::All => Sender::Final,
        }
    }

    pub fn is_combined(self) -> bool {
        self == ProviderTarget::All
    }
}

impl std::fmt::Display for ProviderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderTarget {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "openai" => Ok(ProviderTarget::OpenAi),
            "anthropic" => Ok(ProviderTarget::Anthropic),
            "all" => Ok(ProviderTarget::All),
            _ => Err(format!("unknown provider: {value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for target in [
            ProviderTarget::OpenAi,
            ProviderTarget::Anthropic,
            ProviderTarget::All,
        ] {
            assert_eq!(ProviderTarget::try_from(target.as_str()), Ok(target));
        }
        assert!(ProviderTarget::try_from("mistral").is_err());
    }

    #[test]
    fn combined_target_maps_to_final_sender() {
        assert_eq!(ProviderTarget::All.sender(), Sender::Final);
        assert!(ProviderTarget::All.is_combined());
        assert!(!ProviderTarget::OpenAi.is_combined());
    }
}
