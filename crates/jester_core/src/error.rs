use miette::Diagnostic;
use thiserror::Error;

use crate::{Doubloons, PlayerId, Rank};

#[derive(Error, Diagnostic, Debug)]
pub enum EconomyError {
    #[error("Player not found")]
    #[diagnostic(
        code(jester_core::player_not_found),
        help("Player {player} has not joined the Court yet; they must join first")
    )]
    PlayerNotFound { player: PlayerId },

    #[error("Player already joined")]
    #[diagnostic(
        code(jester_core::already_joined),
        help("Player {player} is already in the Court as {rank}")
    )]
    AlreadyJoined { player: PlayerId, rank: Rank },

    #[error("Item not found")]
    #[diagnostic(
        code(jester_core::item_not_found),
        help("Available items: {}", available.join(", "))
    )]
    ItemNotFound {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("Insufficient doubloons")]
    #[diagnostic(
        code(jester_core::insufficient_funds),
        help("{player} needs {required} doubloons but holds {available}")
    )]
    InsufficientFunds {
        player: PlayerId,
        required: Doubloons,
        available: Doubloons,
    },

    #[error("Item not owned")]
    #[diagnostic(
        code(jester_core::item_not_owned),
        help("{player} does not own '{item}'")
    )]
    ItemNotOwned { player: PlayerId, item: String },

    #[error("Daily doubloons already collected")]
    #[diagnostic(
        code(jester_core::cooldown_active),
        help("{player} can claim again in {remaining_secs} seconds")
    )]
    CooldownActive {
        player: PlayerId,
        remaining_secs: i64,
    },

    #[error("Not privileged")]
    #[diagnostic(
        code(jester_core::not_privileged),
        help("{player} lacks the standing to {action}")
    )]
    NotPrivileged { player: PlayerId, action: String },

    #[error("Trade offer already pending")]
    #[diagnostic(
        code(jester_core::offer_pending),
        help("{recipient} already has an offer from {sender}; it must be accepted, rejected or cancelled first")
    )]
    OfferPending {
        recipient: PlayerId,
        sender: PlayerId,
    },

    #[error("No pending trade offer")]
    #[diagnostic(
        code(jester_core::no_pending_offer),
        help("{recipient} has no matching trade offer")
    )]
    NoPendingOffer { recipient: PlayerId },

    #[error("Doubloons already on the floor")]
    #[diagnostic(
        code(jester_core::drop_pending),
        help("{dropper} dropped {amount} doubloons that nobody has picked up yet")
    )]
    DropPending {
        dropper: PlayerId,
        amount: Doubloons,
    },

    #[error("Nothing to pick up")]
    #[diagnostic(
        code(jester_core::nothing_dropped),
        help("No doubloons are on the floor right now")
    )]
    NothingDropped,

    #[error("Invalid argument")]
    #[diagnostic(code(jester_core::invalid_argument), help("{reason}"))]
    InvalidArgument { argument: String, reason: String },

    #[error("Ledger storage corrupt")]
    #[diagnostic(
        code(jester_core::storage_corrupt),
        help("The ledger at {location} could not be parsed and was reset to an empty document")
    )]
    StorageCorrupt {
        location: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Ledger persistence failed")]
    #[diagnostic(
        code(jester_core::persistence_failed),
        help("Failed to {operation} the ledger at {location}; the command was not applied")
    )]
    PersistenceFailed {
        location: String,
        operation: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error")]
    #[diagnostic(
        code(jester_core::configuration_error),
        help("Check configuration at {config_path}: expected {expected} for '{field}'")
    )]
    Configuration {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, EconomyError>;

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct StringError(pub(crate) String);

impl EconomyError {
    pub fn player_not_found(player: &PlayerId) -> Self {
        Self::PlayerNotFound {
            player: player.clone(),
        }
    }

    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_funds(player: &PlayerId, required: Doubloons, available: Doubloons) -> Self {
        Self::InsufficientFunds {
            player: player.clone(),
            required,
            available,
        }
    }

    pub fn not_privileged(player: &PlayerId, action: impl Into<String>) -> Self {
        Self::NotPrivileged {
            player: player.clone(),
            action: action.into(),
        }
    }

    pub fn persistence_failed(
        location: impl Into<String>,
        operation: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PersistenceFailed {
            location: location.into(),
            operation: operation.into(),
            cause: Box::new(cause),
        }
    }

    pub fn storage_corrupt(
        location: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageCorrupt {
            location: location.into(),
            cause: Box::new(cause),
        }
    }

    pub fn configuration(
        config_path: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            config_path: config_path.into(),
            field: field.into(),
            expected: expected.into(),
            cause: Box::new(StringError(cause.into())),
        }
    }

    /// Storage failures are the only errors a dispatcher should treat as
    /// faults; everything else is an ordinary domain outcome to report back.
    pub fn is_exceptional(&self) -> bool {
        matches!(
            self,
            Self::StorageCorrupt { .. } | Self::PersistenceFailed { .. } | Self::Configuration { .. }
        )
    }
}
