//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies such as storage,
//! oracle feeds, channel providers, custody and notifications.

pub mod channel;
pub mod custody;
pub mod notifier;
pub mod oracle;
pub mod store;

pub use channel::{ChannelProvider, NullChannel};
pub use custody::{Credential, Custody, Secret};
pub use notifier::{
    Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier, ParticipantOutcome,
    SettleTrigger, SettlementEvent,
};
pub use oracle::PriceOracle;
pub use store::{
    ChatPoolStore, LedgerStore, Page, RoomStore, SessionStore, SettleOutcome, SettleRequest,
    SettlementReceipt, Wager,
};
