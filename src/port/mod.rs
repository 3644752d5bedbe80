//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Every port here is outbound: the application calls it, an adapter
//! implements it.
//!
//! ```text
//!               ┌──────────────────────────────┐
//!               │  RoomService · Settler loops │
//!               │  ChatCoordinator · Wallet    │
//!               └──────────────┬───────────────┘
//!        ┌──────────┬──────────┼──────────┬───────────┐
//!        ▼          ▼          ▼          ▼           ▼
//!   RoomStore  LedgerStore PriceOracle ChannelProvider Custody
//!   ChatPoolStore SessionStore          Notifier
//! ```

pub mod outbound;
