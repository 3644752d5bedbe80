//! Room use cases.

mod service;

pub use service::{RoomDetails, RoomService};
