//! Real-time multiplexer for the Parlor chat client.
//!
//! One duplex WebSocket connection per authenticated identity carries chat
//! messaging, typing presence and notification delivery. This crate owns the
//! client side of that connection: the connection lifecycle, membership in
//! the single active conversation room, routing of inbound events into the
//! application state store, and debounced typing presence in both directions.
//!
//! The hosting application interacts with three seams:
//! - [`ConnectionManager`](connection::ConnectionManager) for acquire/release
//!   of the singleton connection,
//! - [`RealtimeHandle`](session::RealtimeHandle) for room switches, typing
//!   and read receipts,
//! - [`Dispatcher`](store::Dispatcher) to receive normalized
//!   [`StateAction`](store::StateAction)s.

pub mod config;
pub mod connection;
pub mod error;
pub mod presence;
pub mod room;
pub mod router;
pub mod session;
pub mod store;
pub mod transport;

pub use config::RealtimeConfig;
pub use connection::{ConnectionHealth, ConnectionManager, Identity};
pub use session::RealtimeHandle;
pub use store::{ChatState, Dispatcher, SharedChatState, StateAction};
pub use transport::{Transport, TransportLink, WsTransport};
