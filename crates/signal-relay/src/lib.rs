//! Signal Relay
//!
//! WebRTC signaling relay: peers connect over WebSocket and exchange the
//! offers, answers, and ICE candidates they need to set up a direct
//! connection. The relay never touches media.
//!
//! # Protocol
//!
//! 1. Peer opens a WebSocket and is registered with the hub
//! 2. Peer sends `offer`, `answer`, or `candidate` messages as JSON frames
//! 3. The hub forwards each message to every other connected peer
//! 4. IPv6 candidates are dropped; everything else is passed through untouched
//! 5. Closing the socket unregisters the peer

pub mod http;
pub mod hub;
pub mod messages;
pub mod server;

pub use hub::{Delivery, HubStats, PeerReceiver, RelayHub};
pub use messages::SignalMessage;
pub use server::SignalServer;
