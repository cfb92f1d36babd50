//! Bridge sessions
//!
//! A [`BridgeSession`] owns one remote shell on behalf of one client
//! connection. The router writes keystrokes and window changes into it; a
//! relay task streams the shell's output back to the client. Either side may
//! end the session, and whichever calls [`BridgeSession::teardown`] first
//! performs the release sequence.

mod bridge;
mod relay;

pub use bridge::BridgeSession;
pub use relay::Utf8Carry;
