pub mod constants;
pub mod crypto;
pub mod error;
pub mod family;
pub mod learn;
pub mod packet;
pub mod poller;
pub mod session;
pub mod status;
pub mod store;
pub mod transport;

// Re-export the session type for easy access
pub use session::{DiscoveredDevice, Session, SessionOptions};
