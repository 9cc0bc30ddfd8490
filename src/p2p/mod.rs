pub mod message;
pub mod registry;
pub mod server;
pub mod sync;

pub use message::PeerMessage;
pub use registry::PeerRegistry;
pub use server::{connect, start};
