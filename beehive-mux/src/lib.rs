//! # beehive-mux
//!
//! Pane Addressing (§4.A) and the Injector (§4.B): the only components in
//! this workspace that know the multiplexer exists.

pub mod injector;
pub mod pane;
pub mod transport;

pub use injector::{Injector, SendOptions};
pub use pane::PaneTable;
pub use transport::{MuxTransport, SendOutcome, TmuxTransport};
