//! Session proxy: drives list/detail refreshes against a remote
//! torrent engine and feeds the results to the synchronization core
//! in receipt order.

pub mod errors;
pub mod inspector;
pub mod session;
pub mod transport;

pub use errors::SessionError;
pub use inspector::Inspector;
pub use session::{DetailRequest, Session};
pub use transport::{IdSelection, KeyGroup, ListUpdate, Transport};
