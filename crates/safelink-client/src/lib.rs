//! Client side of the SafeLink alert API: typed HTTP calls, the live push
//! stream, the session credential, and the drivers that feed results into
//! the `safelink-core` state machines.

mod error;
pub mod http;
pub mod push;
pub mod session;
pub mod sync;

pub use error::{ApiError, ErrorKind};
pub use http::{AlertQuery, ApiClient, ClientConfig};
pub use push::PushStream;
pub use session::{Session, SessionError, SessionStore};
