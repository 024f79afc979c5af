//! Alert model, feed synchronizer state, review lifecycle, and dashboard
//! projections for SafeLink Monitor. No I/O lives here.

pub mod evidence;
pub mod feed;
pub mod model;
pub mod review;
pub mod time;
pub mod view;

pub use feed::{AlertFeed, FetchTicket, PushOutcome, SnapshotOutcome};
pub use model::{
    Alert, AlertDetail, AlertId, AlertPatch, AlertStatus, DebugCheckRequest, Feedback, FeedbackAck,
    FeedbackDecision, MediaItem, NewUser, Role, Severity, User,
};
pub use review::{
    PendingTransition, ReviewAction, ReviewError, ReviewState, ReviewView, TransitionOutcome,
};
pub use time::parse_api_timestamp;
