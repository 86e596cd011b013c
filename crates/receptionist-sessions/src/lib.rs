pub mod db;
pub mod error;
pub mod locks;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use locks::SessionLockRegistry;
pub use store::{SessionStore, SqliteSessionStore};
pub use types::{
    BookingState, DiscoveryState, MidCallRuleState, Session, SessionKey, SessionLocks,
    SessionMemory, SessionMetrics, SlotMeta, Turn, TurnRole,
};
