use crate::timestamp::Timestamp;

pub type TrackId = u64;

/// The two capabilities the core needs from an upstream track: a stable
/// identity and the timestamp of its most recent observation. Concrete
/// tracking data (history, state estimates, etc.) stays upstream; only
/// implementors of this trait ever cross into the descriptor core.
pub trait Track: Send + Sync {
    fn id(&self) -> TrackId;
    fn last_timestamp(&self) -> Timestamp;
}
