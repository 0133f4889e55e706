pub mod combination;
pub mod segment;
pub mod session;
pub mod timeline;

pub use combination::TimingCombination;
pub use segment::{CueRequest, SoundType, TimingSegment};
pub use session::{Session, SessionMeta};
pub use timeline::{TimelineItem, TimelineStatus};
