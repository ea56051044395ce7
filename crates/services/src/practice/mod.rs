//! Audio-synchronized fill-in-the-blank practice.

mod audio;
mod session;
mod sink;
mod state;
mod subscriptions;
mod writer;

pub use audio::{
    AudioDelivery, AudioEvent, AudioEventKind, AudioPlayback, ManualPlayback, PlaybackError,
    SubscriptionId,
};
pub use session::{DEFAULT_LEAD_IN_SECS, GradeOutcome, PracticeSession};
pub use sink::{ChannelProgressSink, NoopProgressSink, ProgressSink, ProgressUpdate};
pub use state::{PracticePhase, PracticeSnapshot, SessionState};
pub use writer::{ProgressWriter, TargetStats, WriterStats};
