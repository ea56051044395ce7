mod blank;
mod bundle;
mod ids;
mod lyrics;
mod progress;
mod request;
mod settings;
mod track;

pub use blank::{Blank, BlankError, BlankRecord, BlankSet};
pub use bundle::{BundleError, PracticeBundle, PracticeMaterial};
pub use ids::{BlankKey, ParseIdError, SessionId, TrackId};
pub use lyrics::{LyricsError, PracticedLyrics, is_placeholder};
pub use progress::{PracticeProgress, ProgressError};
pub use request::{ConceptList, OTHER, SongRequest, SongRequestDraft, SongRequestError};
pub use settings::{ClientSettings, ClientSettingsDraft, SettingsError};
pub use track::{SavedTrack, TrackDraft, TrackError, summarize_notes};
