// View services: one controller per page, all built on `view::ViewController`.

pub mod analyses;
pub mod conversations;
pub mod dashboard;
pub mod meetings;
pub mod view;

pub use analyses::{AnalysesView, AnalysisEntry};
pub use conversations::{ConversationEntry, ConversationsView};
pub use dashboard::StatsView;
pub use meetings::{MeetingEntry, MeetingsView};
pub use view::{
    Clock, PendingRefresh, RefreshOutcome, ViewController, ViewModel, ViewPhase, ViewSettings,
    ViewKind,
};
