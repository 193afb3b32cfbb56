pub mod config;
pub mod error;
pub mod grid;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod tab;

pub use config::SessionConfig;
pub use error::{EditorError, Result, ValidationError};
pub use grid::{CellCommit, CommitContext, Committed, Grid, RowCounts};
pub use scheduler::{SaveIndicator, SaveOutcome, SaveScheduler};
pub use search::{FilterView, SearchIndex};
pub use session::{EditorUi, LogUi, Session, SessionHandle};
pub use tab::{DatasetTab, TabView};
