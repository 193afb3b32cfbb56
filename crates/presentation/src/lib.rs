pub mod config;
pub mod cycler;
pub mod picker;
pub mod ranking;
pub mod render;

pub use config::PresentationConfig;
pub use cycler::{Cycler, ResultsSource, run};
pub use ranking::{RankEntry, RankValue, Ranking, build_rankings};
pub use render::{Board, Render, TerminalRenderer};
