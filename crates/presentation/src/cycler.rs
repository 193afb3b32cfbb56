use std::future::Future;

use chrono::{Local, NaiveDateTime};
use storage::models::latest_event_id;
use storage::{DatasetKind, DatasetStore, Table};
use tokio::time::{Instant, interval, interval_at};
use tracing::{debug, info, warn};

use crate::config::PresentationConfig;
use crate::ranking::{RankValue, Ranking, build_rankings, categories};
use crate::render::{Board, Render};

/// Where the presentation reads its data from.
pub trait ResultsSource {
    fn results(&self) -> storage::Result<Table>;
    fn events(&self) -> storage::Result<Table>;
}

impl ResultsSource for DatasetStore {
    fn results(&self) -> storage::Result<Table> {
        Ok(self.load(DatasetKind::Results))
    }

    fn events(&self) -> storage::Result<Table> {
        Ok(self.load(DatasetKind::Events))
    }
}

/// Rotates through the category rankings of one event.
#[derive(Debug, Clone)]
pub struct Cycler {
    config: PresentationConfig,
    categories: Vec<&'static str>,
    event: Option<String>,
    rankings: Vec<Ranking>,
    index: usize,
    last_refresh: Option<NaiveDateTime>,
}

impl Cycler {
    pub fn new(config: PresentationConfig) -> Self {
        Self {
            event: config.event.clone(),
            config,
            categories: categories(),
            rankings: Vec::new(),
            index: 0,
            last_refresh: None,
        }
    }

    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn category(&self) -> &'static str {
        self.categories[self.index % self.categories.len()]
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Reloads and rebuilds every ranking. On error the previous rankings stay.
    pub fn refresh(&mut self, source: &impl ResultsSource, now: NaiveDateTime) -> storage::Result<()> {
        let results = source.results()?;
        let event = match &self.config.event {
            Some(event) => Some(event.clone()),
            None => latest_event_id(&source.events()?),
        };

        self.rankings = match &event {
            Some(event) => build_rankings(&results, event),
            None => Vec::new(),
        };
        if event != self.event {
            info!(event = ?event, "Showing event");
        }
        self.event = event;
        self.last_refresh = Some(now);
        debug!(rows = results.len(), "Rankings rebuilt");
        Ok(())
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.categories.len();
    }

    fn ranking(&self) -> Option<&Ranking> {
        let category = self.category();
        self.rankings.iter().find(|r| r.category == category)
    }

    pub fn board(&self) -> Board {
        let event = self.event.as_deref().unwrap_or("no event selected");
        let lines = self
            .ranking()
            .map(|ranking| {
                ranking
                    .entries
                    .iter()
                    .take(self.config.rows)
                    .enumerate()
                    .map(|(idx, entry)| match &entry.value {
                        RankValue::Score(score) => {
                            format!("{:2}. {} — {:.2}", idx + 1, entry.name, score)
                        }
                        RankValue::Comment(text) => format!("{:2}. {} — {}", idx + 1, entry.name, text),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let updated = self
            .last_refresh
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        Board {
            title: format!("{} — {}", self.category(), event),
            lines,
            meta: format!(
                "Updated {} (refresh {} s, cycle {} s)",
                updated,
                self.config.refresh.as_secs(),
                self.config.cycle.as_secs()
            ),
        }
    }
}

fn draw(cycler: &Cycler, renderer: &mut impl Render) {
    if let Err(e) = renderer.render(&cycler.board()) {
        warn!("Drawing the board failed: {}", e);
    }
}

/// Refreshes on one interval and advances on another until `shutdown`
/// completes. Failures are logged and the loop carries on.
pub async fn run(
    cycler: &mut Cycler,
    source: &impl ResultsSource,
    renderer: &mut impl Render,
    shutdown: impl Future<Output = ()>,
) {
    let mut refresh = interval(cycler.config.refresh);
    let cycle_every = cycler.config.cycle;
    let mut cycle = interval_at(Instant::now() + cycle_every, cycle_every);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Presentation stopped");
                return;
            }
            _ = refresh.tick() => {
                if let Err(e) = cycler.refresh(source, Local::now().naive_local()) {
                    warn!("Refreshing results failed: {}", e);
                }
                draw(cycler, renderer);
            }
            _ = cycle.tick() => {
                cycler.advance();
                draw(cycler, renderer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::time::Duration;
    use storage::schema::{EVENT_ID, NAME};
    use storage::{Schema, StorageError};

    struct FakeSource {
        results: Table,
        events: Table,
        loads: Cell<usize>,
        fail: bool,
    }

    impl FakeSource {
        fn new(rows: &[(&str, &str, &str)], events: &[&str]) -> Self {
            let mut results = Table::empty_for(&Schema::results());
            for (event, name, score) in rows {
                let row = results.push_empty_row();
                results.set_by_name(row, EVENT_ID, *event);
                results.set_by_name(row, NAME, *name);
                results.set_by_name(row, "KKPI_NY", *score);
            }
            let mut table = Table::empty_for(&Schema::events());
            for id in events {
                let row = table.push_empty_row();
                table.set_by_name(row, EVENT_ID, *id);
            }
            Self {
                results,
                events: table,
                loads: Cell::new(0),
                fail: false,
            }
        }
    }

    impl ResultsSource for FakeSource {
        fn results(&self) -> storage::Result<Table> {
            self.loads.set(self.loads.get() + 1);
            if self.fail {
                return Err(StorageError::Io(io::Error::other("share offline")));
            }
            Ok(self.results.clone())
        }

        fn events(&self) -> storage::Result<Table> {
            Ok(self.events.clone())
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        boards: Vec<Board>,
    }

    impl Render for RecordingRenderer {
        fn render(&mut self, board: &Board) -> io::Result<()> {
            self.boards.push(board.clone());
            Ok(())
        }
    }

    fn at() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 9, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn on_kkpi(cycler: &mut Cycler) {
        while cycler.category() != "KKPI_NY" {
            cycler.advance();
        }
    }

    #[test]
    fn test_latest_event_is_picked_when_none_given() {
        let source = FakeSource::new(
            &[("E1", "A", "5"), ("E2", "B", "7")],
            &["E1", "E2"],
        );
        let mut cycler = Cycler::new(PresentationConfig::default());
        cycler.refresh(&source, at()).unwrap();
        on_kkpi(&mut cycler);

        assert_eq!(cycler.event(), Some("E2"));
        let board = cycler.board();
        assert_eq!(board.title, "KKPI_NY — E2");
        assert_eq!(board.lines, vec![" 1. B — 7.00".to_string()]);
        assert_eq!(board.meta, "Updated 2024-09-14 10:00:00 (refresh 180 s, cycle 10 s)");
    }

    #[test]
    fn test_board_is_capped_and_ranked() {
        let source = FakeSource::new(
            &[("E1", "A", "5"), ("E1", "B", "10"), ("E1", "C", "0"), ("E1", "D", "1")],
            &["E1"],
        );
        let config = PresentationConfig {
            event: Some("E1".into()),
            rows: 2,
            ..Default::default()
        };
        let mut cycler = Cycler::new(config);
        cycler.refresh(&source, at()).unwrap();
        on_kkpi(&mut cycler);

        assert_eq!(
            cycler.board().lines,
            vec![" 1. B — 10.00".to_string(), " 2. A — 5.00".to_string()]
        );
    }

    #[test]
    fn test_advance_wraps_around() {
        let mut cycler = Cycler::new(PresentationConfig::default());
        assert_eq!(cycler.category(), "Comment");
        for _ in 0..cycler.category_count() {
            cycler.advance();
        }
        assert_eq!(cycler.category(), "Comment");
    }

    #[test]
    fn test_failed_refresh_keeps_previous_rankings() {
        let mut source = FakeSource::new(&[("E1", "A", "5")], &["E1"]);
        let mut cycler = Cycler::new(PresentationConfig::default());
        cycler.refresh(&source, at()).unwrap();
        on_kkpi(&mut cycler);

        source.fail = true;
        assert!(cycler.refresh(&source, at()).is_err());
        assert_eq!(cycler.board().lines.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_and_cycles_on_their_own_intervals() {
        let source = FakeSource::new(&[("E1", "A", "5")], &["E1"]);
        let config = PresentationConfig {
            refresh: Duration::from_secs(180),
            cycle: Duration::from_secs(10),
            ..Default::default()
        };
        let mut cycler = Cycler::new(config);
        let mut renderer = RecordingRenderer::default();

        run(
            &mut cycler,
            &source,
            &mut renderer,
            tokio::time::sleep(Duration::from_secs(25)),
        )
        .await;

        assert_eq!(source.loads.get(), 1);
        // Initial draw plus two category changes.
        assert_eq!(renderer.boards.len(), 3);
        assert!(renderer.boards[2].title.starts_with("KKPI_O"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failing_source() {
        let mut source = FakeSource::new(&[], &[]);
        source.fail = true;
        let mut cycler = Cycler::new(PresentationConfig {
            refresh: Duration::from_secs(5),
            ..Default::default()
        });
        let mut renderer = RecordingRenderer::default();

        run(
            &mut cycler,
            &source,
            &mut renderer,
            tokio::time::sleep(Duration::from_secs(12)),
        )
        .await;

        assert_eq!(source.loads.get(), 3);
        assert!(!renderer.boards.is_empty());
    }
}
