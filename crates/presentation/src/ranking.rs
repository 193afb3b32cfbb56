use std::str::FromStr;

use rust_decimal::Decimal;
use storage::Table;
use storage::schema::{COMMENT, EVENT_ID, NAME, SCORE_COLUMNS};

/// Board order: the comment pseudo-category first, then every score column.
pub fn categories() -> Vec<&'static str> {
    std::iter::once(COMMENT).chain(SCORE_COLUMNS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankValue {
    Score(Decimal),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub name: String,
    pub value: RankValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub category: &'static str,
    pub entries: Vec<RankEntry>,
}

/// Blank or unparsable scores count as zero.
pub fn parse_score(raw: &str) -> Decimal {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or(Decimal::ZERO)
}

/// One ranking per category for the rows of `event`.
pub fn build_rankings(results: &Table, event: &str) -> Vec<Ranking> {
    let event = event.trim();
    let rows: Vec<usize> = (0..results.len())
        .filter(|&row| results.get(row, EVENT_ID).is_some_and(|id| id.trim() == event))
        .collect();
    let name = |row: usize| results.get(row, NAME).unwrap_or_default().trim().to_string();

    categories()
        .into_iter()
        .map(|category| {
            let entries = if !results.has_column(category) {
                Vec::new()
            } else if category == COMMENT {
                rows.iter()
                    .filter_map(|&row| {
                        let text = results.get(row, category)?.trim();
                        (!text.is_empty()).then(|| RankEntry {
                            name: name(row),
                            value: RankValue::Comment(text.to_string()),
                        })
                    })
                    .collect()
            } else {
                let mut scored: Vec<(Decimal, usize)> = rows
                    .iter()
                    .map(|&row| (parse_score(results.get(row, category).unwrap_or_default()), row))
                    .filter(|(score, _)| *score > Decimal::ZERO)
                    .collect();
                // Stable, so ties keep table order.
                scored.sort_by(|a, b| b.0.cmp(&a.0));
                scored
                    .into_iter()
                    .map(|(score, row)| RankEntry {
                        name: name(row),
                        value: RankValue::Score(score),
                    })
                    .collect()
            };
            Ranking { category, entries }
        })
        .collect()
}
