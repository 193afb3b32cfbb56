//! Schema-on-read: turns whatever column layout a file has accumulated over the
//! years into the canonical layout of its dataset.

use tracing::debug;

use crate::license;
use crate::schema::{CLUB, DatasetKind, LICENSE, NAME, Schema};
use crate::table::{CellValue, RawTable, Table};

/// One step of historical schema drift.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&mut RawTable),
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "rename MDLSZ_ID to the license number column",
        apply: rename_mdlsz_id,
    },
    Migration {
        version: 2,
        description: "rename ID to the license number column",
        apply: rename_id,
    },
    Migration {
        version: 3,
        description: "drop the accent from the club column",
        apply: rename_accented_club,
    },
];

/// Migrations that apply to a dataset, in version order.
pub fn migrations_for(kind: DatasetKind) -> &'static [Migration] {
    match kind {
        DatasetKind::Competitors | DatasetKind::Results => MIGRATIONS,
        DatasetKind::Events => &[],
    }
}

fn rename_mdlsz_id(raw: &mut RawTable) {
    rename(raw, "MDLSZ_ID", LICENSE);
}

fn rename_id(raw: &mut RawTable) {
    rename(raw, "ID", LICENSE);
}

fn rename_accented_club(raw: &mut RawTable) {
    rename(raw, "Egyesület", CLUB);
}

fn rename(raw: &mut RawTable, from: &str, to: &str) {
    if raw.columns.iter().any(|c| c == to) {
        return;
    }
    if let Some(col) = raw.columns.iter_mut().find(|c| c.as_str() == from) {
        *col = to.to_string();
    }
}

/// Produces the canonical table: legacy names migrated, missing required
/// columns synthesized, license numbers normalized, required columns first.
pub fn reconcile(mut raw: RawTable, schema: &Schema) -> Table {
    for migration in migrations_for(schema.kind) {
        (migration.apply)(&mut raw);
        debug!(
            dataset = %schema.kind,
            version = migration.version,
            "applied migration: {}",
            migration.description
        );
    }

    let width = raw.columns.len();
    let id_like: Vec<bool> = raw.columns.iter().map(|c| schema.is_id_like(c)).collect();
    let rows = raw
        .rows
        .into_iter()
        .map(|mut cells| {
            cells.resize(width, CellValue::Empty);
            cells
                .iter()
                .zip(&id_like)
                .map(|(cell, &is_id)| {
                    if is_id {
                        license::normalize(cell)
                    } else {
                        cell.to_text()
                    }
                })
                .collect()
        })
        .collect();
    let mut table = Table::with_rows(raw.columns, rows);

    for required in &schema.columns {
        if table.has_column(required) {
            continue;
        }
        let at = table
            .column_index(NAME)
            .map_or(table.columns().len(), |idx| idx + 1);
        table.insert_column(at, required.clone());
    }

    table.reorder(&schema.columns);
    table
}
