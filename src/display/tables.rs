//! Table formatting utilities for structured output.

use crate::clustering::{DistanceFunc, Point};
use crate::experiment::ExperimentOutcome;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

/// Members listed per cluster before the row is abbreviated.
const MAX_LISTED_POINTS: usize = 8;

/// Rounded UTF-8 table with bold headers and optionally right-aligned
/// numeric columns.
pub struct TableBuilder {
    table: Table,
    numeric: Vec<usize>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self {
            table,
            numeric: Vec::new(),
        }
    }

    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
        self
    }

    /// Marks `column` as numeric: its cells are right-aligned.
    pub fn numeric_column(mut self, column: usize) -> Self {
        self.numeric.push(column);
        self
    }

    pub fn row<T: ToString>(mut self, values: &[T]) -> Self {
        self.table
            .add_row(values.iter().map(|v| Cell::new(v.to_string())));
        self
    }

    /// Adds a row of pre-styled cells.
    pub fn cells(mut self, cells: Vec<Cell>) -> Self {
        self.table.add_row(cells);
        self
    }

    pub fn build(mut self) -> String {
        for idx in self.numeric {
            if let Some(column) = self.table.column_mut(idx) {
                column.set_cell_alignment(CellAlignment::Right);
            }
        }
        self.table.to_string()
    }
}

/// Create a table of cluster centers and members for an experiment run.
pub fn create_clusters_table(outcome: &ExperimentOutcome) -> String {
    let builder = outcome.clusters.iter().enumerate().fold(
        TableBuilder::new()
            .headers(&["#", "Center", "Size", "Points"])
            .numeric_column(0)
            .numeric_column(2),
        |builder, (i, cluster)| {
            builder.row(&[
                i.to_string(),
                cluster.center.to_string(),
                cluster.points.len().to_string(),
                format_points(&cluster.points),
            ])
        },
    );

    let (status, color) = if outcome.finished {
        ("converged", Color::Green)
    } else {
        ("not converged", Color::Yellow)
    };
    builder
        .cells(vec![
            Cell::new(""),
            Cell::new(format!(
                "{status} after {} iteration(s)",
                outcome.stats.iterations
            ))
            .fg(color)
            .add_attribute(Attribute::Bold),
            Cell::new(outcome.stats.points).add_attribute(Attribute::Bold),
            Cell::new(format!("metric: {}", outcome.metric)),
        ])
        .build()
}

/// Create a table listing the distance function catalog.
pub fn create_distances_table() -> String {
    DistanceFunc::catalog()
        .iter()
        .fold(
            TableBuilder::new().headers(&["Id", "Name"]).numeric_column(0),
            |builder, metric| builder.row(&[metric.id().to_string(), metric.name().to_string()]),
        )
        .build()
}

fn format_points(points: &[Point]) -> String {
    let mut listed: Vec<String> = points
        .iter()
        .take(MAX_LISTED_POINTS)
        .map(Point::to_string)
        .collect();
    if points.len() > MAX_LISTED_POINTS {
        listed.push(format!("… {} more", points.len() - MAX_LISTED_POINTS));
    }
    listed.join(" ")
}
