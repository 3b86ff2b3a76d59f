//! Cross-fragment column bookkeeping.

use std::collections::HashMap;

/// Tracks how much vertical space each column has consumed.
///
/// The render surface only exposes relative cursor moves, so switching
///     between columns requires knowing where the cursor was left in the
///     column being abandoned and where it should resume in the column
///     being entered.
/// A `ColumnFlow` value accumulates that information as fragments are
///     applied.
/// It is the only piece of mutable state that survives from one fragment
///     to the next; it is owned by the pagination driver and passed
///     explicitly into each fragment application.
#[derive(Debug, Default)]
pub struct ColumnFlow {
    used: HashMap<usize, f64>,
    previous: Option<usize>,
    previous_x: f64,
}

impl ColumnFlow {
    /// Forget all per-column usage.
    ///
    /// The horizontal offset of the previously active column is kept so
    ///     that the next move is still issued relative to where the cursor
    ///     physically is.
    pub fn reset(&mut self) {
        self.used.clear();
        self.previous = None;
    }

    /// Vertical space consumed so far by the given 1-based column.
    pub fn used(&self, column: usize) -> f64 {
        self.used.get(&column).copied().unwrap_or(0.0)
    }

    /// Add to the space consumed by the given column.
    pub fn record(&mut self, column: usize, advance: f64) {
        *self.used.entry(column).or_insert(0.0) += advance;
    }

    /// The column the last applied fragment went to, if any.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Horizontal offset of the column the cursor currently sits in.
    pub fn previous_x(&self) -> f64 {
        self.previous_x
    }

    /// Note that the cursor now sits in `column` at horizontal offset `x`.
    pub fn enter(&mut self, column: usize, x: f64) {
        self.previous = Some(column);
        self.previous_x = x;
    }
}
