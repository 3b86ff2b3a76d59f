//! The graphics state.
//!
//! A [State] value describes everything about how a run of text should be
//!     placed on the page: font, size, leading, page geometry, indent,
//!     and the column configuration.
//! The state is a plain value type.
//! The runtime mutates one current instance as style commands execute,
//!     and each emitted fragment takes an independent copy,
//!     so layout never observes later mutations.

/// One centimeter in points.
pub const CM: f64 = 72.0 / 2.54;

/// Leading factor applied when none is given explicitly.
pub const DEFAULT_LEADING: f64 = 1.0;

/// Horizontal gap between adjacent columns, in points.
pub const DEFAULT_COLUMN_GAP: f64 = 10.0;

/// A named page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    /// Look up a page size by its conventional name.
    pub fn parse(name: &str) -> Option<PageSize> {
        match name {
            "A4" => Some(PageSize::A4),
            "Letter" => Some(PageSize::Letter),
            _ => None,
        }
    }

    /// Width and height in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (21.0 * CM, 29.7 * CM),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

/// Horizontal alignment of a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Declaration of a single column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnSpec {
    /// Fixed width in points. Columns without a fixed width share the
    /// space left over after fixed-width columns are subtracted.
    pub width: Option<i64>,
    pub align: Alignment,
}

/// The graphics state carried by every fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub font: String,
    pub font_size: f64,
    /// Multiplier on the font size giving the baseline-to-baseline distance.
    pub leading: f64,
    /// Page width and height in points.
    pub page_size: (f64, f64),
    /// Side margin and top/bottom margin, in points.
    pub margins: [f64; 2],
    /// Persistent left indent, in points.
    pub indent: f64,
    /// One-shot extra vertical space consumed by the next fragment.
    pub margin: f64,
    pub column_gap: f64,
    pub columns: Vec<ColumnSpec>,
    /// The active column, 1-based.
    pub column: usize,
    /// Set by [State::set_columns]; tells the layout pass to restart its
    /// per-column bookkeeping. Cleared when a fragment is emitted.
    pub columns_reset: bool,
    widths: Vec<f64>,
}

impl Default for State {
    fn default() -> Self {
        let mut state = State {
            font: "Tahoma".into(),
            font_size: 12.0,
            leading: DEFAULT_LEADING,
            page_size: PageSize::A4.dimensions(),
            margins: [1.5 * CM, 2.0 * CM],
            indent: 0.0,
            margin: 0.0,
            column_gap: DEFAULT_COLUMN_GAP,
            columns: vec![],
            column: 1,
            columns_reset: false,
            widths: vec![],
        };
        state.calculate_widths();
        state
    }
}

impl State {
    /// Clear the parts of the state that apply to a single fragment only.
    pub fn reset(&mut self) {
        self.margin = 0.0;
        self.columns_reset = false;
    }

    pub fn set_font(&mut self, font: impl Into<String>, size: f64, leading: Option<f64>) {
        self.font = font.into();
        self.font_size = size;
        if let Some(leading) = leading {
            self.leading = leading;
        }
    }

    pub fn set_font_size(&mut self, size: f64, leading: Option<f64>) {
        self.font_size = size;
        self.leading = leading.unwrap_or(DEFAULT_LEADING);
    }

    pub fn set_indent(&mut self, indent: f64) {
        self.indent = indent;
    }

    pub fn set_margin(&mut self, margin: f64) {
        self.margin = margin;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size.dimensions();
        self.calculate_widths();
    }

    pub fn set_columns(&mut self, specs: Vec<ColumnSpec>) {
        self.columns_reset = true;
        self.columns = specs;
        self.calculate_widths();
    }

    /// Make the given 1-based column the active one.
    ///
    /// The caller is responsible for checking that the column is declared.
    pub fn set_column(&mut self, column: usize) {
        self.column = column;
    }

    /// Number of declared columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Width of the area between the side margins.
    pub fn content_width(&self) -> f64 {
        self.page_size.0 - 2.0 * self.margins[0]
    }

    /// Width of the given 1-based column.
    pub fn column_width(&self, column: usize) -> f64 {
        self.widths
            .get(column - 1)
            .copied()
            .unwrap_or_else(|| self.content_width())
    }

    /// Horizontal offset of the given 1-based column from the left margin.
    pub fn column_x_offset(&self, column: usize) -> f64 {
        let mut x = 0.0;
        for c in 1..column {
            x += self.column_width(c) + self.column_gap;
        }
        x
    }

    /// Baseline-to-baseline distance.
    pub fn line_height(&self) -> f64 {
        self.font_size * self.leading
    }

    fn calculate_widths(&mut self) {
        let content_width = self.content_width();
        if self.columns.len() <= 1 {
            self.widths = vec![content_width];
            return;
        }
        let mut remaining = content_width - self.column_gap * (self.columns.len() - 1) as f64;
        let mut widths: Vec<Option<f64>> = Vec::with_capacity(self.columns.len());
        let mut unspecified = 0;
        for spec in &self.columns {
            match spec.width {
                Some(w) => {
                    remaining -= w as f64;
                    widths.push(Some(w as f64));
                }
                None => {
                    unspecified += 1;
                    widths.push(None);
                }
            }
        }
        let share = if unspecified > 0 {
            remaining / unspecified as f64
        } else {
            0.0
        };
        self.widths = widths.into_iter().map(|w| w.unwrap_or(share)).collect();
    }
}
