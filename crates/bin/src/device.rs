//! A plain-text page device.
//!
//! Real typesetting backends draw on a canvas; this device instead keeps
//!     every emitted run of text with its position in points and, when the
//!     document is finished, rasterizes each page onto a character grid
//!     and writes the grid to a file.
//! Pages are separated by a form feed.
//! It is deliberately crude: the point of the device is to make the
//!     layout pass observable, not to produce beautiful output.

use std::io::Write;
use std::path::PathBuf;

use press_typeset::{FixedMetrics, FontMetrics, Surface};

/// Horizontal points per output character cell.
const CELL_WIDTH: f64 = 6.0;
/// Vertical points per output row.
const CELL_HEIGHT: f64 = 12.0;

struct Placed {
    x: f64,
    y: f64,
    text: String,
}

/// A [Surface] that renders onto character-grid pages.
pub struct TextDevice {
    output_path: PathBuf,
    metrics: FixedMetrics,
    pages: Vec<Vec<Placed>>,
    current: Vec<Placed>,
    /// Start-of-line x position, moved by relative cursor moves.
    base_x: f64,
    /// Transient horizontal shift, e.g. for right alignment.
    x_shift: f64,
    /// Running indent applied to every line start.
    indent: f64,
    /// Horizontal pen advance within the current visual line.
    pen: f64,
    y: f64,
    font: String,
    font_size: f64,
    line_height: f64,
}

impl TextDevice {
    pub fn new(output_path: impl Into<PathBuf>) -> TextDevice {
        TextDevice {
            output_path: output_path.into(),
            metrics: FixedMetrics::default(),
            pages: vec![],
            current: vec![],
            base_x: 0.0,
            x_shift: 0.0,
            indent: 0.0,
            pen: 0.0,
            y: 0.0,
            font: String::new(),
            font_size: 12.0,
            line_height: 12.0,
        }
    }

    fn x(&self) -> f64 {
        self.base_x + self.indent + self.x_shift + self.pen
    }

    fn place(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.current.push(Placed {
            x: self.x(),
            y: self.y,
            text: text.into(),
        });
    }

    fn commit_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
    }

    /// Rasterize one page onto a character grid.
    fn rasterize(page: &[Placed]) -> String {
        let mut rows: Vec<(i64, Vec<&Placed>)> = vec![];
        for placed in page {
            let row = (-placed.y / CELL_HEIGHT).round() as i64;
            match rows.iter_mut().find(|(r, _)| *r == row) {
                Some((_, items)) => items.push(placed),
                None => rows.push((row, vec![placed])),
            }
        }
        rows.sort_by_key(|(row, _)| *row);

        let first_row = rows.first().map(|(row, _)| *row).unwrap_or(0);
        let mut out = String::new();
        let mut current_row = first_row;
        for (row, mut items) in rows {
            for _ in current_row..row {
                out.push('\n');
            }
            current_row = row;
            items.sort_by(|a, b| a.x.total_cmp(&b.x));
            let mut line = String::new();
            for placed in items {
                let column = (placed.x / CELL_WIDTH).round().max(0.0) as usize;
                if line.chars().count() < column {
                    let padding = column - line.chars().count();
                    line.extend(std::iter::repeat(' ').take(padding));
                }
                line.push_str(&placed.text);
            }
            out.push_str(&line);
        }
        out.push('\n');
        out
    }

    /// The rendered pages, for inspection in tests.
    fn render_pages(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push('\x0c');
            }
            out.push_str(&Self::rasterize(page));
        }
        out
    }
}

impl Surface for TextDevice {
    fn set_font(&mut self, font: &str, size: f64, line_height: f64) {
        self.font = font.into();
        self.font_size = size;
        self.line_height = line_height;
    }

    fn move_cursor(&mut self, dx: f64, dy: f64) {
        self.base_x += dx;
        self.y -= dy;
    }

    fn set_x_offset(&mut self, dx: f64) {
        self.x_shift += dx;
    }

    fn set_indent(&mut self, indent: f64) {
        self.indent = indent;
    }

    fn set_text_origin(&mut self, x: f64, y: f64) {
        self.base_x = x;
        self.y = y;
        self.pen = 0.0;
        self.x_shift = 0.0;
    }

    fn write_line(&mut self, line: &str) {
        self.place(line);
        self.pen = 0.0;
        self.y -= self.line_height;
    }

    fn write_text(&mut self, text: &str) {
        self.place(text);
        self.pen += self.metrics.width(text, &self.font, self.font_size);
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn begin_page(&mut self) {
        self.commit_page();
        self.base_x = 0.0;
        self.x_shift = 0.0;
        self.pen = 0.0;
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.commit_page();
        let mut file = std::fs::File::create(&self.output_path)?;
        file.write_all(self.render_pages().as_bytes())?;
        Ok(())
    }
}
