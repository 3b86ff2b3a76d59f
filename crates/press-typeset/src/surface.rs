//! The render-surface and font-metrics boundaries.
//!
//! These operations are extracted to traits so that they can be mocked out
//!     in unit testing and so that different output devices can be plugged
//!     in without touching the layout pass.

/// Text measurement.
pub trait FontMetrics {
    /// Width in points of `text` rendered in the given font at the given size.
    fn width(&self, text: &str, font: &str, size: f64) -> f64;
}

/// Metrics that give every character the same advance.
///
/// The advance is `em × size` points per character.
/// Real font files are not consulted; this is the measurement used by the
///     plain-text device and by unit tests, where predictable numbers
///     matter more than typographic accuracy.
#[derive(Clone, Copy, Debug)]
pub struct FixedMetrics {
    em: f64,
}

impl FixedMetrics {
    pub fn new(em: f64) -> FixedMetrics {
        FixedMetrics { em }
    }
}

impl Default for FixedMetrics {
    fn default() -> Self {
        FixedMetrics { em: 0.5 }
    }
}

impl FontMetrics for FixedMetrics {
    fn width(&self, text: &str, _font: &str, size: f64) -> f64 {
        text.chars().count() as f64 * self.em * size
    }
}

/// A device that text can be rendered onto.
///
/// The coordinate system is the usual page one: x grows rightward from the
///     left page edge, y grows upward from the bottom page edge.
/// Vertical cursor moves are expressed with positive deltas moving *down*
///     the page, matching the reading order.
pub trait Surface {
    /// Set the font, size, and baseline-to-baseline distance for
    /// subsequently emitted text.
    fn set_font(&mut self, font: &str, size: f64, line_height: f64);

    /// Move the start-of-line point by the given deltas.
    /// Positive `dy` moves down the page.
    fn move_cursor(&mut self, dx: f64, dy: f64);

    /// Shift the start-of-line point horizontally by `dx`.
    ///
    /// Used for transient shifts such as right alignment; callers undo the
    /// shift with a negated call.
    fn set_x_offset(&mut self, dx: f64);

    /// Set the running indent. The surface records the indent and applies
    /// it to every line start until it is changed again.
    fn set_indent(&mut self, indent: f64);

    /// Place the cursor at an absolute position.
    fn set_text_origin(&mut self, x: f64, y: f64);

    /// Emit a line of text and advance to the next line.
    fn write_line(&mut self, line: &str);

    /// Emit text without advancing, so that following output continues on
    /// the same visual line.
    fn write_text(&mut self, text: &str);

    /// The current vertical cursor position, measured from the page bottom.
    fn y(&self) -> f64;

    /// Commit the current page and start a fresh one.
    fn begin_page(&mut self);

    /// Commit any remaining output and persist the document.
    fn finish(&mut self) -> std::io::Result<()>;
}

/// Operation recorded by [RecordingSurface].
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    SetFont(String, f64, f64),
    MoveCursor(f64, f64),
    XOffset(f64),
    SetIndent(f64),
    TextOrigin(f64, f64),
    Line(String),
    Text(String),
    BeginPage,
    Finish,
}

/// A surface that records every operation applied to it.
///
/// Used in unit tests to assert on the exact stream of device operations
///     the layout pass produces.
/// The vertical cursor is simulated so that pagination logic can be
///     exercised: `write_line` moves the cursor down by the line height
///     most recently given to `set_font`.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<Op>,
    y: f64,
    line_height: f64,
    pages: usize,
}

impl RecordingSurface {
    pub fn new() -> RecordingSurface {
        Default::default()
    }

    /// Number of completed pages.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// The emitted lines, ignoring all positioning operations.
    pub fn lines(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Line(s) | Op::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn set_font(&mut self, font: &str, size: f64, line_height: f64) {
        self.line_height = line_height;
        self.ops.push(Op::SetFont(font.into(), size, line_height));
    }

    fn move_cursor(&mut self, dx: f64, dy: f64) {
        self.y -= dy;
        self.ops.push(Op::MoveCursor(dx, dy));
    }

    fn set_x_offset(&mut self, dx: f64) {
        self.ops.push(Op::XOffset(dx));
    }

    fn set_indent(&mut self, indent: f64) {
        self.ops.push(Op::SetIndent(indent));
    }

    fn set_text_origin(&mut self, x: f64, y: f64) {
        self.y = y;
        self.ops.push(Op::TextOrigin(x, y));
    }

    fn write_line(&mut self, line: &str) {
        self.y -= self.line_height;
        self.ops.push(Op::Line(line.into()));
    }

    fn write_text(&mut self, text: &str) {
        self.ops.push(Op::Text(text.into()));
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn begin_page(&mut self) {
        self.pages += 1;
        self.ops.push(Op::BeginPage);
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.pages += 1;
        self.ops.push(Op::Finish);
        Ok(())
    }
}
