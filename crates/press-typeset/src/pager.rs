//! The pagination driver.

use crate::columns::ColumnFlow;
use crate::fragment::Fragment;
use crate::surface::{FontMetrics, Surface};

/// Streams fragments onto a surface, breaking pages as the bottom margin
/// is crossed.
///
/// Fragments must be rendered in emission order: the column flow tracker
///     and the graphics state carry position implicitly from each fragment
///     to the next.
pub struct Pager<'a> {
    surface: &'a mut dyn Surface,
    metrics: &'a dyn FontMetrics,
    flow: ColumnFlow,
    at_page_start: bool,
}

impl<'a> Pager<'a> {
    pub fn new(surface: &'a mut dyn Surface, metrics: &'a dyn FontMetrics) -> Pager<'a> {
        Pager {
            surface,
            metrics,
            flow: ColumnFlow::default(),
            at_page_start: true,
        }
    }

    /// Render the fragments in order.
    ///
    /// After each emitted physical line the surface's vertical position is
    ///     checked against the fragment's bottom margin.
    /// Crossing it commits the page and starts a new one; only the
    ///     fragment's font, size and leading are carried over, never any
    ///     cursor arithmetic, and emission continues at the new page's
    ///     text origin.
    pub fn render(&mut self, fragments: &[Fragment]) {
        for fragment in fragments {
            if self.at_page_start {
                fragment.set_text_origin(self.surface);
                self.at_page_start = false;
            }
            fragment.apply(self.surface, &mut self.flow, self.metrics);
            let lines = fragment.lines(self.metrics);
            let count = lines.len();
            for (i, line) in lines.iter().enumerate() {
                fragment.emit_line(self.surface, self.metrics, line, i + 1 == count);
                if self.surface.y() < fragment.state.margins[1] {
                    self.surface.begin_page();
                    self.surface.set_font(
                        &fragment.state.font,
                        fragment.state.font_size,
                        fragment.state.line_height(),
                    );
                    fragment.set_text_origin(self.surface);
                }
            }
        }
    }

    /// Commit the remaining output and persist the document.
    pub fn finish(self) -> std::io::Result<()> {
        self.surface.finish()
    }
}
