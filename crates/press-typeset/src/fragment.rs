//! Text fragments.

use crate::columns::ColumnFlow;
use crate::state::{Alignment, State};
use crate::surface::{FontMetrics, Surface};

/// How a fragment composes with its neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentKind {
    /// Word-wrapped text. The final wrapped line is emitted without a line
    /// break so a following fragment can continue the same visual line.
    Text,
    /// A single line emitted verbatim, always followed by a line break.
    Line,
}

/// An immutable run of text paired with the graphics state that was
/// current when the run was produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub state: State,
    pub kind: FragmentKind,
}

impl Fragment {
    pub fn text(text: impl Into<String>, state: State) -> Fragment {
        Fragment {
            text: text.into(),
            state,
            kind: FragmentKind::Text,
        }
    }

    pub fn line(text: impl Into<String>, state: State) -> Fragment {
        Fragment {
            text: text.into(),
            state,
            kind: FragmentKind::Line,
        }
    }

    /// Width available to this fragment: the width of its active column.
    pub fn width(&self) -> f64 {
        self.state.column_width(self.state.column)
    }

    fn text_width(&self, metrics: &dyn FontMetrics, text: &str) -> f64 {
        metrics.width(text, &self.state.font, self.state.font_size)
    }

    /// Wrap the fragment's text into lines no wider than its column.
    ///
    /// Each newline-delimited sub-line wraps independently: words are
    ///     accumulated greedily while the running width plus the inter-word
    ///     space stays under the column width, and an overflowing word
    ///     starts the next line.
    /// A word wider than the column is emitted on a line of its own.
    /// An empty sub-line yields one empty output line, so blank lines in
    ///     the source survive wrapping.
    pub fn lines(&self, metrics: &dyn FontMetrics) -> Vec<String> {
        if self.kind == FragmentKind::Line {
            return vec![self.text.clone()];
        }
        let width = self.width();
        let space_width = self.text_width(metrics, " ");
        let mut result = vec![];
        for sub_line in self.text.split('\n') {
            let mut line_words: Vec<&str> = vec![];
            let mut used_width = 0.0;
            for word in sub_line.split(' ') {
                let word_width = self.text_width(metrics, word);
                if line_words.is_empty() || used_width + word_width < width {
                    line_words.push(word);
                    used_width += word_width + space_width;
                } else {
                    result.push(line_words.join(" "));
                    line_words = vec![word];
                    used_width = word_width + space_width;
                }
            }
            result.push(line_words.join(" "));
        }
        result
    }

    /// Transition the surface from the previous fragment's state to this
    /// fragment's state.
    ///
    /// In multi-column mode this issues a single combined cursor move:
    ///     horizontally from the previous column's offset to the active
    ///     column's offset, and vertically to the position where the active
    ///     column previously left off (the top, if it is untouched).
    /// The active column's usage is then charged with the space the wrapped
    ///     lines of this fragment will consume.
    /// Finally the one-shot margin, the font, and the indent are applied.
    pub fn apply(&self, surface: &mut dyn Surface, flow: &mut ColumnFlow, metrics: &dyn FontMetrics) {
        let state = &self.state;
        if state.column_count() > 1 {
            if state.columns_reset {
                flow.reset();
            }
            let x = state.column_x_offset(state.column);
            let dx = x - flow.previous_x();
            let cursor_y = match flow.previous() {
                Some(previous) => flow.used(previous),
                None => 0.0,
            };
            let dy = flow.used(state.column) - cursor_y;
            if dx != 0.0 || dy != 0.0 {
                surface.move_cursor(dx, dy);
            }
            flow.enter(state.column, x);
            let advance = self.lines(metrics).len() as f64 * state.line_height();
            flow.record(state.column, advance);
        }
        if state.margin != 0.0 {
            surface.move_cursor(0.0, state.margin);
        }
        surface.set_font(&state.font, state.font_size, state.line_height());
        surface.set_indent(state.indent);
    }

    /// Place the cursor at the start of the first line of a fresh page.
    pub fn set_text_origin(&self, surface: &mut dyn Surface) {
        let state = &self.state;
        surface.set_text_origin(
            state.margins[0],
            state.page_size.1 - state.margins[1] - state.font_size,
        );
    }

    fn right_align_shift(&self, metrics: &dyn FontMetrics, line: &str) -> Option<f64> {
        let state = &self.state;
        if state.column_count() <= 1 {
            return None;
        }
        match state.columns.get(state.column - 1) {
            Some(spec) if spec.align == Alignment::Right => {
                Some(self.width() - self.text_width(metrics, line))
            }
            _ => None,
        }
    }

    /// Emit one wrapped line onto the surface.
    ///
    /// Right-aligned columns shift the line start by the unused width and
    ///     undo the shift afterwards.
    /// The last line of a text fragment is emitted without a line break so
    ///     the next fragment continues the same visual line.
    pub fn emit_line(
        &self,
        surface: &mut dyn Surface,
        metrics: &dyn FontMetrics,
        line: &str,
        last: bool,
    ) {
        let shift = self.right_align_shift(metrics, line);
        if let Some(shift) = shift {
            surface.set_x_offset(shift);
        }
        if last && self.kind == FragmentKind::Text {
            surface.write_text(line);
        } else {
            surface.write_line(line);
        }
        if let Some(shift) = shift {
            surface.set_x_offset(-shift);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ColumnSpec;
    use crate::surface::{FixedMetrics, Op, RecordingSurface};

    // With these metrics and a 10pt font every character is 1pt wide, so
    // column widths read as character counts.
    fn metrics() -> FixedMetrics {
        FixedMetrics::new(0.1)
    }

    fn state_with_width(chars: f64) -> State {
        let mut state = State::default();
        state.font_size = 10.0;
        state.margins[0] = 0.0;
        state.page_size = (chars, state.page_size.1);
        state.set_columns(vec![]);
        state.reset();
        state
    }

    #[test]
    fn wrap_splits_on_width() {
        let fragment = Fragment::text("aa bb cc dd", state_with_width(6.0));
        assert_eq!(fragment.lines(&metrics()), vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn wrap_never_exceeds_width_except_single_word() {
        let fragment = Fragment::text("aaaaaaaaaa bb", state_with_width(6.0));
        assert_eq!(fragment.lines(&metrics()), vec!["aaaaaaaaaa", "bb"]);
    }

    #[test]
    fn blank_sub_line_is_preserved() {
        let fragment = Fragment::text("aa\n\nbb", state_with_width(10.0));
        assert_eq!(fragment.lines(&metrics()), vec!["aa", "", "bb"]);
    }

    #[test]
    fn line_fragment_is_never_wrapped() {
        let fragment = Fragment::line("aa bb cc dd", state_with_width(6.0));
        assert_eq!(fragment.lines(&metrics()), vec!["aa bb cc dd"]);
    }

    fn two_column_state() -> State {
        let mut state = state_with_width(210.0);
        state.set_columns(vec![ColumnSpec::default(), ColumnSpec::default()]);
        state
    }

    #[test]
    fn first_fragment_in_first_column_does_not_move() {
        let mut state = two_column_state();
        state.reset();
        let fragment = Fragment::text("aa", state);
        let mut surface = RecordingSurface::new();
        let mut flow = ColumnFlow::default();
        fragment.apply(&mut surface, &mut flow, &metrics());
        assert!(!surface.ops.iter().any(|op| matches!(op, Op::MoveCursor(..))));
        assert_eq!(flow.used(1), 10.0);
    }

    #[test]
    fn switching_columns_issues_one_combined_move() {
        let metrics = metrics();
        let mut surface = RecordingSurface::new();
        let mut flow = ColumnFlow::default();

        let mut state = two_column_state();
        state.reset();
        let first = Fragment::text("aa\nbb\ncc", state.clone());
        first.apply(&mut surface, &mut flow, &metrics);

        state.set_column(2);
        let second = Fragment::text("dd", state);
        surface.ops.clear();
        second.apply(&mut surface, &mut flow, &metrics);

        // Over by one column width plus the gap, up by the three lines the
        // first column consumed.
        assert_eq!(surface.ops[0], Op::MoveCursor(110.0, -30.0));
    }

    #[test]
    fn reselecting_a_column_resumes_below_its_content() {
        let metrics = metrics();
        let mut surface = RecordingSurface::new();
        let mut flow = ColumnFlow::default();

        let mut state = two_column_state();
        state.reset();
        let first = Fragment::text("aa\nbb\ncc", state.clone());
        first.apply(&mut surface, &mut flow, &metrics);

        state.set_column(2);
        let second = Fragment::text("dd", state.clone());
        second.apply(&mut surface, &mut flow, &metrics);

        state.set_column(1);
        let third = Fragment::text("ee", state);
        surface.ops.clear();
        third.apply(&mut surface, &mut flow, &metrics);

        // Cursor sits one line into column 2; column 1 already used three
        // lines, so the move is back a column and down two lines.
        assert_eq!(surface.ops[0], Op::MoveCursor(-110.0, 20.0));
        assert_eq!(flow.used(1), 40.0);
    }

    #[test]
    fn one_shot_margin_moves_and_is_only_in_the_snapshot() {
        let mut state = state_with_width(100.0);
        state.set_margin(18.0);
        let fragment = Fragment::text("aa", state.clone());
        state.reset();
        let mut surface = RecordingSurface::new();
        let mut flow = ColumnFlow::default();
        fragment.apply(&mut surface, &mut flow, &metrics());
        assert_eq!(surface.ops[0], Op::MoveCursor(0.0, 18.0));
    }

    #[test]
    fn emit_right_aligned_line_shifts_and_reverts() {
        let metrics = metrics();
        let mut state = state_with_width(210.0);
        state.set_columns(vec![
            ColumnSpec::default(),
            ColumnSpec {
                align: Alignment::Right,
                ..Default::default()
            },
        ]);
        state.set_column(2);
        let fragment = Fragment::line("abcd", state);
        let mut surface = RecordingSurface::new();
        fragment.emit_line(&mut surface, &metrics, "abcd", true);
        assert_eq!(
            surface.ops,
            vec![
                Op::XOffset(96.0),
                Op::Line("abcd".into()),
                Op::XOffset(-96.0),
            ]
        );
    }

    #[test]
    fn final_text_line_does_not_advance() {
        let fragment = Fragment::text("aa", state_with_width(100.0));
        let mut surface = RecordingSurface::new();
        fragment.emit_line(&mut surface, &metrics(), "aa", true);
        assert_eq!(surface.ops, vec![Op::Text("aa".into())]);
    }
}
