//! # Press typesetting
//!
//! This crate implements the text-layout half of Press.
//! It knows nothing about the Press language itself: the input to the
//!     layout pass is a stream of [fragments](Fragment),
//!     each an immutable run of text paired with the [graphics state](State)
//!     that was current when the run was produced.
//! The [pagination driver](Pager) wraps each fragment into lines,
//!     places the lines into the active column,
//!     and starts new pages when the bottom margin is crossed.
//!
//! The actual output device is behind the [`Surface`] trait,
//!     and text measurement is behind the [`FontMetrics`] trait,
//!     so that both can be swapped out in unit tests.

mod columns;
mod fragment;
mod pager;
mod state;
mod surface;

pub use columns::ColumnFlow;
pub use fragment::{Fragment, FragmentKind};
pub use pager::Pager;
pub use state::{Alignment, ColumnSpec, PageSize, State, CM, DEFAULT_COLUMN_GAP, DEFAULT_LEADING};
pub use surface::{FixedMetrics, FontMetrics, Op, RecordingSurface, Surface};
