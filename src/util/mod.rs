//! Text helpers shared by the layout measurer and the CLI.
//!
//! - **Width**: Unicode-aware column counting
//! - **Wrapping**: greedy word wrap used by the monospace measurer
//! - **Sanitizing**: control-character stripping for externally supplied text
//! - **Tasks**: panic capture for background fetches
//!
//! # Examples
//!
//! ```
//! use reviewfeed::util::{display_width, wrap_to_width};
//!
//! assert_eq!(display_width("Hello 世界"), 10);
//! assert_eq!(wrap_to_width("Hello 世界", 6).len(), 2);
//! ```

mod task;
mod text;

pub(crate) use task::catch_task_panic;
pub use text::{display_width, strip_control_chars, wrap_to_width};
