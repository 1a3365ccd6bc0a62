//! CLI command implementations.
//!
//! | Module   | Commands handled                  |
//! |----------|-----------------------------------|
//! | `key`    | `Key` (set / clear / status)      |
//! | `panel`  | `Panel`                           |
//! | `report` | `Summarize`, `Prompt`, `Analyze`  |

pub mod key;
pub mod panel;
pub mod report;

pub use key::cmd_key;
pub use panel::cmd_panel;
pub use report::{cmd_analyze, cmd_prompt, cmd_summarize};
