//! Session logging.
//!
//! Sessions are stored in timestamped TSV files under the configured
//! directory, one line per sent check, received item or goal report.

mod session;

pub use session::*;
