//! # eyescalar Extraction Library (eyescalar-extract)
//!
//! Streaming extraction of per-session scalars from eye-tracking reports.
//!
//! **Purpose:** Correct overlong gaps in the fixation stream, classify
//! fixations into screen regions, merge gaze events, detect looking patterns,
//! partition sessions into epochs and reduce everything into one
//! [`record::SessionRecord`] per session.
//!
//! **Pipeline:** fixation reports → [`session::SessionAccumulator`] →
//! [`reducer::reduce`] → message and saccade reports merged through each
//! session's [`timeline::CutoffTable`] → [`output`] tables.

pub mod density;
pub mod error;
pub mod output;
pub mod processor;
pub mod record;
pub mod reducer;
pub mod region;
pub mod report;
pub mod saccades;
pub mod session;
pub mod timeline;
pub mod triggers;

pub use error::{Error, Result};
pub use processor::{Extractor, ReportFiles, SessionResults};
