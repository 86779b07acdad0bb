//! Search indexer adapters.
//!
//! - `LoggingSearchIndexer` - Logs requests; used by the binary
//! - `RecordingSearchIndexer` - Keeps requests for assertions in tests

mod logging;
mod recording;

pub use logging::LoggingSearchIndexer;
pub use recording::RecordingSearchIndexer;
