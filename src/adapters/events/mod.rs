//! Event bus adapters.
//!
//! - `LoggingEventPublisher` - Logs envelopes; used by the binary
//! - `InMemoryEventBus` - In-process bus; records published envelopes

mod in_memory;
mod logging;

pub use in_memory::InMemoryEventBus;
pub use logging::LoggingEventPublisher;
