pub mod defs;
pub mod stub;

pub use defs::*;
pub use stub::{StubExtractor, StubSender, StubSummarizer};
