pub mod sink;

pub use sink::{EventSink, UserId};
