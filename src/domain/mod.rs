pub mod events;

pub use events::{EventBus, ProcessingEvent, event_channel};
