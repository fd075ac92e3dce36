pub mod context;
pub mod error;
pub mod event;
pub mod location;
pub mod time_window;

pub use context::{Context, WorkingHours};
pub use error::*;
pub use event::*;
pub use location::Location;
pub use time_window::TimeWindow;
