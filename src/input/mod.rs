pub mod events;

pub use events::{is_quick_click, EventHandled, InputEvent, ViewerEvent};
