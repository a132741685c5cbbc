//! Chat widget: a local transcript driven by calls to the relay.

pub mod terminal;
pub mod transcript;
pub mod transport;
pub mod widget;

pub use terminal::run_terminal;
pub use transcript::{Message, Sender, Transcript};
pub use transport::{HttpTransport, RelayReply, RelayTransport, WidgetError};
pub use widget::{ChatWidget, WidgetEvent, NO_RESPONSE_TEXT, UNKNOWN_ERROR_TEXT};
