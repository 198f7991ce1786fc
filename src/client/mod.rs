pub mod auth;
pub mod dispatch;
pub mod events;
pub mod handshake;
pub mod session;
pub mod tasks;
pub mod text;

pub use auth::{HttpSessionService, OfflineSessionService, Session, SessionService};
pub use dispatch::{Dispatcher, Flow};
pub use events::{DisconnectReason, EventCollector, EventHandler, GameEvent};
pub use handshake::ConnectionState;
pub use session::{ChatSender, Client, ClientBuilder, ClientConfig};
pub use tasks::BackgroundTask;
pub use text::{ansi_escapes, strip_escapes};
