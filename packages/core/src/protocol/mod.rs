// Протокол реального времени: кадры, wire-формат, транспорт

pub mod messages;
#[cfg(feature = "native")]
pub mod socket;
pub mod transport;
pub mod wire;

pub use messages::{ClientFrame, ServerFrame};
pub use transport::{ConnectionState, Connector, Socket, SocketEvent, Transport, TransportEvent};
