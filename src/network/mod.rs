//! Network side of the fan-out: socket setup, the datagram transport seam,
//! and the sender and receiver pipelines built on them

pub mod receiver;
pub mod sender;
pub mod transport;
pub mod udp;

pub use receiver::{ReceiverStats, RoutedBlock, StreamReceiver, Subscription};
pub use sender::{SenderStats, StreamSender};
pub use transport::{Transport, UdpTransport};
pub use udp::{create_control_listener, create_multicast_receiver, create_sender_socket, create_unicast_socket};
