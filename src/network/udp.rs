//! UDP socket construction
//!
//! Sockets leave here fully configured (buffers, multicast options, group
//! membership, binding); the rest of the crate only sends and receives.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use crate::config::NetworkConfig;
use crate::error::NetworkError;

fn setup(what: &'static str) -> impl FnOnce(std::io::Error) -> NetworkError {
    move |e| NetworkError::SocketSetup(format!("{}: {}", what, e))
}

fn new_udp_socket(buffer_size: usize) -> Result<Socket, NetworkError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(setup("create socket"))?;

    if buffer_size > 0 {
        if let Err(e) = socket.set_send_buffer_size(buffer_size) {
            tracing::warn!(error = %e, size = buffer_size, "could not set send buffer size");
        }
        if let Err(e) = socket.set_recv_buffer_size(buffer_size) {
            tracing::warn!(error = %e, size = buffer_size, "could not set receive buffer size");
        }
    }

    Ok(socket)
}

/// Socket that sends the data stream.
///
/// Multicast output goes through the configured interface.
pub fn create_sender_socket(config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let socket = new_udp_socket(config.socket_buffer_size)?;

    socket
        .set_reuse_address(true)
        .map_err(setup("SO_REUSEADDR"))?;
    socket
        .set_multicast_ttl_v4(config.multicast_ttl)
        .map_err(setup("IP_MULTICAST_TTL"))?;
    socket
        .set_multicast_loop_v4(config.multicast_loop)
        .map_err(setup("IP_MULTICAST_LOOP"))?;
    if !config.interface.is_unspecified() {
        socket
            .set_multicast_if_v4(&config.interface)
            .map_err(setup("IP_MULTICAST_IF"))?;
    }

    let bind = SocketAddrV4::new(config.interface, 0);
    socket
        .bind(&SockAddr::from(bind))
        .map_err(setup("bind"))?;

    let socket: UdpSocket = socket.into();
    tracing::info!(
        local = ?socket.local_addr().ok(),
        ttl = config.multicast_ttl,
        "sender socket ready"
    );
    Ok(socket)
}

/// Non-blocking socket on the control port, where subscribe messages arrive
pub fn create_control_listener(config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let socket = new_udp_socket(0)?;
    socket
        .set_reuse_address(true)
        .map_err(setup("SO_REUSEADDR"))?;

    let bind = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.control_port);
    socket
        .bind(&SockAddr::from(bind))
        .map_err(setup("bind control port"))?;
    socket
        .set_nonblocking(true)
        .map_err(setup("non-blocking"))?;

    tracing::info!(port = config.control_port, "control listener bound");
    Ok(socket.into())
}

/// Socket that receives the multicast data stream
pub fn create_multicast_receiver(config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let group = config.multicast_addr;
    if !group.is_multicast() {
        return Err(NetworkError::SocketSetup(format!("{} is not a multicast group", group)));
    }

    let socket = new_udp_socket(config.socket_buffer_size)?;
    socket
        .set_reuse_address(true)
        .map_err(setup("SO_REUSEADDR"))?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket
        .set_reuse_port(true)
        .map_err(setup("SO_REUSEPORT"))?;

    let bind = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.data_port);
    socket
        .bind(&SockAddr::from(bind))
        .map_err(setup("bind data port"))?;
    socket
        .join_multicast_v4(&group, &config.interface)
        .map_err(setup("join multicast group"))?;

    let socket: UdpSocket = socket.into();
    tracing::info!(%group, port = config.data_port, interface = %config.interface, "joined multicast group");
    Ok(socket)
}

/// Plain socket bound to `addr`, for unicast reception
pub fn create_unicast_socket(addr: SocketAddr, buffer_size: usize) -> Result<UdpSocket, NetworkError> {
    let socket = new_udp_socket(buffer_size)?;
    socket
        .set_reuse_address(true)
        .map_err(setup("SO_REUSEADDR"))?;
    socket
        .bind(&SockAddr::from(addr))
        .map_err(setup("bind"))?;

    let socket: UdpSocket = socket.into();
    tracing::info!(local = ?socket.local_addr().ok(), "unicast socket ready");
    Ok(socket)
}
