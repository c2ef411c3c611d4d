use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};

use crate::error::{TraceError, TraceResult};

/// Largest reply we read from the socket
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Check that this process may open raw ICMP sockets
///
/// Run once at startup so a missing privilege is reported before any output.
pub fn check_permissions() -> TraceResult<()> {
    create_raw_icmp_socket().map(drop)
}

/// Create a blocking raw ICMPv4 socket
///
/// Received datagrams include the IPv4 header.
pub fn create_raw_icmp_socket() -> TraceResult<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
        .map_err(|e| TraceError::from_socket("socket", e))?;
    socket
        .set_nonblocking(false)
        .map_err(|e| TraceError::from_socket("set_nonblocking", e))?;
    Ok(socket)
}

/// Set TTL on a socket
pub fn set_ttl(socket: &Socket, ttl: u32) -> TraceResult<()> {
    socket
        .set_ttl(ttl)
        .map_err(|e| TraceError::from_socket("setsockopt(IP_TTL)", e))
}

/// Send ICMP packet to target
pub fn send_icmp(socket: &Socket, packet: &[u8], target: Ipv4Addr) -> TraceResult<usize> {
    let addr = SockAddr::from(SocketAddr::new(IpAddr::V4(target), 0));
    socket
        .send_to(packet, &addr)
        .map_err(|e| TraceError::from_socket("sendto", e))
}

/// Block until the socket is readable or `timeout` elapses
///
/// Returns false on timeout. A wait interrupted by a signal resumes with the
/// time remaining.
pub fn wait_readable(socket: &Socket, timeout: Duration) -> TraceResult<bool> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        let mut fds = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ret = unsafe { libc::poll(&mut fds, 1, millis) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                if remaining.is_zero() {
                    return Ok(false);
                }
                continue;
            }
            return Err(TraceError::from_socket("poll", err));
        }
        return Ok(ret > 0);
    }
}

/// Read one datagram into `buffer`
pub fn recv_icmp(socket: &Socket, buffer: &mut [u8]) -> TraceResult<usize> {
    let mut reader = socket;
    reader
        .read(buffer)
        .map_err(|e| TraceError::from_socket("recvfrom", e))
}
