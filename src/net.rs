//! Best-effort LAN address resolution.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Well-known gateway address used to force outbound interface selection.
/// No packet is ever sent; UDP connect only binds a route.
const PROBE_GATEWAY: &str = "192.168.0.1:80";

/// Returns the host's best-guess LAN-reachable IPv4 address.
///
/// Opens a UDP socket and "connects" it to a gateway address purely so the
/// OS picks the outbound interface, then reads the local endpoint back.
/// Never fails: without a usable interface (or in a sandbox) this degrades
/// to loopback, which keeps the provisioning link usable from the host
/// machine itself.
pub fn local_ip() -> IpAddr {
    try_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn try_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(PROBE_GATEWAY)?;
    Ok(socket.local_addr()?.ip())
}
