//! Name resolution
//!
//! Turns a host and a port string into connection candidates. The port may be
//! numeric (`"8080"`) or a service name (`"http"`); on Unix both go through
//! the system `getaddrinfo`, so candidate order is whatever the resolver
//! returns.

use std::io;
use std::net::SocketAddr;

use crate::error::{ClientError, Result};

/// Resolve `host` and `port` into connection candidates, in resolver order.
///
/// Fails with [`ClientError::Connect`] when either part is blank, a numeric
/// port is out of range, the resolver errors, or resolution yields no
/// candidates.
pub fn resolve(host: &str, port: &str) -> Result<Vec<SocketAddr>> {
    let addr = format!("{}:{}", host, port);
    let (host, port) = (host.trim(), port.trim());

    if host.is_empty() {
        return Err(ClientError::connect(addr, "host must not be empty"));
    }
    if port.is_empty() {
        return Err(ClientError::connect(addr, "port must not be empty"));
    }
    if port.bytes().all(|b| b.is_ascii_digit()) && port.parse::<u16>().is_err() {
        return Err(ClientError::connect(&addr, format!("invalid port '{}'", port)));
    }

    let candidates = lookup(host, port)
        .map_err(|e| ClientError::connect(&addr, format!("address resolution failed: {}", e)))?;

    if candidates.is_empty() {
        return Err(ClientError::connect(addr, "address resolution returned no candidates"));
    }

    tracing::trace!("Resolved {} to {:?}", addr, candidates);
    Ok(candidates)
}

#[cfg(unix)]
fn lookup(host: &str, service: &str) -> io::Result<Vec<SocketAddr>> {
    use std::ffi::{CStr, CString, NulError};
    use std::ptr;

    let nul = |_: NulError| io::Error::new(io::ErrorKind::InvalidInput, "name contains a NUL byte");
    let c_host = CString::new(host).map_err(nul)?;
    let c_service = CString::new(service).map_err(nul)?;

    // SAFETY: addrinfo is a plain C struct; all-zero is the documented
    // "no hints" value
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;

    let mut list: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: both names are NUL-terminated and outlive the call; `list` is
    // only read when the call succeeds
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), c_service.as_ptr(), &hints, &mut list) };
    if rc != 0 {
        if rc == libc::EAI_SYSTEM {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: gai_strerror returns a static NUL-terminated string
        let message = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) };
        return Err(io::Error::new(
            io::ErrorKind::Other,
            message.to_string_lossy().into_owned(),
        ));
    }

    let mut candidates = Vec::new();
    let mut cursor = list;
    while !cursor.is_null() {
        // SAFETY: `cursor` walks the list getaddrinfo returned, freed below
        let info = unsafe { &*cursor };
        if let Some(addr) = unsafe { to_socket_addr(info.ai_addr, info.ai_addrlen) } {
            if !candidates.contains(&addr) {
                candidates.push(addr);
            }
        }
        cursor = info.ai_next;
    }

    // SAFETY: `list` came from a successful getaddrinfo and is freed once
    unsafe { libc::freeaddrinfo(list) };
    Ok(candidates)
}

/// Convert a resolver-owned `sockaddr` into a std address
///
/// # Safety
/// `addr` must be null or point to at least `len` readable bytes.
#[cfg(unix)]
unsafe fn to_socket_addr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<SocketAddr> {
    use std::mem::size_of;
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

    if addr.is_null() {
        return None;
    }
    let len = len as usize;

    match i32::from((*addr).sa_family) {
        libc::AF_INET if len >= size_of::<libc::sockaddr_in>() => {
            let sin = &*(addr as *const libc::sockaddr_in);
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sin.sin_port))))
        }
        libc::AF_INET6 if len >= size_of::<libc::sockaddr_in6>() => {
            let sin6 = &*(addr as *const libc::sockaddr_in6);
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

// No getaddrinfo binding off Unix; std's resolver takes numeric ports only
#[cfg(not(unix))]
fn lookup(host: &str, service: &str) -> io::Result<Vec<SocketAddr>> {
    use std::net::ToSocketAddrs;

    let port: u16 = service.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("service names are not supported on this platform: '{}'", service),
        )
    })?;
    Ok((host, port).to_socket_addrs()?.collect())
}
