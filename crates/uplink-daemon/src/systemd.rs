use std::env;
use std::io;
use std::os::unix::net::UnixDatagram;

use tracing::warn;

pub fn notify_ready() {
    if let Err(err) = sd_notify("READY=1") {
        warn!("sd_notify READY failed: {}", err);
    }
}

pub fn notify_stopping() {
    if let Err(err) = sd_notify("STOPPING=1") {
        warn!("sd_notify STOPPING failed: {}", err);
    }
}

/// Send `message` to the service manager. A missing `NOTIFY_SOCKET` is not an
/// error: the daemon is simply not running under systemd.
pub fn sd_notify(message: &str) -> io::Result<()> {
    match env::var("NOTIFY_SOCKET") {
        Ok(socket) => send_to(&socket, message),
        Err(_) => Ok(()),
    }
}

fn send_to(socket: &str, message: &str) -> io::Result<()> {
    let sock = UnixDatagram::unbound()?;
    match socket.strip_prefix('@') {
        Some(name) => send_abstract(&sock, name, message),
        None => sock.send_to(message.as_bytes(), socket).map(|_| ()),
    }
}

#[cfg(target_os = "linux")]
fn send_abstract(sock: &UnixDatagram, name: &str, message: &str) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    if name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "notify socket name is empty",
        ));
    }
    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    sock.send_to_addr(message.as_bytes(), &addr).map(|_| ())
}

#[cfg(not(target_os = "linux"))]
fn send_abstract(_sock: &UnixDatagram, _name: &str, _message: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract notify sockets are Linux-only",
    ))
}
