//! Network primitives. IPv4 stream sockets only; every socket is put
//! into non-blocking mode on creation so `accept` can park in the event
//! loop instead of the kernel.

use std::net::Ipv4Addr;

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub(crate) fn set_nonblocking(fd: i32) -> std::io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// (socket domain type protocol) -> fd
pub fn prim_socket(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 3, "socket: not given exactly 3 args")?;
    let values = eval_list(ip, env, args)?;
    let domain = ip.car(values);
    if ip.tag(domain) != Tag::Int {
        raise!("socket: 1st arg not int");
    }
    let kind = ip.car(ip.cdr(values));
    if ip.tag(kind) != Tag::Int {
        raise!("socket: 2nd arg not int");
    }
    let protocol = ip.car(ip.cdr(ip.cdr(values)));
    if ip.tag(protocol) != Tag::Int {
        raise!("socket: 3rd arg not int");
    }

    let fd = unsafe {
        libc::socket(
            ip.int_value(domain) as i32,
            ip.int_value(kind) as i32,
            ip.int_value(protocol) as i32,
        )
    };
    if fd < 0 {
        raise!("socket: error creating socket");
    }
    if set_nonblocking(fd).is_err() {
        raise!("socket: error making socket non-blocking");
    }
    ip.make_int(fd as i64)
}

/// (bind-inet socket-fd host port)
pub fn prim_bind_inet(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 3, "bind-inet: not given exactly 3 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("bind-inet: 1st arg not int");
    }
    let host = ip.car(ip.cdr(values));
    if ip.tag(host) != Tag::Str {
        raise!("bind-inet: 2nd arg not string");
    }
    let port = ip.car(ip.cdr(ip.cdr(values)));
    if ip.tag(port) != Tag::Int {
        raise!("bind-inet: 3rd arg not int");
    }

    let addr: Ipv4Addr = match ip.text(host).parse() {
        Ok(a) => a,
        Err(_) => raise!("bind-inet: could not parse host"),
    };
    let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sa.sin_family = libc::AF_INET as libc::sa_family_t;
    sa.sin_port = (ip.int_value(port) as u16).to_be();
    sa.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());

    let r = unsafe {
        libc::bind(
            ip.int_value(fd) as i32,
            &sa as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if r < 0 {
        raise!("bind-inet: error binding to address");
    }
    Ok(ValRef::NIL)
}

/// (listen socket-fd backlog-size)
pub fn prim_listen(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "listen: not given exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("listen: 1st arg not int");
    }
    let backlog = ip.car(ip.cdr(values));
    if ip.tag(backlog) != Tag::Int {
        raise!("listen: 2nd arg not int");
    }

    if unsafe { libc::listen(ip.int_value(fd) as i32, ip.int_value(backlog) as i32) } < 0 {
        match errno() {
            libc::EACCES => raise!("listen: insufficient privileges"),
            libc::EBADF => raise!("listen: given socket is not a valid file descriptor"),
            libc::EINVAL => raise!("listen: socket is already listening"),
            libc::ENOTSOCK => raise!("listen: file descriptor given is not a valid socket"),
            libc::EOPNOTSUPP => raise!("listen: socket type not supported"),
            _ => raise!("listen: error"),
        }
    }
    Ok(ValRef::NIL)
}

/// (accept socket-fd): nil when nothing is ready
pub fn prim_accept(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "accept: not given exactly 1 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("accept: 1st arg not int");
    }

    let mut ca: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    let mut ca_len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
    let client = unsafe {
        libc::accept(
            ip.int_value(fd) as i32,
            &mut ca as *mut libc::sockaddr_in as *mut libc::sockaddr,
            &mut ca_len,
        )
    };
    if client < 0 {
        let e = errno();
        // Interrupted, or nothing pending on a non-blocking socket.
        // EWOULDBLOCK and EAGAIN alias on most platforms.
        if e == libc::EINTR || e == libc::EWOULDBLOCK || e == libc::EAGAIN {
            return Ok(ValRef::NIL);
        }
        return match e {
            libc::EBADF => raise!("accept: given socket is not a valid file descriptor"),
            libc::EINVAL => raise!("accept: socket is unwilling to accept connections"),
            libc::ENOTSOCK => raise!("accept: file descriptor given is not a valid socket"),
            libc::EOPNOTSUPP => raise!("accept: socket type is not SOCK_STREAM"),
            libc::ENOMEM => raise!("accept: out of memory"),
            libc::EMFILE => raise!("accept: process out of file descriptors"),
            libc::ENFILE => raise!("accept: system out of file descriptors"),
            _ => raise!("accept: error"),
        };
    }
    ip.make_int(client as i64)
}
