//! OS primitives: file descriptors, time, process control.

use std::fs::OpenOptions;
use std::os::unix::io::IntoRawFd;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

/// (write fd str)
pub fn prim_write(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "write: not given exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("write: 1st arg not file descriptor");
    }
    let text = ip.car(ip.cdr(values));
    if ip.tag(text) != Tag::Str {
        raise!("write: 2nd arg not string");
    }
    let fd = ip.int_value(fd) as i32;
    let bytes = ip.text(text).as_bytes();
    let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
    if n < 0 {
        raise!("write: error");
    }
    Ok(ValRef::NIL)
}

/// (read fd len): up to len bytes; empty string at end of file
pub fn prim_read(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "read: not given exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("read: 1st arg not file descriptor");
    }
    let len = ip.car(ip.cdr(values));
    if ip.tag(len) != Tag::Int || ip.int_value(len) < 0 {
        raise!("read: 2nd arg not int");
    }
    let fd = ip.int_value(fd) as i32;
    let len = ip.int_value(len) as usize;
    let mut buf = vec![0u8; len];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, len) };
    if n < 0 {
        raise!("read: error");
    }
    let text = String::from_utf8_lossy(&buf[..n as usize]).into_owned();
    ip.make_str(&text)
}

/// (seconds): wall clock, seconds since the epoch
pub fn prim_seconds(ip: &mut Interp, _env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 0, "seconds: takes no args")?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    ip.make_int(now)
}

/// (sleep ms): blocks the whole process
pub fn prim_sleep(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "sleep: not given exactly 1 args")?;
    let values = eval_list(ip, env, args)?;
    let ms = ip.car(values);
    if ip.tag(ms) != Tag::Int {
        raise!("sleep: 1st arg not int");
    }
    let ms = ip.int_value(ms).max(0) as u64;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(ValRef::NIL)
}

/// (exit code)
pub fn prim_exit(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "exit: not given exactly 1 args")?;
    let values = eval_list(ip, env, args)?;
    let code = ip.car(values);
    if ip.tag(code) != Tag::Int {
        raise!("exit: 1st arg not int");
    }
    let code = ip.int_value(code) as i32;
    ip.shutdown(code);
}

/// (open path mode?): fopen-style mode string, default "r"; returns fd
pub fn prim_open(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    if ip.list_len(ip.load(args)).unwrap_or(0) < 1 {
        raise!("open: not given a path");
    }
    let values = eval_list(ip, env, args)?;
    let path = ip.car(values);
    if ip.tag(path) != Tag::Str {
        raise!("open: 1st arg not string");
    }
    let rest = ip.cdr(values);
    let mode = if rest != ValRef::NIL && ip.tag(ip.car(rest)) == Tag::Str {
        ip.text(ip.car(rest))
    } else {
        "r"
    };
    let mut opts = OpenOptions::new();
    match mode {
        "r" => opts.read(true),
        "r+" => opts.read(true).write(true),
        "w" => opts.write(true).create(true).truncate(true),
        "w+" => opts.read(true).write(true).create(true).truncate(true),
        "a" => opts.append(true).create(true),
        "a+" => opts.read(true).append(true).create(true),
        _ => raise!("open: unknown mode {}", mode),
    };
    let path = ip.text(path).to_string();
    let file = match opts.open(&path) {
        Ok(f) => f,
        Err(_) => raise!("open: error opening file"),
    };
    ip.make_int(file.into_raw_fd() as i64)
}

/// (close fd)
pub fn prim_close(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "close: not given exactly 1 arg")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("close: 1st arg not int");
    }
    if unsafe { libc::close(ip.int_value(fd) as i32) } < 0 {
        raise!("close: error closing file");
    }
    Ok(ValRef::NIL)
}

/// (isatty fd)
pub fn prim_isatty(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "isatty: not given exactly 1 args")?;
    let values = eval_list(ip, env, args)?;
    let fd = ip.car(values);
    if ip.tag(fd) != Tag::Int {
        raise!("isatty: 1st arg not int");
    }
    Ok(if unsafe { libc::isatty(ip.int_value(fd) as i32) } == 1 {
        ValRef::TRUE
    } else {
        ValRef::NIL
    })
}

/// (getenv name): nil when unset
pub fn prim_getenv(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "getenv: not given exactly 1 args")?;
    let values = eval_list(ip, env, args)?;
    let name = ip.car(values);
    if ip.tag(name) != Tag::Str {
        raise!("getenv: 1st arg not string");
    }
    match std::env::var(ip.text(name)) {
        Ok(v) => ip.make_str(&v),
        Err(_) => Ok(ValRef::NIL),
    }
}
