//! Terminal raw mode.
//!
//! Raw mode follows the kilo recipe: no echo, no canonical buffering, no
//! signal characters, 100ms read timeout. The original attributes are
//! kept so every process exit path can restore them; `Interp::shutdown`
//! and the unhandled-error handler both go through `disable_raw`.

use shi_core::{raise, Result, Slot, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

pub struct TermState {
    /// Attributes to restore; `Some` while raw mode is active
    orig: Option<libc::termios>,
}

impl TermState {
    pub fn new() -> TermState {
        TermState { orig: None }
    }

    pub fn enable_raw(&mut self) -> std::io::Result<()> {
        if self.orig.is_some() {
            return Ok(());
        }
        if unsafe { libc::isatty(libc::STDIN_FILENO) } != 1 {
            return Err(std::io::Error::from_raw_os_error(libc::ENOTTY));
        }
        let mut orig: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut orig) } == -1 {
            return Err(std::io::Error::last_os_error());
        }

        let mut raw = orig;
        // Input: no break, no CR to NL, no parity check, no strip, no
        // start/stop control. Output: no post-processing. 8-bit chars.
        // Local: no echo, no canonical mode, no extended fns, no signals.
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 1;

        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw) } < 0 {
            return Err(std::io::Error::last_os_error());
        }
        self.orig = Some(orig);
        Ok(())
    }

    pub fn disable_raw(&mut self) {
        if let Some(orig) = self.orig.take() {
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &orig);
            }
        }
    }
}

impl Default for TermState {
    fn default() -> Self {
        Self::new()
    }
}

/// (term-raw flag): non-nil enables raw input mode, nil restores
pub fn prim_term_raw(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "term-raw: not given exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let flag = ip.car(values);
    if flag != ValRef::NIL {
        if ip.term.enable_raw().is_err() {
            raise!("term-raw: error enabling raw mode");
        }
    } else {
        ip.term.disable_raw();
    }
    Ok(ValRef::NIL)
}
