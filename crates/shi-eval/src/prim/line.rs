//! Line-editing wrappers.
//!
//! Thin shims over the external line editor: prompt, history load/add/
//! save. The editor is created lazily on first use so non-interactive
//! runs never touch the terminal.

use rustyline::error::ReadlineError;

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

fn eval_one_str(ip: &mut Interp, env: Slot, args: Slot, who: &str) -> Result<String> {
    let values = eval_list(ip, env, args)?;
    let v = ip.car(values);
    if ip.tag(v) != Tag::Str {
        raise!("{}: 1st arg not string", who);
    }
    Ok(ip.text(v).to_string())
}

fn editor(ip: &mut Interp) -> Result<&mut rustyline::DefaultEditor> {
    if ip.editor.is_none() {
        match rustyline::DefaultEditor::new() {
            Ok(ed) => ip.editor = Some(ed),
            Err(_) => raise!("readline: cannot initialize line editor"),
        }
    }
    match ip.editor.as_mut() {
        Some(ed) => Ok(ed),
        None => raise!("readline: cannot initialize line editor"),
    }
}

/// (readline prompt): nil on end of input
pub fn prim_readline(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "readline: not given exactly 1 argument")?;
    let prompt = eval_one_str(ip, env, args, "readline")?;
    let line = match editor(ip)?.readline(&prompt) {
        Ok(line) => line,
        Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(ValRef::NIL),
        Err(_) => raise!("readline: error reading line"),
    };
    ip.make_str(&line)
}

/// (history-load path)
pub fn prim_history_load(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "history-load: not given exactly 1 argument")?;
    let path = eval_one_str(ip, env, args, "history-load")?;
    // A missing history file is not an error.
    let _ = editor(ip)?.load_history(&path);
    Ok(ValRef::NIL)
}

/// (history-add line): returns the line
pub fn prim_history_add(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "history-add: not given exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let v = ip.car(values);
    if ip.tag(v) != Tag::Str {
        raise!("history-add: 1st arg not string");
    }
    let line = ip.text(v).to_string();
    let _ = editor(ip)?.add_history_entry(line);
    Ok(v)
}

/// (history-save path)
pub fn prim_history_save(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "history-save: not given exactly 1 argument")?;
    let path = eval_one_str(ip, env, args, "history-save")?;
    let _ = editor(ip)?.save_history(&path);
    Ok(ValRef::NIL)
}
