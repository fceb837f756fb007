use std::cell::{Cell, RefCell};
use std::ffi::{CStr, c_char, c_int, c_void};

pub(crate) const WARNING_TARGET: &str = "pluto::lua";

/// Receives the guest's `warn(...)` output and forwards complete messages to `log`.
///
/// Lua delivers a warning in pieces; every piece but the last has `tocont` set. A single-piece
/// message starting with `@` is a control message: `@on` and `@off` toggle emission, anything
/// else is ignored.
#[derive(Debug, Default)]
pub(crate) struct WarnSink {
    enabled: Cell<bool>,
    pending: RefCell<String>,
}

impl WarnSink {
    pub fn new(enabled: bool) -> Self {
        WarnSink {
            enabled: Cell::new(enabled),
            pending: RefCell::new(String::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Feeds one piece; returns the finished message when `piece` completes one that is
    /// emitted.
    pub fn write(&self, piece: &str, continued: bool) -> Option<String> {
        let mut pending = self.pending.borrow_mut();

        if pending.is_empty() && !continued && piece.starts_with('@') {
            match piece {
                "@on" => self.enabled.set(true),
                "@off" => self.enabled.set(false),
                _ => {}
            }
            return None;
        }

        pending.push_str(piece);
        if continued {
            return None;
        }

        let message = std::mem::take(&mut *pending);
        if self.enabled.get() {
            log::warn!(target: WARNING_TARGET, "{}", message);
            Some(message)
        } else {
            None
        }
    }
}

/// `lua_WarnFunction` installed on every owned state; `ud` points at the state's [`WarnSink`].
pub(crate) unsafe extern "C-unwind" fn forward_warning(
    ud: *mut c_void,
    msg: *const c_char,
    tocont: c_int,
) {
    if ud.is_null() || msg.is_null() {
        return;
    }

    let sink = unsafe { &*(ud as *const WarnSink) };
    let piece = unsafe { CStr::from_ptr(msg) }.to_string_lossy();
    sink.write(&piece, tocont != 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_sink_drops_messages() {
        let sink = WarnSink::new(false);
        assert_eq!(sink.write("hidden", false), None);
        assert!(!sink.is_enabled());
    }

    #[test]
    fn test_control_messages_toggle_emission() {
        let sink = WarnSink::new(false);
        assert_eq!(sink.write("@on", false), None);
        assert!(sink.is_enabled());
        assert_eq!(sink.write("visible", false), Some("visible".to_string()));
        sink.write("@off", false);
        assert_eq!(sink.write("hidden", false), None);
    }

    #[test]
    fn test_pieces_are_joined() {
        let sink = WarnSink::new(true);
        assert_eq!(sink.write("disk ", true), None);
        assert_eq!(sink.write("almost ", true), None);
        assert_eq!(sink.write("full", false), Some("disk almost full".to_string()));
    }

    #[test]
    fn test_at_sign_inside_a_multi_piece_message_is_text() {
        let sink = WarnSink::new(true);
        sink.write("mail ", true);
        assert_eq!(sink.write("@home", false), Some("mail @home".to_string()));
    }

    #[test]
    fn test_unknown_control_message_is_ignored() {
        let sink = WarnSink::new(true);
        assert_eq!(sink.write("@verbose", false), None);
        assert!(sink.is_enabled());
    }

    #[test]
    fn test_forward_warning_reads_c_strings() {
        let sink = WarnSink::new(false);
        let ud = &sink as *const WarnSink as *mut c_void;
        unsafe {
            forward_warning(ud, c"@on".as_ptr(), 0);
            forward_warning(ud, std::ptr::null(), 0);
        }
        assert!(sink.is_enabled());
    }
}
