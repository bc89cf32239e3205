//! Utility modules for common functionality

pub mod retry;

pub use retry::{PollError, PollPolicy, PollStatus};

/// Longest prefix of `s` that fits in `max_bytes` without splitting a UTF-8
/// character. Used to keep provider error bodies out of logs at full size.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
