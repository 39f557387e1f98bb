//! Per-session cursor over a flattened section list.

use crate::routing::ResponseKind;
use crate::sequence::entries::SectionEntry;
use crate::session::SessionState;

/// Session key for one route, kind and method list.
pub fn sequence_key(url: &str, kind: ResponseKind, method: &str) -> String {
    format!("{url}:{}:{method}", kind.as_str())
}

/// Clamp a stored cursor into `[0, len - 1]`.
pub fn clamp(position: usize, len: usize) -> usize {
    position.min(len.saturating_sub(1))
}

/// Cursor after `position` for a list of `len` entries.
///
/// Looping lists wrap, others stick at the last entry.
pub fn next_position(position: usize, len: usize, looping: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if looping {
        (position + 1) % len
    } else {
        (position + 1).min(len - 1)
    }
}

/// Pick the current entry for `key` and move the stored cursor along.
///
/// Returns the selected index. The cursor only advances when there is more
/// than one entry; the selected entry's `loop` option decides wrap-around.
pub fn select_and_advance(
    state: &mut SessionState,
    key: &str,
    entries: &[SectionEntry],
) -> usize {
    let len = entries.len();
    let position = clamp(state.position(key), len);
    if len > 1 {
        let looping = entries[position].options.looping;
        state.set_position(key, next_position(position, len, looping));
    }
    position
}
