//! Interning pool for common RESP messages.
//!
//! Redis traffic is dominated by a handful of replies: `+OK`, `+PONG`, small
//! integers from counters and array lengths, and a fixed set of server
//! errors. Interning those means the decoder can hand back content views
//! into static storage and the encoder can reuse pre-rendered decimals, with
//! no allocation in either direction.

use std::collections::HashMap;
use std::sync::LazyLock;

use bytes::Bytes;

use crate::resp::message::RespMessage;

/// Simple strings every Redis deployment sends constantly.
const SIMPLE_STRINGS: &[&[u8]] = &[b"OK", b"PONG", b"QUEUED"];

/// The canonical server error replies, byte-exact.
const ERRORS: &[&[u8]] = &[
    b"ERR",
    b"ERR index out of range",
    b"ERR no such key",
    b"ERR source and destination objects are the same",
    b"ERR syntax error",
    b"BUSY Redis is busy running a script. You can only call SCRIPT KILL or SHUTDOWN NOSAVE.",
    b"BUSYKEY Target key name already exists.",
    b"ERR EXEC without MULTI",
    b"ERR MULTI calls can not be nested",
    b"LOADING Redis is loading the dataset in memory",
    b"MASTERDOWN Link with MASTER is down and slave-serve-stale-data is set to 'no'.",
    b"MISCONF Redis is configured to save RDB snapshots, but is currently not able to persist \
on disk. Commands that may modify the data set are disabled. Please check Redis logs for \
details about the error.",
    b"NOREPLICAS Not enough good slaves to write.",
    b"NOSCRIPT No matching script. Please use EVAL.",
    b"OOM command not allowed when used memory > 'maxmemory'.",
    b"READONLY You can't write against a read only slave.",
    b"WRONGTYPE Operation against a key holding the wrong kind of value",
];

/// Integer cache bounds, fixed by the wire behavior of common replies.
const INTEGER_MIN: i64 = -1;
const INTEGER_MAX: i64 = 128;

static SHARED: LazyLock<MessagePool> = LazyLock::new(MessagePool::new);

/// An immutable interning table for common simple strings, errors, and
/// small integers.
///
/// Built eagerly, safe to share across every connection without
/// synchronization. Lookups never allocate: hits hand out refcounted views
/// of the cached storage.
///
/// # Example
///
/// ```
/// use gangway_proto::resp::{MessagePool, RespMessage};
///
/// let pool = MessagePool::shared();
/// assert_eq!(pool.simple_string(b"OK"), Some(RespMessage::simple("OK")));
/// assert_eq!(pool.integer_bytes(42).as_deref(), Some(&b"42"[..]));
/// assert_eq!(pool.simple_string(b"NOPE"), None);
/// ```
#[derive(Debug)]
pub struct MessagePool {
    simple_strings: HashMap<&'static [u8], Bytes>,
    errors: HashMap<&'static [u8], Bytes>,
    integer_bytes: Vec<Bytes>,
}

impl Default for MessagePool {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePool {
    /// The process-wide shared pool.
    pub fn shared() -> &'static MessagePool {
        &SHARED
    }

    /// Build a pool. Prefer [`shared`](MessagePool::shared) unless a test
    /// needs an isolated instance.
    pub fn new() -> MessagePool {
        let simple_strings = SIMPLE_STRINGS
            .iter()
            .map(|&content| (content, Bytes::from_static(content)))
            .collect();
        let errors = ERRORS
            .iter()
            .map(|&content| (content, Bytes::from_static(content)))
            .collect();
        let integer_bytes = (INTEGER_MIN..INTEGER_MAX)
            .map(|value| Bytes::from(value.to_string()))
            .collect();
        MessagePool {
            simple_strings,
            errors,
            integer_bytes,
        }
    }

    /// Look up an interned simple string by content.
    pub fn simple_string(&self, content: &[u8]) -> Option<RespMessage> {
        self.simple_strings
            .get(content)
            .map(|cached| RespMessage::SimpleString(cached.clone()))
    }

    /// Look up an interned error by content.
    pub fn error(&self, content: &[u8]) -> Option<RespMessage> {
        self.errors
            .get(content)
            .map(|cached| RespMessage::Error(cached.clone()))
    }

    /// Look up an interned integer message by value.
    pub fn integer(&self, value: i64) -> Option<RespMessage> {
        self.in_range(value).then_some(RespMessage::Integer(value))
    }

    /// Look up the cached ASCII-decimal rendering of an integer.
    pub fn integer_bytes(&self, value: i64) -> Option<Bytes> {
        self.in_range(value)
            .then(|| self.integer_bytes[(value - INTEGER_MIN) as usize].clone())
    }

    fn in_range(&self, value: i64) -> bool {
        (INTEGER_MIN..INTEGER_MAX).contains(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_contents() {
        let pool = MessagePool::shared();
        assert!(pool.simple_string(b"OK").is_some());
        assert!(pool.simple_string(b"PONG").is_some());
        assert!(pool.simple_string(b"QUEUED").is_some());
        assert!(pool.simple_string(b"ok").is_none());

        assert!(pool.error(b"ERR").is_some());
        assert!(pool
            .error(b"WRONGTYPE Operation against a key holding the wrong kind of value")
            .is_some());
        assert!(pool.error(b"ERR something else").is_none());
        assert_eq!(ERRORS.len(), 17);
    }

    #[test]
    fn test_integer_cache_bounds() {
        let pool = MessagePool::shared();
        assert_eq!(pool.integer(-1), Some(RespMessage::Integer(-1)));
        assert_eq!(pool.integer(0), Some(RespMessage::Integer(0)));
        assert_eq!(pool.integer(127), Some(RespMessage::Integer(127)));
        assert_eq!(pool.integer(128), None);
        assert_eq!(pool.integer(-2), None);

        assert_eq!(pool.integer_bytes(-1).as_deref(), Some(&b"-1"[..]));
        assert_eq!(pool.integer_bytes(0).as_deref(), Some(&b"0"[..]));
        assert_eq!(pool.integer_bytes(127).as_deref(), Some(&b"127"[..]));
        assert_eq!(pool.integer_bytes(128), None);
    }

    #[test]
    fn test_lookups_share_storage() {
        let pool = MessagePool::shared();
        let first = pool.simple_string(b"OK").unwrap();
        let second = pool.simple_string(b"OK").unwrap();
        let (RespMessage::SimpleString(a), RespMessage::SimpleString(b)) = (first, second) else {
            panic!("expected simple strings");
        };
        // Identity, not just equality: both views point at the same storage.
        assert_eq!(a.as_ptr(), b.as_ptr());
    }
}
