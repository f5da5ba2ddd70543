use chrono::{DateTime, Utc};
use std::time::SystemTime;

pub fn unix(time: SystemTime) -> u32 {
    u32::try_from(DateTime::<Utc>::from(time).timestamp()).unwrap_or(0)
}

pub fn datetime(secs: u32) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::from(secs), 0)
}

/// Decodes a name whose length was reported separately from the buffer.
/// The count may exceed the buffer if the server truncated the value.
pub fn decode_counted(buf: &[u8], len: usize) -> String {
    String::from_utf8_lossy(&buf[..len.min(buf.len())]).into_owned()
}

/// Decodes a value that should be NUL-terminated but is not trusted to be:
/// the last byte is forced to NUL before scanning.
pub fn decode_terminated(buf: &mut [u8]) -> String {
    if let Some(last) = buf.last_mut() {
        *last = 0;
    }

    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
