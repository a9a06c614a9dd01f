//! Human-readable previews of raw serial bytes for log lines.
//!
//! The bridge itself never decodes data; this is only used when debug
//! logging is enabled.

use encoding_rs::UTF_8;

/// Characters kept in a preview before it is cut off.
pub const PREVIEW_CHARS: usize = 64;

pub fn preview(bytes: &[u8]) -> String {
    let text = detect_and_decode(bytes);
    let mut out = String::new();
    let mut shown = 0;
    for c in text.chars() {
        if shown == PREVIEW_CHARS {
            out.push_str("...");
            break;
        }
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
        shown += 1;
    }
    out
}

fn detect_and_decode(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    if encoding == UTF_8 {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    encoding.decode(bytes).0.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_line_endings() {
        assert_eq!(preview(b"OK\r\n"), "OK\\r\\n");
    }

    #[test]
    fn empty_input_is_empty_preview() {
        assert_eq!(preview(b""), "");
    }

    #[test]
    fn long_input_is_truncated() {
        let data = vec![b'a'; PREVIEW_CHARS + 10];
        let shown = preview(&data);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn invalid_utf8_still_previews() {
        let shown = preview(&[0x68, 0x69, 0xff, 0xfe]);
        assert!(shown.starts_with("hi"));
    }
}
