//! RESP2 parser and encoder
//!
//! The parser walks the buffer with a cursor and only consumes bytes once a
//! complete frame (including every element of a nested array) is available.

use super::types::{RespError, RespValue};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted, in bytes
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest array accepted, in elements
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Deepest array nesting accepted, commands only need one level
pub const MAX_DEPTH: usize = 8;

/// Longest type/length line accepted, CRLF excluded
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// RESP2 Parser
pub struct RespParser;

impl RespParser {
    /// Parse one frame from the front of `buf`
    ///
    /// Returns Ok(Some(value)) and advances the buffer if a complete frame
    /// was available, Ok(None) without touching the buffer if more data is
    /// needed, Err(e) if the bytes cannot be a valid frame.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        match Self::parse_at(&buf[..], 0, 0)? {
            Some((value, end)) => {
                buf.advance(end);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Parse the frame starting at `pos`, returning it with the offset just past it
    fn parse_at(
        buf: &[u8],
        pos: usize,
        depth: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let prefix = match buf.get(pos) {
            Some(&b) => b,
            None => return Ok(None),
        };

        if !matches!(prefix, b'+' | b'-' | b':' | b'$' | b'*') {
            return Err(RespError::InvalidProtocol(format!(
                "unknown type prefix: {:?}",
                prefix as char
            )));
        }

        let (line, next) = match Self::line_at(buf, pos + 1)? {
            Some(found) => found,
            None => return Ok(None),
        };

        match prefix {
            b'+' => Ok(Some((RespValue::SimpleString(Self::utf8(line)?), next))),
            b'-' => Ok(Some((RespValue::Error(Self::utf8(line)?), next))),
            b':' => Ok(Some((RespValue::Integer(Self::integer(line)?), next))),
            b'$' => Self::parse_bulk_string(buf, line, next),
            _ => Self::parse_array(buf, line, next, depth),
        }
    }

    /// Bulk string body after its $len line: foobar\r\n
    fn parse_bulk_string(
        buf: &[u8],
        len_line: &[u8],
        start: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let len = Self::integer(len_line)?;

        if len == -1 {
            return Ok(Some((RespValue::Null, start)));
        }
        if len < 0 {
            return Err(RespError::InvalidProtocol(format!(
                "invalid bulk string length: {}",
                len
            )));
        }
        if len > MAX_BULK_LEN {
            return Err(RespError::TooLarge(len));
        }

        let end = start + len as usize;
        if buf.len() < end + CRLF.len() {
            return Ok(None);
        }
        if &buf[end..end + CRLF.len()] != CRLF {
            return Err(RespError::InvalidProtocol(
                "missing CRLF after bulk string data".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[start..end]);
        Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
    }

    /// Array elements after the *count line
    fn parse_array(
        buf: &[u8],
        count_line: &[u8],
        start: usize,
        depth: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        if depth >= MAX_DEPTH {
            return Err(RespError::InvalidProtocol("nesting too deep".to_string()));
        }

        let count = Self::integer(count_line)?;

        if count == -1 {
            return Ok(Some((RespValue::Null, start)));
        }
        if count < 0 {
            return Err(RespError::InvalidProtocol(format!(
                "invalid array count: {}",
                count
            )));
        }
        if count > MAX_ARRAY_LEN {
            return Err(RespError::TooLarge(count));
        }

        let mut elements = Vec::with_capacity((count as usize).min(64));
        let mut cursor = start;
        for _ in 0..count {
            match Self::parse_at(buf, cursor, depth + 1)? {
                Some((value, next)) => {
                    elements.push(value);
                    cursor = next;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(elements), cursor)))
    }

    /// Find the line starting at `start`, returning it without CRLF and the offset after CRLF
    ///
    /// Only the first `MAX_LINE_LEN + 2` bytes are scanned; a longer line is an error
    /// even before its CRLF arrives.
    fn line_at(buf: &[u8], start: usize) -> Result<Option<(&[u8], usize)>, RespError> {
        let rest = match buf.get(start..) {
            Some(rest) => rest,
            None => return Ok(None),
        };
        let window = &rest[..rest.len().min(MAX_LINE_LEN + CRLF.len())];

        match window.windows(CRLF.len()).position(|w| w == CRLF) {
            Some(i) => Ok(Some((&rest[..i], start + i + CRLF.len()))),
            None if rest.len() > MAX_LINE_LEN + 1 => Err(RespError::InvalidProtocol(format!(
                "line longer than {} bytes",
                MAX_LINE_LEN
            ))),
            None => Ok(None),
        }
    }

    fn utf8(line: &[u8]) -> Result<String, RespError> {
        String::from_utf8(line.to_vec()).map_err(|_| RespError::InvalidUtf8)
    }

    fn integer(line: &[u8]) -> Result<i64, RespError> {
        std::str::from_utf8(line)
            .map_err(|_| RespError::InvalidUtf8)?
            .parse::<i64>()
            .map_err(|_| RespError::InvalidInteger)
    }
}

/// RESP2 Encoder
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a RESP value to bytes
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, value);
        buf.freeze()
    }

    /// Encode a RESP value into an existing buffer
    pub fn encode_to(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => Self::put_line(buf, b'+', s.as_bytes()),
            RespValue::Error(e) => Self::put_line(buf, b'-', e.as_bytes()),
            RespValue::Integer(i) => Self::put_line(buf, b':', i.to_string().as_bytes()),
            RespValue::BulkString(bytes) => {
                Self::put_line(buf, b'$', bytes.len().to_string().as_bytes());
                buf.put_slice(bytes);
                buf.put_slice(CRLF);
            }
            RespValue::Null => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(arr) => {
                Self::put_line(buf, b'*', arr.len().to_string().as_bytes());
                for elem in arr {
                    Self::encode_to(buf, elem);
                }
            }
        }
    }

    /// Simple strings and errors cannot carry CR or LF, replace them with spaces
    fn put_line(buf: &mut BytesMut, prefix: u8, body: &[u8]) {
        buf.put_u8(prefix);
        buf.extend(body.iter().map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
        buf.put_slice(CRLF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_string() {
        let mut buf = BytesMut::from("+OK\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::SimpleString("OK".to_string())));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_error() {
        let mut buf = BytesMut::from("-ERR unknown command\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::Error("ERR unknown command".to_string())));
    }

    #[test]
    fn test_parse_integer() {
        let mut buf = BytesMut::from(":-42\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::Integer(-42)));
    }

    #[test]
    fn test_parse_bulk_string_and_null() {
        let mut buf = BytesMut::from("$6\r\nfoobar\r\n$-1\r\n$0\r\n\r\n");
        assert_eq!(
            RespParser::parse(&mut buf).unwrap(),
            Some(RespValue::BulkString(Bytes::from("foobar")))
        );
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::Null));
        assert_eq!(
            RespParser::parse(&mut buf).unwrap(),
            Some(RespValue::BulkString(Bytes::new()))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_bulk_string_may_contain_crlf() {
        let mut buf = BytesMut::from("$4\r\na\r\nb\r\n");
        assert_eq!(
            RespParser::parse(&mut buf).unwrap(),
            Some(RespValue::BulkString(Bytes::from("a\r\nb")))
        );
    }

    #[test]
    fn test_parse_array() {
        let mut buf = BytesMut::from("*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        let result = RespParser::parse(&mut buf).unwrap();
        assert_eq!(result, Some(RespValue::command(["foo", "bar"])));
    }

    #[test]
    fn test_partial_array_consumes_nothing() {
        let full = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n";

        for cut in 1..full.len() {
            let mut buf = BytesMut::from(&full[..cut]);
            assert_eq!(RespParser::parse(&mut buf).unwrap(), None, "cut at {}", cut);
            assert_eq!(buf.len(), cut);
        }

        let mut buf = BytesMut::from(&full[..]);
        assert_eq!(
            RespParser::parse(&mut buf).unwrap(),
            Some(RespValue::command(["SET", "key", "value"]))
        );
    }

    #[test]
    fn test_pipelined_frames() {
        let mut buf = BytesMut::from("*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n*1\r\n$3");

        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::command(["PING"])));
        assert_eq!(RespParser::parse(&mut buf).unwrap(), Some(RespValue::command(["GET", "k"])));
        assert_eq!(RespParser::parse(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"*1\r\n$3");
    }

    #[test]
    fn test_unknown_prefix() {
        let mut buf = BytesMut::from("GET key\r\n");
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_line_length_limit() {
        // Partial line still within the limit: wait for more
        let mut buf = BytesMut::from(format!("+{}", "a".repeat(MAX_LINE_LEN)).as_str());
        assert_eq!(RespParser::parse(&mut buf), Ok(None));

        // No CRLF past the limit: reject instead of buffering forever
        let mut buf = BytesMut::from(format!("+{}", "a".repeat(MAX_LINE_LEN + 2)).as_str());
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::InvalidProtocol(_))
        ));

        let mut buf = BytesMut::from(format!("+{}\r\n", "a".repeat(MAX_LINE_LEN)).as_str());
        let value = RespParser::parse(&mut buf).unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString("a".repeat(MAX_LINE_LEN)));
    }

    #[test]
    fn test_invalid_lengths() {
        let mut buf = BytesMut::from("$-5\r\n");
        assert!(RespParser::parse(&mut buf).is_err());

        let mut buf = BytesMut::from("$abc\r\n");
        assert_eq!(RespParser::parse(&mut buf), Err(RespError::InvalidInteger));

        let mut buf = BytesMut::from("$3\r\nfoobar\r\n");
        assert!(RespParser::parse(&mut buf).is_err());

        let mut buf = BytesMut::from(format!("*{}\r\n", MAX_ARRAY_LEN + 1).as_str());
        assert_eq!(RespParser::parse(&mut buf), Err(RespError::TooLarge(MAX_ARRAY_LEN + 1)));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| {
            let mut frame = "*1\r\n".repeat(levels);
            frame.push_str("$1\r\nx\r\n");
            BytesMut::from(frame.as_str())
        };

        let mut buf = nested(MAX_DEPTH);
        assert!(RespParser::parse(&mut buf).unwrap().is_some());
        assert!(buf.is_empty());

        let mut buf = nested(MAX_DEPTH + 1);
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::InvalidProtocol(_))
        ));

        // Rejected without recursing through every level
        let mut buf = nested(200_000);
        assert!(matches!(
            RespParser::parse(&mut buf),
            Err(RespError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_encode_simple_string() {
        let encoded = RespEncoder::encode(&RespValue::simple_string("OK"));
        assert_eq!(encoded, Bytes::from("+OK\r\n"));
    }

    #[test]
    fn test_encode_error_strips_newlines() {
        let encoded = RespEncoder::encode(&RespValue::error("ERR bad\r\nthing"));
        assert_eq!(encoded, Bytes::from("-ERR bad  thing\r\n"));
    }

    #[test]
    fn test_encode_bulk_string_and_null() {
        let encoded = RespEncoder::encode(&RespValue::bulk_string("foobar"));
        assert_eq!(encoded, Bytes::from("$6\r\nfoobar\r\n"));
        assert_eq!(RespEncoder::encode(&RespValue::Null), Bytes::from("$-1\r\n"));
    }

    #[test]
    fn test_encode_command() {
        let encoded = RespEncoder::encode(&RespValue::command(["GET", "example"]));
        assert_eq!(encoded, Bytes::from("*2\r\n$3\r\nGET\r\n$7\r\nexample\r\n"));
    }
}
