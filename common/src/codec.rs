use std::{borrow::Cow, collections::HashMap};

use crate::{
    error::{ParseError, TimeError},
    uri::Uri,
};

pub const NTP_PACKET_SIZE: usize = 48;
pub const NTP_PORT: u16 = 123;

pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

// LI = 3 (unsynchronized), VN = 4, Mode = 3 (client).
const NTP_CLIENT_HEADER: u8 = 0xE3;
const NTP_TRANSMIT_OFFSET: usize = 40;

const LINE_END: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const STATUS_PREFIX: &str = "HTTP/1.1 ";

pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 65_536;

pub fn encode_ntp_request() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0_u8; NTP_PACKET_SIZE];
    packet[0] = NTP_CLIENT_HEADER;
    packet
}

pub fn decode_ntp_response(buf: &[u8; NTP_PACKET_SIZE]) -> u32 {
    u32::from_be_bytes([
        buf[NTP_TRANSMIT_OFFSET],
        buf[NTP_TRANSMIT_OFFSET + 1],
        buf[NTP_TRANSMIT_OFFSET + 2],
        buf[NTP_TRANSMIT_OFFSET + 3],
    ])
}

/// Converts NTP seconds to Unix seconds. Wraps so that era 1 timestamps
/// (after 2036-02-07) still land on the right Unix second.
pub fn ntp_to_unix(seconds_since_1900: u32) -> u32 {
    seconds_since_1900.wrapping_sub(NTP_UNIX_OFFSET)
}

pub fn validate_ntp_reply(datagram: &[u8]) -> Result<[u8; NTP_PACKET_SIZE], TimeError> {
    let packet: [u8; NTP_PACKET_SIZE] = datagram.try_into().map_err(|_| {
        TimeError::MalformedReply(format!(
            "expected {NTP_PACKET_SIZE} bytes, got {}",
            datagram.len()
        ))
    })?;

    if decode_ntp_response(&packet) == 0 {
        return Err(TimeError::MalformedReply(
            "transmit timestamp is zero".to_string(),
        ));
    }

    Ok(packet)
}

pub fn encode_http_get(uri: &Uri) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\n\r\n",
        uri.path, uri.host
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse<'a> {
    pub status_code: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: &'a [u8],
}

impl ParsedResponse<'_> {
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup_header(&self.headers, name)
    }

    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        parse_content_length(&self.headers)
    }
}

/// Parses a buffered response. Returns [`ParseError::Incomplete`] until the
/// blank line that ends the header section has arrived, so it can be called
/// again each time more bytes are appended to `raw`.
pub fn parse_http_response(raw: &[u8]) -> Result<ParsedResponse<'_>, ParseError> {
    let Some(status_end) = find(raw, LINE_END) else {
        return Err(ParseError::Incomplete);
    };
    let status_line =
        std::str::from_utf8(&raw[..status_end]).map_err(|_| ParseError::Encoding)?;
    let (status_code, reason) = parse_status_line(status_line)?;

    let Some(head_end) = find(raw, HEADER_END) else {
        return Err(ParseError::Incomplete);
    };

    let mut headers = HashMap::new();
    if head_end > status_end {
        let fields = std::str::from_utf8(&raw[status_end + LINE_END.len()..head_end])
            .map_err(|_| ParseError::Encoding)?;
        for line in fields.split("\r\n") {
            let (key, value) = line
                .split_once(": ")
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| ParseError::HeaderField(line.to_string()))?;
            headers.insert(key.to_string(), value.to_string());
        }
    }

    Ok(ParsedResponse {
        status_code,
        reason: reason.to_string(),
        headers,
        body: &raw[head_end + HEADER_END.len()..],
    })
}

fn parse_status_line(line: &str) -> Result<(u16, &str), ParseError> {
    let invalid = || ParseError::StatusLine(line.to_string());

    let rest = line.strip_prefix(STATUS_PREFIX).ok_or_else(invalid)?;
    let (code, reason) = rest.split_once(' ').ok_or_else(invalid)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let code = code.parse::<u16>().map_err(|_| invalid())?;

    Ok((code, reason))
}

fn parse_content_length(headers: &HashMap<String, String>) -> Result<Option<usize>, ParseError> {
    lookup_header(headers, "Content-Length")
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::ContentLength(value.to_string()))
        })
        .transpose()
}

fn lookup_header<'h>(headers: &'h HashMap<String, String>, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup_header(&self.headers, name)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    NeedMore,
    Complete,
}

#[derive(Debug, Clone)]
struct Head {
    status_code: u16,
    reason: String,
    headers: HashMap<String, String>,
    body_start: usize,
    content_length: Option<usize>,
}

/// Accumulates a streamed response chunk by chunk, up to a fixed number of
/// bytes. Without a `Content-Length` the body ends when the peer closes the
/// connection.
#[derive(Debug)]
pub struct ResponseParser {
    buffer: Vec<u8>,
    head: Option<Head>,
    limit: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_RESPONSE_BYTES)
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            head: None,
            limit,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Progress, ParseError> {
        let declared_end = self
            .head
            .as_ref()
            .and_then(|head| head.content_length.map(|len| head.body_start + len));
        match declared_end {
            // Bytes past the declared body are dropped.
            Some(end) => {
                let room = end.saturating_sub(self.buffer.len());
                self.buffer
                    .extend_from_slice(&chunk[..room.min(chunk.len())]);
            }
            None => {
                if self.buffer.len() + chunk.len() > self.limit {
                    return Err(ParseError::TooLarge { limit: self.limit });
                }
                self.buffer.extend_from_slice(chunk);
            }
        }

        if self.head.is_none() {
            let head = match parse_http_response(&self.buffer) {
                Ok(parsed) => Head {
                    content_length: parsed.content_length()?,
                    body_start: self.buffer.len() - parsed.body.len(),
                    status_code: parsed.status_code,
                    reason: parsed.reason,
                    headers: parsed.headers,
                },
                Err(ParseError::Incomplete) => return Ok(Progress::NeedMore),
                Err(err) => return Err(err),
            };
            if let Some(len) = head.content_length {
                if head.body_start + len > self.limit {
                    return Err(ParseError::TooLarge { limit: self.limit });
                }
            }
            self.head = Some(head);
        }

        if self.is_complete() {
            Ok(Progress::Complete)
        } else {
            Ok(Progress::NeedMore)
        }
    }

    pub fn headers_parsed(&self) -> bool {
        self.head.is_some()
    }

    pub fn body_received(&self) -> usize {
        self.head
            .as_ref()
            .map(|head| self.buffer.len() - head.body_start)
            .unwrap_or(0)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.head.as_ref().and_then(|head| head.content_length)
    }

    pub fn is_complete(&self) -> bool {
        match self.content_length() {
            Some(expected) => self.body_received() >= expected,
            None => false,
        }
    }

    pub fn finish(self) -> Result<Response, ParseError> {
        let received = self.body_received();
        let Some(head) = self.head else {
            return Err(ParseError::ClosedBeforeHeader);
        };

        let mut body = self.buffer;
        body.drain(..head.body_start);
        if let Some(expected) = head.content_length {
            if received < expected {
                return Err(ParseError::Truncated { received, expected });
            }
            body.truncate(expected);
        }

        Ok(Response {
            status_code: head.status_code,
            reason: head.reason,
            headers: head.headers,
            body,
        })
    }
}
