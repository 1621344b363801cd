use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response header is not terminated yet")]
    Incomplete,
    #[error("invalid status line: {0:?}")]
    StatusLine(String),
    #[error("invalid header field: {0:?}")]
    HeaderField(String),
    #[error("header section is not valid utf-8")]
    Encoding,
    #[error("invalid content length: {0:?}")]
    ContentLength(String),
    #[error("connection closed after {received} of {expected} body bytes")]
    Truncated { received: usize, expected: usize },
    #[error("connection closed before the response header was complete")]
    ClosedBeforeHeader,
    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("unsupported scheme in {0:?}")]
    Scheme(String),
    #[error("missing host in {0:?}")]
    Host(String),
    #[error("invalid port {0:?}")]
    Port(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("time is not synchronized yet")]
    NotSynchronized,
    #[error("a time update is already in progress")]
    Busy,
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("could not send time request: {0}")]
    Send(String),
    #[error("no time reply within {0} ms")]
    Timeout(u64),
    #[error("malformed time reply: {0}")]
    MalformedReply(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("a publish is already in progress")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor not found")]
    NotFound,
    #[error("measurement timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(String),
    #[error("weather service answered with status {0}")]
    Status(u16),
    #[error("could not decode weather report: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored data needs {size} bytes, capacity is {capacity}")]
    CapacityExceeded { size: usize, capacity: usize },
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
