use crate::http::path::strip_query;
use crate::http::request::Method;

/// Longest request or header line accepted, terminator included.
pub const MAX_LINE_LEN: usize = 2048;
/// Most header lines accepted in one request.
pub const MAX_HEADERS: usize = 32;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("connection closed before a request line")]
    NoRequest,
    #[error("malformed request line")]
    InvalidRequest,
    #[error("header line without ':' separator")]
    InvalidHeader,
    #[error("line exceeds the length limit")]
    LineTooLong,
    #[error("more than {} header lines", MAX_HEADERS)]
    TooManyHeaders,
    #[error("connection closed before end of headers")]
    Incomplete,
}

/// Method, path, query and version of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub version: String,
}

/// A blank line parses to an empty `Method::Other`, which is then answered
/// like any other unsupported method.
pub fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequest)?;
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(RequestLine {
            method: Method::Other(String::new()),
            path: String::new(),
            query: None,
            version: String::new(),
        });
    }

    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().unwrap_or_default();

    let path = strip_query(target);
    let query = target
        .split_once('?')
        .map(|(_, q)| q.to_string());

    Ok(RequestLine {
        method: Method::parse(method),
        path: path.to_string(),
        query,
        version: version.to_string(),
    })
}

/// True for the empty line that ends the header block.
pub fn is_end_of_headers(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Splits one header line into a trimmed `(name, value)` pair.
pub fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let line = String::from_utf8_lossy(line);

    let (key, value) = line
        .split_once(':')
        .ok_or(ParseError::InvalidHeader)?;

    Ok((key.trim().to_string(), value.trim().to_string()))
}
