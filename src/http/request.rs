use std::collections::HashMap;

/// HTTP request methods.
///
/// Only GET is served; every other token is answered with
/// `500 Not Implemented`, so nothing finer is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    /// Any other token sent by the client, empty for a blank request line
    Other(String),
}

impl Method {
    /// Parses an HTTP method token. Matching is case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use captive::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::Get);
    /// assert_eq!(Method::parse("get"), Method::Other("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            other => Method::Other(other.to_string()),
        }
    }
}

/// A parsed request head. Requests are never expected to carry a body.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Resource path with any query string removed (e.g. "/index.html")
    pub path: String,
    /// Query string without the leading `?`, if one was sent
    pub query: Option<String>,
    /// HTTP version as sent; empty for HTTP/0.9 style request lines
    pub version: String,
    /// Header names as sent, values trimmed
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Retrieves a header value by exact name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key)
            .map(|v| v.as_str())
    }

    /// The `Host` header, used for logging which name the client was after.
    pub fn host(&self) -> Option<&str> {
        self.header("Host")
    }
}
