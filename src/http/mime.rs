/// Content type and cacheability of a served file.
///
/// HTML is never cacheable: the captive-redirect substitution must be seen on
/// every fresh request. Assets referenced by that HTML may be cached for long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeDescriptor {
    pub content_type: &'static str,
    pub cacheable: bool,
}

impl MimeDescriptor {
    const fn new(content_type: &'static str, cacheable: bool) -> Self {
        Self { content_type, cacheable }
    }
}

pub const DEFAULT_MIME: MimeDescriptor = MimeDescriptor::new("text/plain", false);

/// Looks up the content type from the extension of the final path segment.
///
/// # Example
///
/// ```
/// # use captive::http::mime::classify;
/// let mime = classify("/wwwroot/style.CSS");
/// assert_eq!(mime.content_type, "text/css");
/// assert!(mime.cacheable);
/// ```
pub fn classify(path: &str) -> MimeDescriptor {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return DEFAULT_MIME;
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" => MimeDescriptor::new("text/html", false),
        "css" => MimeDescriptor::new("text/css", true),
        "js" => MimeDescriptor::new("text/javascript", true),
        "png" => MimeDescriptor::new("image/png", true),
        "gif" => MimeDescriptor::new("image/gif", true),
        "jpeg" | "jpg" => MimeDescriptor::new("image/jpeg", true),
        "ttf" => MimeDescriptor::new("font/ttf", true),
        "woff" => MimeDescriptor::new("font/woff", true),
        "woff2" => MimeDescriptor::new("font/woff2", true),
        "pdf" => MimeDescriptor::new("application/pdf", true),
        "ico" => MimeDescriptor::new("image/x-icon", true),
        _ => DEFAULT_MIME,
    }
}
