//! Observed content handed to signatures.

/// Bytes observed from a target, with the views rules match against.
///
/// HTTP content that starts with a status line is split into header and
/// body at the first blank line; other HTTP content is all body.
/// Socket content is a single banner: header and body both see all of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    raw: Vec<u8>,
    text: String,
    header_end: usize,
    body_start: usize,
    cert: String,
    is_http: bool,
}

impl Content {
    pub fn new(raw: &[u8], cert: &str, is_http: bool) -> Self {
        let text = String::from_utf8_lossy(raw).into_owned();
        let (header_end, body_start) = if is_http {
            split_http(&text)
        } else {
            (text.len(), 0)
        };

        Self {
            raw: raw.to_vec(),
            text,
            header_end,
            body_start,
            cert: cert.to_string(),
            is_http,
        }
    }

    /// HTTP response content with optional certificate text.
    pub fn http(raw: &[u8], cert: &str) -> Self {
        Self::new(raw, cert, true)
    }

    /// Raw socket banner.
    pub fn socket(raw: &[u8]) -> Self {
        Self::new(raw, "", false)
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whole content as (lossy) text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn header(&self) -> &str {
        &self.text[..self.header_end]
    }

    pub fn body(&self) -> &str {
        &self.text[self.body_start..]
    }

    pub fn cert(&self) -> &str {
        &self.cert
    }

    pub fn is_http(&self) -> bool {
        self.is_http
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.cert.is_empty()
    }
}

/// Returns `(header_end, body_start)` byte offsets. Only text starting
/// with a status line has a header; anything else is all body.
fn split_http(text: &str) -> (usize, usize) {
    if !text.starts_with("HTTP/") {
        return (0, 0);
    }
    if let Some(pos) = text.find("\r\n\r\n") {
        return (pos, pos + 4);
    }
    if let Some(pos) = text.find("\n\n") {
        return (pos, pos + 2);
    }
    (text.len(), text.len())
}
