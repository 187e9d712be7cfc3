//! Extension → content-type lookup.
//!
//! A deliberately small table covering what web applications actually serve.
//! Unknown extensions resolve to `application/octet-stream`.

use std::path::Path;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types the framework knows by extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Gif,          // image/gif
    Html,         // text/html
    Ico,          // image/x-icon
    JavaScript,   // text/javascript
    Jpeg,         // image/jpeg
    Json,         // application/json
    Markdown,     // text/markdown
    Mp3,          // audio/mpeg
    Mp4,          // video/mp4
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain
    Wasm,         // application/wasm
    Webp,         // image/webp
    Woff,         // font/woff
    Woff2,        // font/woff2
    Xml,          // application/xml
    Zip,          // application/zip
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html",
            Self::Ico         => "image/x-icon",
            Self::JavaScript  => "text/javascript",
            Self::Jpeg        => "image/jpeg",
            Self::Json        => "application/json",
            Self::Markdown    => "text/markdown",
            Self::Mp3         => "audio/mpeg",
            Self::Mp4         => "video/mp4",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain",
            Self::Wasm        => "application/wasm",
            Self::Webp        => "image/webp",
            Self::Woff        => "font/woff",
            Self::Woff2       => "font/woff2",
            Self::Xml         => "application/xml",
            Self::Zip         => "application/zip",
        }
    }

    /// Looks up an extension without the leading dot, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let ty = match ext.as_str() {
            "css"                => Self::Css,
            "csv"                => Self::Csv,
            "gif"                => Self::Gif,
            "htm" | "html"       => Self::Html,
            "ico"                => Self::Ico,
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "jpg" | "jpeg"       => Self::Jpeg,
            "json" | "map"       => Self::Json,
            "md" | "markdown"    => Self::Markdown,
            "mp3"                => Self::Mp3,
            "mp4"                => Self::Mp4,
            "bin"                => Self::OctetStream,
            "pdf"                => Self::Pdf,
            "png"                => Self::Png,
            "svg"                => Self::Svg,
            "txt" | "text"       => Self::Text,
            "wasm"               => Self::Wasm,
            "webp"               => Self::Webp,
            "woff"               => Self::Woff,
            "woff2"              => Self::Woff2,
            "xml"                => Self::Xml,
            "zip"                => Self::Zip,
            _ => return None,
        };
        Some(ty)
    }
}

/// Resolves a type shorthand the way `Response::content_type` accepts it:
/// a full type (`"text/plain; charset=latin1"`) passes through, anything
/// else is treated as an extension or file name (`"json"`, `".html"`,
/// `"report.pdf"`).
pub fn lookup(shorthand: &str) -> &str {
    if shorthand.contains('/') {
        return shorthand;
    }
    let ext = shorthand.rsplit('.').next().unwrap_or(shorthand);
    ContentType::from_extension(ext).unwrap_or(ContentType::OctetStream).as_str()
}

/// Like [`lookup`] but returns `None` for unknown extensions.
pub fn lookup_known(shorthand: &str) -> Option<&str> {
    if shorthand.contains('/') {
        return Some(shorthand);
    }
    let ext = shorthand.rsplit('.').next().unwrap_or(shorthand);
    ContentType::from_extension(ext).map(|t| t.as_str())
}

/// Content type for a file path, from its extension.
pub fn for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::OctetStream)
        .as_str()
}

/// Default charset for a media type: UTF-8 for text and JSON/JavaScript.
pub fn default_charset(media_type: &str) -> Option<&'static str> {
    let essence = media_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let textual = essence.starts_with("text/")
        || essence == "application/json"
        || essence == "application/javascript";
    textual.then_some("utf-8")
}

/// Adds the default charset to `value` unless it already names one.
pub(crate) fn with_default_charset(value: &str) -> String {
    if has_charset(value) {
        return value.to_owned();
    }
    match default_charset(value) {
        Some(cs) => format!("{value}; charset={cs}"),
        None => value.to_owned(),
    }
}

/// Replaces (or adds) the charset parameter of a content type.
pub(crate) fn set_charset(value: &str, charset: &str) -> String {
    let mut parts = value.split(';').map(str::trim).filter(|p| !p.is_empty());
    let essence = parts.next().unwrap_or("");
    let mut out = essence.to_owned();
    for p in parts {
        if !p.to_ascii_lowercase().starts_with("charset=") {
            out.push_str("; ");
            out.push_str(p);
        }
    }
    out.push_str("; charset=");
    out.push_str(charset);
    out
}

fn has_charset(value: &str) -> bool {
    value.split(';').skip(1).any(|p| p.trim().to_ascii_lowercase().starts_with("charset="))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_lookup() {
        assert_eq!(lookup("json"), "application/json");
        assert_eq!(lookup(".html"), "text/html");
        assert_eq!(lookup("report.PDF"), "application/pdf");
        assert_eq!(lookup("image/png"), "image/png");
        assert_eq!(lookup("nope"), "application/octet-stream");
        assert_eq!(lookup_known("nope"), None);
    }

    #[test]
    fn charset_rules() {
        assert_eq!(with_default_charset("text/html"), "text/html; charset=utf-8");
        assert_eq!(with_default_charset("image/png"), "image/png");
        assert_eq!(with_default_charset("text/plain; charset=latin1"), "text/plain; charset=latin1");
        assert_eq!(set_charset("text/plain; charset=latin1", "utf-8"), "text/plain; charset=utf-8");
        assert_eq!(set_charset("application/json", "utf-8"), "application/json; charset=utf-8");
    }
}
