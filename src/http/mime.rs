//! Content type detection.
//!
//! Two entry points: sniffing the first bytes of a body that is about to be
//! sent, and mapping a file extension for `send_file`.

/// Guess a content type from the leading bytes of a body.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let trimmed = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&data[data.len()..], |start| &data[start..]);

    match trimmed {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'%', b'P', b'D', b'F', b'-', ..] => "application/pdf",
        [b'P', b'K', 0x03, 0x04, ..] => "application/zip",
        [0x1F, 0x8B, 0x08, ..] => "application/x-gzip",
        [b'<', rest @ ..] if looks_like_html(rest) => "text/html; charset=utf-8",
        [b'<', b'?', b'x', b'm', b'l', ..] => "text/xml; charset=utf-8",
        _ if is_text(data) => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn looks_like_html(rest: &[u8]) -> bool {
    const TAGS: [&[u8]; 8] = [
        b"!doctype html",
        b"html",
        b"head",
        b"body",
        b"div",
        b"p",
        b"h1",
        b"script",
    ];
    TAGS.iter().any(|tag| {
        rest.len() > tag.len()
            && rest[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(rest[tag.len()], b' ' | b'>')
    })
}

fn is_text(data: &[u8]) -> bool {
    std::str::from_utf8(data).is_ok()
        && !data
            .iter()
            .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C))
}

/// Content type for a file extension.
pub fn content_type_for_extension(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "text/xml; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        _ => "application/octet-stream",
    }
}
