//! Binary-safe extraction of the file part from a raw multipart/form-data body.
//!
//! The payload can contain arbitrary bytes, including CRLFs and
//! boundary-lookalike substrings, so the terminating marker is located by
//! byte-sequence search over the whole buffer. Only the header sub-block of
//! each part (ASCII, terminated by a blank line) is parsed as text.

/// The single file part recovered from a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Name declared in the `filename` attribute of Content-Disposition.
    pub file_name: String,
    /// Part-level Content-Type, verbatim, if one was declared.
    pub content_type: Option<String>,
    /// Exact payload bytes.
    pub data: Vec<u8>,
}

/// Pulls the boundary token out of a Content-Type header value, stripping
/// trailing parameters and surrounding quotes.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("boundary=")?;

    let mut boundary = content_type[idx + "boundary=".len()..].trim();
    if let Some(semi) = boundary.find(';') {
        boundary = boundary[..semi].trim();
    }
    if let Some(stripped) = boundary
        .strip_prefix('"')
        .and_then(|b| b.strip_suffix('"'))
    {
        boundary = stripped;
    }

    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

/// Locates the first part carrying a `filename` attribute and returns its
/// declared name, declared content type, and exact payload bytes.
///
/// Returns `None` when the boundary never occurs, the body is truncated, or
/// no part declares a filename — callers treat all three as client errors.
pub fn extract_file_part(body: &[u8], boundary: &str) -> Option<FilePart> {
    let delimiter = format!("--{boundary}").into_bytes();
    // Payload terminator: CRLF followed by the next boundary line.
    let mut terminator = b"\r\n".to_vec();
    terminator.extend_from_slice(&delimiter);

    let mut pos = find_bytes(body, &delimiter, 0)?;
    loop {
        pos += delimiter.len();
        if body[pos..].starts_with(b"--") {
            // Closing boundary reached without a file part.
            return None;
        }
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }

        let headers_end = find_bytes(body, b"\r\n\r\n", pos)?;
        let headers = std::str::from_utf8(&body[pos..headers_end]).ok()?;
        let data_start = headers_end + 4;
        let data_end = find_bytes(body, &terminator, data_start)?;

        let (file_name, content_type) = parse_part_headers(headers);
        if let Some(file_name) = file_name {
            return Some(FilePart {
                file_name,
                content_type,
                data: body[data_start..data_end].to_vec(),
            });
        }

        // Not a file part; resume at the boundary that ended it.
        pos = data_end + 2;
    }
}

fn parse_part_headers(headers: &str) -> (Option<String>, Option<String>) {
    let mut file_name = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-disposition") {
            file_name = disposition_filename(value);
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    (file_name, content_type)
}

/// Reads the `filename` attribute from a Content-Disposition value.
fn disposition_filename(value: &str) -> Option<String> {
    for attr in value.split(';') {
        let Some((key, raw)) = attr.trim().split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("filename") {
            continue;
        }

        let mut raw = raw.trim();
        if let Some(stripped) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            raw = stripped;
        }
        return Some(raw.to_string());
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if needle.is_empty() || start > haystack.len() {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| start + i)
}
