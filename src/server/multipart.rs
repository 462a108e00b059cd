//! Just enough `multipart/form-data` decoding for a browser upload form.

use crate::error::Error;

#[derive(Debug)]
pub(crate) struct Part {
    pub(crate) name: String,
    /// As sent by the client, with any directory components removed.
    pub(crate) filename: Option<String>,
    pub(crate) data: Vec<u8>,
}

impl Part {
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Boundary parameter of a `multipart/form-data` content type.
pub(crate) fn boundary(content_type: &str) -> Option<String> {
    let mut params = split_params(content_type);
    let media = params.next()?;
    if !media.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()))
        .filter(|b| !b.is_empty())
}

fn malformed() -> Error {
    Error::Rejected("上傳資料格式錯誤".into())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Splits a form-data body into its parts.
pub(crate) fn parse(body: &[u8], boundary: &str) -> Result<Vec<Part>, Error> {
    let delimiter = format!("--{boundary}");
    let separator = format!("\r\n--{boundary}");

    let mut pos = find(body, delimiter.as_bytes(), 0).ok_or_else(malformed)? + delimiter.len();
    let mut parts = Vec::new();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        let line_end = find(body, b"\r\n", pos).ok_or_else(malformed)?;
        let headers_end = find(body, b"\r\n\r\n", line_end).ok_or_else(malformed)?;
        let data_start = headers_end + 4;
        let data_end = find(body, separator.as_bytes(), data_start).ok_or_else(malformed)?;

        let headers = String::from_utf8_lossy(&body[line_end..headers_end]);
        if let Some(part) = part_from_headers(&headers, body[data_start..data_end].to_vec()) {
            parts.push(part);
        }
        pos = data_end + separator.len();
    }
}

fn part_from_headers(headers: &str, data: Vec<u8>) -> Option<Part> {
    let disposition = headers.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-disposition")
            .then_some(value)
    })?;

    let mut name = None;
    let mut filename = None;
    let mut filename_ext = None;
    for param in split_params(disposition).skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(unquote(value.trim())),
            "filename" => filename = Some(unquote(value.trim())),
            "filename*" => filename_ext = decode_ext_value(value.trim()),
            _ => {}
        }
    }

    Some(Part {
        name: name?,
        filename: filename_ext.or(filename).map(|f| base_name(&f).to_string()),
        data,
    })
}

/// `;`-separated header parameters, ignoring separators inside quotes.
fn split_params(value: &str) -> impl Iterator<Item = &str> {
    let mut in_quotes = false;
    value
        .split(move |c: char| {
            if c == '"' {
                in_quotes = !in_quotes;
            }
            c == ';' && !in_quotes
        })
        .filter(|p| !p.trim().is_empty())
}

/// Browsers percent-encode quotes in names and send backslashes verbatim, so
/// there is no escape handling.
fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// RFC 5987 `charset'lang'pct-encoded` value; only UTF-8 is understood.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Last path component; some browsers send the full client-side path.
fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}
