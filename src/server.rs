//! Upload service: a form at `/` and `POST /upload`, which answers with the
//! formatted manuscript as a download.
//!
//! Requests are served one at a time on the calling thread. Every request
//! formats its own copy of the document; nothing is shared between requests.

mod multipart;

use std::io::{self, Read};
use std::net::SocketAddr;

use tiny_http::{Header, Method, Request, Response, Server};

use crate::error::Error;
use crate::{DEFAULT_TITLE, FormatOptions, HeadingScheme, format_docx_bytes, processed_file_name};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Uploads above this size are refused with 413.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
<meta charset="utf-8">
<title>小論文自動排版</title>
<style>
body { font-family: sans-serif; max-width: 32rem; margin: 3rem auto; }
label { display: block; margin-top: 1rem; }
input[type=text] { width: 100%; }
button { margin-top: 1.5rem; }
</style>
</head>
<body>
<h1>小論文自動排版</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
<label>小論文標題（頁首）<input type="text" name="title" value="小論文"></label>
<label>Word 檔案（.docx）<input type="file" name="file" accept=".docx"></label>
<button type="submit">上傳並排版</button>
</form>
</body>
</html>
"#;

/// An HTTP response, independent of the transport.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), content_type.into())],
            body,
        }
    }

    fn text(status: u16, message: &str) -> Self {
        Self::new(status, "text/plain; charset=utf-8", message.as_bytes().to_vec())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Routes one request.
pub fn handle(
    method: &Method,
    url: &str,
    content_type: Option<&str>,
    body: &[u8],
    scheme: HeadingScheme,
) -> Reply {
    let path = url.split_once('?').map_or(url, |(p, _)| p);
    match (method, path) {
        (Method::Get, "/") => Reply::new(200, "text/html; charset=utf-8", UPLOAD_FORM.into()),
        (Method::Post, "/upload") => handle_upload(content_type, body, scheme),
        (_, "/" | "/upload") => Reply::text(405, "Method Not Allowed"),
        _ => Reply::text(404, "Not Found"),
    }
}

fn handle_upload(content_type: Option<&str>, body: &[u8], scheme: HeadingScheme) -> Reply {
    if body.len() > MAX_UPLOAD_BYTES {
        return Reply::text(413, "檔案過大");
    }
    match upload(content_type, body, scheme) {
        Ok(reply) => reply,
        Err(Error::Rejected(message)) => Reply::text(400, &message),
        Err(e @ (Error::InvalidDocx(_) | Error::Zip(_) | Error::Xml(_))) => {
            log::warn!("Unreadable upload: {e}");
            Reply::text(400, &e.to_string())
        }
        Err(e) => {
            log::error!("Formatting failed: {e}");
            Reply::text(500, &e.to_string())
        }
    }
}

fn upload(content_type: Option<&str>, body: &[u8], scheme: HeadingScheme) -> Result<Reply, Error> {
    let no_file = || Error::Rejected("沒有上傳檔案".into());

    let boundary = content_type.and_then(multipart::boundary).ok_or_else(no_file)?;
    let parts = multipart::parse(body, &boundary)?;

    let file = parts.iter().find(|p| p.name == "file").ok_or_else(no_file)?;
    let title = parts
        .iter()
        .find(|p| p.name == "title")
        .map_or_else(|| DEFAULT_TITLE.to_string(), |p| p.text());

    let filename = file.filename.as_deref().unwrap_or_default();
    if filename.is_empty() {
        return Err(Error::Rejected("未選擇檔案".into()));
    }
    if !filename.ends_with(".docx") {
        return Err(Error::Rejected("請上傳 .docx 格式的 Word 檔案".into()));
    }

    log::info!("Formatting upload {filename} ({} bytes)", file.data.len());
    let options = FormatOptions { title, scheme };
    let formatted = format_docx_bytes(&file.data, &options)?;

    let mut reply = Reply::new(200, DOCX_MIME, formatted.bytes);
    reply.headers.push((
        "Content-Disposition".into(),
        attachment(&processed_file_name(filename)),
    ));
    Ok(reply)
}

/// `attachment` disposition with an ASCII fallback and the exact name as an
/// RFC 5987 `filename*`.
fn attachment(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\\'))
        .collect();
    let fallback = if fallback.trim_start_matches(['_', '.', ' ']).is_empty()
        || fallback.starts_with('.')
    {
        format!("formatted{fallback}")
    } else {
        fallback
    };

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn header_value<'r>(request: &'r Request, name: &'static str) -> Option<&'r str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str())
}

pub struct UploadServer {
    server: Server,
    scheme: HeadingScheme,
}

impl UploadServer {
    pub fn bind(addr: &str, scheme: HeadingScheme) -> Result<Self, Error> {
        let server = Server::http(addr).map_err(|e| Error::Io(io::Error::other(e.to_string())))?;
        Ok(Self { server, scheme })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serves requests until the listener fails.
    pub fn run(&self) -> Result<(), Error> {
        if let Some(addr) = self.local_addr() {
            log::info!("Listening on http://{addr}");
        }
        loop {
            let request = self.server.recv()?;
            self.respond(request);
        }
    }

    fn respond(&self, mut request: Request) {
        let mut body = Vec::new();
        let read = request
            .as_reader()
            .take(MAX_UPLOAD_BYTES as u64 + 1)
            .read_to_end(&mut body);

        let reply = match read {
            Ok(_) => handle(
                request.method(),
                request.url(),
                header_value(&request, "Content-Type"),
                &body,
                self.scheme,
            ),
            Err(e) => {
                log::warn!("Failed to read request body: {e}");
                Reply::text(400, "上傳資料讀取失敗")
            }
        };
        log::info!("{} {} -> {}", request.method(), request.url(), reply.status);

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        for (name, value) in &reply.headers {
            match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                Ok(header) => response.add_header(header),
                Err(()) => log::warn!("Dropping invalid response header {name}"),
            }
        }
        if let Err(e) = request.respond(response) {
            log::warn!("Failed to send response: {e}");
        }
    }
}
