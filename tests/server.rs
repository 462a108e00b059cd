#![cfg(feature = "server")]

mod common;

use common::*;
use docxide_format::HeadingScheme;
use docxide_format::server::{DOCX_MIME, MAX_UPLOAD_BYTES, Reply, handle};
use roxmltree::Document;
use tiny_http::Method;

const BOUNDARY: &str = "----docxideBoundary7MA4YWxk";

enum Field<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(fields: &[Field]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match field {
            Field::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
            Field::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {DOCX_MIME}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn post(fields: &[Field]) -> Reply {
    let _ = env_logger::try_init();
    let (content_type, body) = multipart(fields);
    handle(
        &Method::Post,
        "/upload",
        Some(&content_type),
        &body,
        HeadingScheme::Chinese,
    )
}

fn body_text(reply: &Reply) -> &str {
    std::str::from_utf8(&reply.body).unwrap()
}

#[test]
fn index_serves_upload_form() {
    let reply = handle(&Method::Get, "/", None, &[], HeadingScheme::Chinese);
    assert_eq!(reply.status, 200);
    assert!(reply.header("content-type").unwrap().starts_with("text/html"));
    let html = body_text(&reply);
    assert!(html.contains(r#"action="/upload""#));
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    assert!(html.contains(r#"name="file""#));
    assert!(html.contains(r#"name="title""#));
}

#[test]
fn unknown_paths_and_methods() {
    let reply = handle(&Method::Get, "/favicon.ico", None, &[], HeadingScheme::Chinese);
    assert_eq!(reply.status, 404);
    let reply = handle(&Method::Get, "/upload", None, &[], HeadingScheme::Chinese);
    assert_eq!(reply.status, 405);
}

#[test]
fn upload_without_form_data_is_rejected() {
    let reply = handle(&Method::Post, "/upload", None, b"", HeadingScheme::Chinese);
    assert_eq!(reply.status, 400);
    assert_eq!(body_text(&reply), "沒有上傳檔案");
}

#[test]
fn upload_without_file_field_is_rejected() {
    let reply = post(&[Field::Text("title", "標題")]);
    assert_eq!(reply.status, 400);
    assert_eq!(body_text(&reply), "沒有上傳檔案");
}

#[test]
fn upload_with_empty_filename_is_rejected() {
    let reply = post(&[Field::File("file", "", b"")]);
    assert_eq!(reply.status, 400);
    assert_eq!(body_text(&reply), "未選擇檔案");
}

#[test]
fn upload_with_wrong_extension_is_rejected() {
    let docx = Manuscript::paragraphs(&["內文。"]).build();
    let reply = post(&[Field::File("file", "paper.doc", &docx)]);
    assert_eq!(reply.status, 400);
    assert_eq!(body_text(&reply), "請上傳 .docx 格式的 Word 檔案");
}

#[test]
fn corrupt_document_is_client_error() {
    let reply = post(&[Field::File("file", "paper.docx", b"not a zip at all")]);
    assert_eq!(reply.status, 400);
    assert!(body_text(&reply).contains("invalid DOCX"));
}

#[test]
fn document_without_section_is_server_error() {
    let docx = Manuscript::paragraphs(&["內文。"]).section(None).build();
    let reply = post(&[Field::File("file", "paper.docx", &docx)]);
    assert_eq!(reply.status, 500);
}

#[test]
fn oversized_upload_is_refused() {
    let body = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    let reply = handle(
        &Method::Post,
        "/upload",
        Some(&content_type),
        &body,
        HeadingScheme::Chinese,
    );
    assert_eq!(reply.status, 413);
}

#[test]
fn upload_returns_formatted_attachment() {
    let docx = Manuscript::paragraphs(&["前言", "圖三 實驗裝置"]).build();
    let reply = post(&[
        Field::Text("title", "水質研究"),
        Field::File("file", "paper.docx", &docx),
    ]);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("Content-Type"), Some(DOCX_MIME));

    let disposition = reply.header("Content-Disposition").unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''%E5%B7%B2%E6%8E%92%E7%89%88_paper.docx"));
    assert!(disposition.is_ascii());

    let xml = entry_text(&reply.body, "word/document.xml");
    let doc = Document::parse(&xml).unwrap();
    let texts: Vec<String> = body_paragraphs(&doc).into_iter().map(text).collect();
    assert_eq!(texts, ["壹、前言", "圖1 實驗裝置"]);

    let header = entry_text(&reply.body, "word/header1.xml");
    assert!(header.contains("水質研究"));
}

#[test]
fn upload_without_title_uses_default() {
    let docx = Manuscript::paragraphs(&["內文。"]).build();
    let reply = post(&[Field::File("file", "C:\\fakepath\\報告.docx", &docx)]);
    assert_eq!(reply.status, 200);

    let disposition = reply.header("Content-Disposition").unwrap();
    assert!(disposition.contains("%E5%A0%B1%E5%91%8A.docx"));
    assert!(!disposition.contains("fakepath"));

    let header = entry_text(&reply.body, "word/header1.xml");
    assert!(header.contains("小論文"));
}
