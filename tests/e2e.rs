//! End-to-end integration tests for pdf2docx.
//!
//! Every test builds its PDFs in memory with `lopdf`, so the suite needs no
//! fixture files, network or native libraries. Conversions that must touch
//! the disk run against a fresh `TempDir` injected as the scratch location,
//! which lets each test assert that nothing is left behind.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf2docx::pipeline::docx::read_docx_text;
use pdf2docx::server::{router, AppState};
use pdf2docx::{
    convert_bytes, convert_to_file, inspect, ConversionConfig, ConvertError, Converter,
    DocumentMetadata, ErrorKind, ExtractedDocument, LopdfExtractor, OoxmlGenerator,
    PageSelection, ParagraphMode, PdfSource, ServerConfig, TextExtractor, DOCX_MIME,
};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Build a PDF with one page per entry and one text line per inner entry.
fn build_pdf(pages: &[&[&str]], title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(t) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(t),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn hello_pdf() -> Vec<u8> {
    build_pdf(&[&["Hello World"]], None)
}

/// lopdf reading from a path, so every conversion goes through a scratch file.
struct FileBackedLopdf;

impl TextExtractor for FileBackedLopdf {
    fn name(&self) -> &str {
        "lopdf-file"
    }

    fn requires_file(&self) -> bool {
        true
    }

    fn extract(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
        pages: &PageSelection,
    ) -> Result<ExtractedDocument, ConvertError> {
        assert!(matches!(source, PdfSource::File(_)), "expected a staged file");
        LopdfExtractor::new().extract(source, password, pages)
    }

    fn inspect(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, ConvertError> {
        LopdfExtractor::new().inspect(source, password)
    }
}

fn staging_converter(dir: &Path) -> Converter {
    let config = ConversionConfig::builder().temp_dir(dir).build().unwrap();
    Converter::with_collaborators(config, Arc::new(FileBackedLopdf), Arc::new(OoxmlGenerator))
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn zip_part(docx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut s = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut s).unwrap();
    s
}

// ── Library: conversion ──────────────────────────────────────────────────────

#[test]
fn test_hello_world_converts() {
    let out = convert_bytes(&hello_pdf(), "hello.pdf", &ConversionConfig::default()).unwrap();
    assert_eq!(read_docx_text(&out.docx).unwrap(), "Hello World");
    assert_eq!(out.text, "Hello World");
    assert_eq!(out.filename, "hello.docx");
    assert_eq!(out.stats.total_pages, 1);
    assert_eq!(out.stats.output_bytes, out.docx.len());
    assert!(out.docx.starts_with(b"PK"));
}

#[test]
fn test_empty_input_is_invalid() {
    let err = convert_bytes(b"", "empty.pdf", &ConversionConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_staged_conversion_leaves_temp_dir_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let converter = staging_converter(tmp.path());
    let out = converter.convert(&hello_pdf(), "hello.pdf").unwrap();
    assert!(out.stats.staged_to_disk);
    assert_eq!(read_docx_text(&out.docx).unwrap(), "Hello World");
    assert_eq!(entries(tmp.path()), 0);
}

#[test]
fn test_invalid_inputs_leave_temp_dir_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let converter = staging_converter(tmp.path());
    let cases: [&[u8]; 3] = [
        b"",
        b"just some text, definitely not a pdf",
        b"%PDF-1.4\nthe header is a lie",
    ];
    for bytes in cases {
        let err = converter.convert(bytes, "input.pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{err}");
        assert_eq!(entries(tmp.path()), 0);
    }
}

#[test]
fn test_conversion_is_idempotent() {
    let pdf = build_pdf(&[&["Alpha", "Beta"], &["Gamma"]], Some("Greek"));
    let config = ConversionConfig::default();
    let a = convert_bytes(&pdf, "greek.pdf", &config).unwrap();
    let b = convert_bytes(&pdf, "greek.pdf", &config).unwrap();
    assert_eq!(
        read_docx_text(&a.docx).unwrap(),
        read_docx_text(&b.docx).unwrap()
    );
    assert_eq!(
        zip_part(&a.docx, "docProps/core.xml"),
        zip_part(&b.docx, "docProps/core.xml")
    );
    assert_eq!(a.text, b.text);
}

#[test]
fn test_lines_sharing_one_text_object_stay_separate() {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal("Alpha")]),
            Operation::new("Td", vec![0.into(), (-16).into()]),
            Operation::new("Tj", vec![Object::string_literal("Beta")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut pdf = Vec::new();
    doc.save_to(&mut pdf).unwrap();

    for mode in [ParagraphMode::Lines, ParagraphMode::Blocks] {
        let config = ConversionConfig::builder().paragraph_mode(mode).build().unwrap();
        let out = convert_bytes(&pdf, "lines.pdf", &config).unwrap();
        assert_eq!(out.text, "Alpha\nBeta", "{mode:?}");
        assert_eq!(read_docx_text(&out.docx).unwrap(), "Alpha\nBeta");
        assert_eq!(out.stats.paragraphs, 2);
    }
}

/// Standard security handler (RC4, revision 2) whose O/U entries match no
/// password at all.
fn encrypted_pdf() -> Vec<u8> {
    let mut doc = Document::load_mem(&hello_pdf()).unwrap();
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0x11u8; 32]),
        "U" => Object::string_literal(vec![0x22u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![0xABu8; 16]),
            Object::string_literal(vec![0xABu8; 16]),
        ],
    );
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn test_locked_pdf_needs_the_right_password() {
    let pdf = encrypted_pdf();

    let err = convert_bytes(&pdf, "locked.pdf", &ConversionConfig::default()).unwrap_err();
    assert!(matches!(err, ConvertError::PasswordRequired), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::UnsupportedInput);

    let config = ConversionConfig::builder().password("wrong").build().unwrap();
    let err = convert_bytes(&pdf, "locked.pdf", &config).unwrap_err();
    assert!(matches!(err, ConvertError::WrongPassword), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::UnsupportedInput);
}

#[tokio::test]
async fn test_concurrent_conversions_are_isolated() {
    let tmp = tempfile::tempdir().unwrap();
    let converter = staging_converter(tmp.path());
    let first = build_pdf(&[&["first document"]], None);
    let second = build_pdf(&[&["second document"]], None);

    let (a, b) = tokio::join!(
        converter.convert_async(first, "a.pdf".into()),
        converter.convert_async(second, "b.pdf".into()),
    );

    assert_eq!(a.unwrap().text, "first document");
    assert_eq!(b.unwrap().text, "second document");
    assert_eq!(entries(tmp.path()), 0);
}

#[test]
fn test_pages_are_separated_by_page_breaks() {
    let pdf = build_pdf(&[&["Page one"], &["Page two"]], None);
    let out = convert_bytes(&pdf, "two.pdf", &ConversionConfig::default()).unwrap();
    assert_eq!(out.stats.converted_pages, 2);
    assert_eq!(read_docx_text(&out.docx).unwrap(), "Page one\nPage two");
    let xml = zip_part(&out.docx, "word/document.xml");
    assert_eq!(xml.matches(r#"w:type="page""#).count(), 1);
}

#[test]
fn test_page_selection() {
    let pdf = build_pdf(&[&["one"], &["two"], &["three"]], None);
    let config = ConversionConfig::builder()
        .pages(PageSelection::Range(2, 3))
        .build()
        .unwrap();
    let out = convert_bytes(&pdf, "three.pdf", &config).unwrap();
    assert_eq!(out.text, "two\nthree");
    assert_eq!(out.stats.total_pages, 3);
    assert_eq!(out.stats.converted_pages, 2);

    let config = ConversionConfig::builder()
        .pages(PageSelection::Single(9))
        .build()
        .unwrap();
    let err = convert_bytes(&pdf, "three.pdf", &config).unwrap_err();
    assert!(matches!(err, ConvertError::PageOutOfRange { page: 9, total: 3 }));
}

#[test]
fn test_textless_pdf_gets_placeholder() {
    let pdf = build_pdf(&[&[]], None);
    let out = convert_bytes(&pdf, "blank.pdf", &ConversionConfig::default()).unwrap();
    assert_eq!(read_docx_text(&out.docx).unwrap(), "No text detected");

    let strict = ConversionConfig::builder()
        .empty_text_placeholder(None)
        .build()
        .unwrap();
    let err = convert_bytes(&pdf, "blank.pdf", &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
}

#[test]
fn test_title_lands_in_core_properties() {
    let pdf = build_pdf(&[&["body"]], Some("Annual Report"));
    let out = convert_bytes(&pdf, "scan 01.pdf", &ConversionConfig::default()).unwrap();
    assert_eq!(out.metadata.title.as_deref(), Some("Annual Report"));
    assert_eq!(out.filename, "scan_01.docx");
    let core = zip_part(&out.docx, "docProps/core.xml");
    assert!(core.contains("<dc:title>Annual Report</dc:title>"), "{core}");
}

#[tokio::test]
async fn test_convert_to_file_and_inspect() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("report.pdf");
    std::fs::write(&input, build_pdf(&[&["from disk"]], Some("On Disk"))).unwrap();
    let output = tmp.path().join("out/report.docx");

    let stats = convert_to_file(input.to_str().unwrap(), &output, &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(stats.converted_pages, 1);
    let docx = std::fs::read(&output).unwrap();
    assert_eq!(read_docx_text(&docx).unwrap(), "from disk");
    assert!(!output.with_extension("docx.tmp").exists());

    let meta = inspect(input.to_str().unwrap()).await.unwrap();
    assert_eq!(meta.title.as_deref(), Some("On Disk"));
    assert_eq!(meta.page_count, 1);
}

#[tokio::test]
async fn test_missing_input_file() {
    let err = inspect("/definitely/not/here.pdf").await.unwrap_err();
    assert!(matches!(err, ConvertError::FileNotFound { .. }));
}

// ── HTTP ─────────────────────────────────────────────────────────────────────

const BOUNDARY: &str = "pdf2docx-test-boundary";

/// Multipart body from (field name, filename, bytes) parts.
fn multipart_body(parts: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app(dir: &Path) -> axum::Router {
    router(AppState::new(staging_converter(dir), ServerConfig::default()))
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn error_kind(resp: axum::response::Response) -> String {
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(json["error"].is_string());
    json["kind"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_http_upload_returns_docx_attachment() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(upload_request(&[("file", "Hello.pdf", hello_pdf())]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], DOCX_MIME);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Hello.docx\""
    );
    let docx = body_bytes(resp).await;
    assert_eq!(read_docx_text(&docx).unwrap(), "Hello World");
    assert_eq!(entries(tmp.path()), 0);
}

#[tokio::test]
async fn test_http_missing_file_field() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(upload_request(&[("document", "x.pdf", b"%PDF-1.4".to_vec())]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(resp).await, "invalid_input");
}

#[tokio::test]
async fn test_http_non_pdf_filename() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(upload_request(&[("file", "notes.txt", b"hello".to_vec())]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(error_kind(resp).await, "unsupported_input");
}

#[tokio::test]
async fn test_http_garbage_pdf() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(upload_request(&[("file", "broken.pdf", b"%PDF-1.7 nothing else".to_vec())]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(resp).await, "invalid_input");
    assert_eq!(entries(tmp.path()), 0);
}

#[tokio::test]
async fn test_http_upload_over_limit_is_413() {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        max_upload_bytes: 64,
        ..ServerConfig::default()
    };
    let app = router(AppState::new(staging_converter(tmp.path()), config));
    let pdf = hello_pdf();
    assert!(pdf.len() > 64);

    let resp = app
        .oneshot(upload_request(&[("file", "big.pdf", pdf)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_kind(resp).await, "unsupported_input");
    assert_eq!(entries(tmp.path()), 0);
}

#[tokio::test]
async fn test_http_two_files_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(upload_request(&[
            ("file", "a.pdf", hello_pdf()),
            ("file", "b.pdf", hello_pdf()),
        ]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(error_kind(resp).await, "unsupported_input");
}

#[tokio::test]
async fn test_http_health() {
    let tmp = tempfile::tempdir().unwrap();
    let resp = app(tmp.path())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "pdf2docx");
}
