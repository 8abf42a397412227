// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use nebula_orchestrator::config::{DocumentLimits, ALLOWED_EXTENSIONS};
use nebula_orchestrator::errors::IngestionError;
use nebula_orchestrator::rag::extract::{admit, extract_document, list_documents};
use std::fs;
use tempfile::TempDir;

fn limits(max_bytes: u64) -> DocumentLimits {
    DocumentLimits {
        max_document_bytes: max_bytes,
        allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    }
}

#[test]
fn test_extract_text_and_markdown() {
    let dir = TempDir::new().unwrap();
    let txt = dir.path().join("notes.txt");
    let md = dir.path().join("README.MD");
    fs::write(&txt, "plain text body").unwrap();
    fs::write(&md, "# Title\n\nmarkdown body").unwrap();

    let doc = extract_document(&txt, &limits(1024)).unwrap();
    assert_eq!(doc.source, "notes.txt");
    assert_eq!(doc.text, "plain text body");
    assert_eq!(doc.content_sha256.len(), 64);

    let doc = extract_document(&md, &limits(1024)).unwrap();
    assert!(doc.text.contains("markdown body"));
}

#[test]
fn test_same_bytes_same_digest() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "identical").unwrap();
    fs::write(&b, "identical").unwrap();

    let da = extract_document(&a, &limits(1024)).unwrap();
    let db = extract_document(&b, &limits(1024)).unwrap();
    assert_eq!(da.content_sha256, db.content_sha256);
}

#[test]
fn test_unsupported_type_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("slides.docx");
    fs::write(&path, "not allowed").unwrap();

    let err = admit(&path, &limits(1024)).unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedType { ref extension, .. } if extension == "docx"));
}

#[test]
fn test_oversized_document_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.txt");
    fs::write(&path, vec![b'a'; 2048]).unwrap();

    let err = extract_document(&path, &limits(1024)).unwrap_err();
    assert!(matches!(
        err,
        IngestionError::TooLarge {
            size_bytes: 2048,
            limit_bytes: 1024,
            ..
        }
    ));
}

#[test]
fn test_whitespace_only_document_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blank.txt");
    fs::write(&path, "  \n\t ").unwrap();

    let err = extract_document(&path, &limits(1024)).unwrap_err();
    assert!(matches!(err, IngestionError::EmptyText { .. }));
}

#[test]
fn test_malformed_pdf_is_unparsable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

    let err = extract_document(&path, &limits(1024)).unwrap_err();
    assert!(matches!(
        err,
        IngestionError::Unparsable { .. } | IngestionError::EmptyText { .. }
    ));
}

#[test]
fn test_missing_file_is_unreadable() {
    let dir = TempDir::new().unwrap();
    let err = admit(&dir.path().join("gone.txt"), &limits(1024)).unwrap_err();
    assert!(matches!(err, IngestionError::Unreadable { .. }));
}

#[test]
fn test_list_documents_filters_and_sorts() {
    let dir = TempDir::new().unwrap();
    for name in ["b.txt", "a.pdf", "c.md", "image.png", "notes"] {
        fs::write(dir.path().join(name), "x").unwrap();
    }
    fs::create_dir(dir.path().join("nested.txt")).unwrap();

    let names: Vec<String> = list_documents(dir.path(), &limits(1024))
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.txt", "c.md"]);
}

#[test]
fn test_list_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let paths = list_documents(&dir.path().join("absent"), &limits(1024)).unwrap();
    assert!(paths.is_empty());
}
