//! 集成测试共用的书籍构造工具

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 在内存中构造ZIP归档
pub fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, FileOptions::<()>::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn container_xml(package_path: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="{}" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#,
        package_path
    )
}

/// 构造EPUB：mimetype未压缩且位于第一位，包文档位于 `OEBPS/content.opf`
pub fn build_epub(manifest: &str, spine: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
    <metadata>
        <dc:title>集成测试书籍</dc:title>
        <dc:creator>测试作者</dc:creator>
        <dc:language>zh-CN</dc:language>
    </metadata>
    <manifest>{}</manifest>
    <spine toc="ncx">{}</spine>
</package>"#,
        manifest, spine
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    let container = container_xml("OEBPS/content.opf");
    let mut entries = vec![("META-INF/container.xml", container.as_str()), ("OEBPS/content.opf", opf.as_str())];
    entries.extend_from_slice(files);
    for (name, content) in entries {
        zip.start_file(name, FileOptions::<()>::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// 构造包含 `count` 个章节的EPUB
pub fn build_epub_with_chapters(count: usize) -> Vec<u8> {
    let mut manifest = String::new();
    let mut spine = String::new();
    let mut files = Vec::new();
    for i in 1..=count {
        manifest.push_str(&format!(
            r#"<item id="ch{i}" href="Text/ch{i}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
        files.push((format!("OEBPS/Text/ch{i}.xhtml"), format!("<h2>第{i}章</h2><p>正文 {i}</p>")));
    }
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();
    build_epub(&manifest, &spine, &refs)
}

/// 构造一个只有一个record的MOBI头（PDB头 + record 0）
///
/// record 0位于偏移86，加密类型字段位于其后12字节处。
pub fn mobi_header(encryption: u16) -> Vec<u8> {
    let record0 = 86usize;
    let mut buffer = vec![0u8; record0 + 32];
    buffer[..9].copy_from_slice(b"Test_Book");
    buffer[60..68].copy_from_slice(b"BOOKMOBI");
    buffer[76..78].copy_from_slice(&1u16.to_be_bytes());
    buffer[78..82].copy_from_slice(&(record0 as u32).to_be_bytes());
    buffer[record0 + 12..record0 + 14].copy_from_slice(&encryption.to_be_bytes());
    buffer[record0 + 16..record0 + 20].copy_from_slice(b"MOBI");
    buffer
}

/// MOBI头后接任意载荷
pub fn mobi_with_payload(encryption: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = mobi_header(encryption);
    buffer.extend_from_slice(payload);
    buffer
}
