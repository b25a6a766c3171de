pub mod error;
pub mod config;
pub mod sniff;
pub mod drm;
pub mod archive;
pub mod container;
pub mod opf;
pub mod sanitize;
pub mod text;
pub mod assemble;
pub mod docx;
pub mod api;
pub mod pipeline;

// 重新导出错误处理
pub use error::{ErrorKind, ExtractError, Result};

// 重新导出配置
pub use config::{ExtractionConfig, ExtractionLimits, MetadataTagConfig, MetadataTagConfigs, TextHeuristics};

// 重新导出各阶段组件
pub use sniff::{FormatTag, SourceBuffer, classify, find_embedded_zip_offset};
pub use drm::is_encrypted;
pub use archive::{ArchiveHandle, ArchiveOrigin};
pub use container::{Container, RootFile};
pub use opf::{BookMetadata, ManifestItem, PackageModel, SpineRef, XmlNode, get_attribute, resolve_manifest};
pub use sanitize::{markup_to_text, sanitize_embedded_content, sanitize_markup, sanitize_plain_text};
pub use text::{extract_readable_text, is_meaningful_text};
pub use assemble::{BookViewData, SpineEntry, assemble};
pub use docx::{DocumentConverter, DocxHtmlConverter};

// 重新导出入口
pub use api::{BookResponse, ExtractionRequest, Preview, PreviewResponse};
pub use pipeline::{Extraction, Pipeline, Strategy, extract_book, extract_preview};

/// 单元测试共用的归档构造工具
#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// 在内存中构造ZIP归档，条目按给定顺序写入
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

    /// 构造一个最小EPUB：未压缩的mimetype、container.xml与 `OEBPS/content.opf`
    ///
    /// # 参数
    /// * `manifest` - `<manifest>` 的内部XML
    /// * `spine` - `<spine>` 的内部XML
    /// * `files` - 其余条目
    pub fn build_epub(manifest: &str, spine: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let opf = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
    <metadata><dc:title>Test Book</dc:title><dc:creator>Test Author</dc:creator></metadata>
    <manifest>{}</manifest>
    <spine>{}</spine>
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
}
