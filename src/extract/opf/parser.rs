//! 包文档解析模块
//!
//! 定位并解析OPF包文档，生成有序的清单与脊柱模型。

use crate::extract::archive::ArchiveHandle;
use crate::extract::container::{CONTAINER_PATH, Container};
use crate::extract::error::{ExtractError, Result};
use crate::extract::opf::manifest::{ManifestItem, SpineRef, parent_dir, resolve_href};
use crate::extract::opf::xml::XmlNode;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 包文档解析结果
#[derive(Debug, Clone)]
pub struct PackageModel {
    /// 包文档在归档中的路径
    pub package_path: String,
    /// 包文档所在目录，href相对于此目录解析
    pub base_dir: String,
    /// EPUB版本
    pub version: String,
    /// 原始 `<metadata>` 元素
    pub metadata: Option<XmlNode>,
    /// 清单项，保持文档顺序
    manifest: Vec<ManifestItem>,
    /// id到清单下标的映射
    index: HashMap<String, usize>,
    /// 已解析的脊柱（只包含能在清单中找到的引用）
    spine: Vec<SpineRef>,
}

impl PackageModel {
    /// 解析包文档内容
    ///
    /// # 参数
    /// * `package_path` - 包文档在归档中的路径
    /// * `xml_content` - 包文档的XML内容
    pub fn parse(package_path: &str, xml_content: &str) -> Result<PackageModel> {
        let root = XmlNode::parse(xml_content)?;
        if !root.is("package") {
            return Err(ExtractError::ContainerParse(format!(
                "{} is not a package document (root element <{}>)",
                package_path, root.name
            )));
        }

        let mut model = PackageModel {
            package_path: package_path.to_string(),
            base_dir: parent_dir(package_path).to_string(),
            version: root.attribute("version").unwrap_or_default().to_string(),
            metadata: root.child("metadata").cloned(),
            manifest: Vec::new(),
            index: HashMap::new(),
            spine: Vec::new(),
        };

        if let Some(manifest) = root.child("manifest") {
            for node in manifest.children_named("item") {
                model.insert_item(node);
            }
        }

        if let Some(spine) = root.child("spine") {
            for node in spine.children_named("itemref") {
                let Some(idref) = node.attribute("idref").map(str::trim).filter(|s| !s.is_empty()) else {
                    continue;
                };
                if !model.index.contains_key(idref) {
                    debug!(idref, "skipping unresolved spine reference");
                    continue;
                }
                model.spine.push(SpineRef {
                    idref: idref.to_string(),
                    linear: node.attribute("linear").is_none_or(|v| v.trim() != "no"),
                });
            }
        }

        Ok(model)
    }

    /// 解析单个清单项，缺少id或href的项被丢弃
    fn insert_item(&mut self, node: &XmlNode) {
        let id = node.attribute("id").map(str::trim).unwrap_or_default();
        let href = node.attribute("href").map(str::trim).unwrap_or_default();
        if id.is_empty() || href.is_empty() {
            debug!(id, href, "discarding manifest item without id or href");
            return;
        }

        let item = ManifestItem {
            id: id.to_string(),
            href: href.to_string(),
            media_type: node.attribute("media-type").unwrap_or_default().trim().to_string(),
            properties: node
                .attribute("properties")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        };

        // 重复的id：后出现的项替换前一项，位置不变
        match self.index.get(id) {
            Some(&position) => self.manifest[position] = item,
            None => {
                self.index.insert(item.id.clone(), self.manifest.len());
                self.manifest.push(item);
            }
        }
    }

    /// 所有清单项（文档顺序）
    pub fn manifest(&self) -> &[ManifestItem] {
        &self.manifest
    }

    /// 根据ID获取清单项
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&position| &self.manifest[position])
    }

    /// 已解析的脊柱引用
    pub fn spine(&self) -> &[SpineRef] {
        &self.spine
    }

    /// 按阅读顺序返回脊柱对应的清单项
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine.iter().filter_map(|spine_ref| self.item(&spine_ref.idref))
    }

    /// 清单中的样式表（文档顺序）
    pub fn stylesheets(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest.iter().filter(|item| item.is_css())
    }

    /// 清单项在归档中的路径
    pub fn archive_path(&self, item: &ManifestItem) -> String {
        resolve_href(&self.base_dir, &item.href)
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }
}

/// 定位并解析归档中的包文档
///
/// 1. 读取 `META-INF/container.xml` 的第一个rootfile；
/// 2. 对内嵌在MOBI包装中的归档，container.xml不可用时按字典序尝试每个 `*.opf`，
///    直到得到非空清单。
///
/// # 返回值
/// * 找不到可用的包文档时返回 `NoManifest`
pub fn resolve_manifest(archive: &mut ArchiveHandle<'_>) -> Result<PackageModel> {
    match package_from_container(archive) {
        Ok(model) => return Ok(model),
        Err(e) if archive.is_embedded() => {
            debug!("container lookup failed in embedded archive, scanning for .opf: {}", e);
        }
        Err(e) => {
            warn!("cannot locate package document: {}", e);
            return Err(ExtractError::NoManifest);
        }
    }

    let mut candidates = archive.find_by_extension("opf");
    candidates.sort();

    for path in candidates {
        let model = archive
            .read_text(&path)
            .and_then(|content| PackageModel::parse(&path, &content));
        match model {
            Ok(model) if !model.is_empty() => {
                debug!(path = %path, "using package document found by scan");
                return Ok(model);
            }
            Ok(_) => debug!(path = %path, "package document has an empty manifest"),
            Err(e) => debug!(path = %path, "package document unusable: {}", e),
        }
    }

    Err(ExtractError::NoManifest)
}

fn package_from_container(archive: &mut ArchiveHandle<'_>) -> Result<PackageModel> {
    if !archive.contains(CONTAINER_PATH) {
        return Err(ExtractError::ContainerParse(format!("{} not found", CONTAINER_PATH)));
    }

    let container = Container::parse_xml(&archive.read_text(CONTAINER_PATH)?)?;
    let package_path = container
        .package_path()
        .map(|path| resolve_href("", path))
        .ok_or_else(|| ExtractError::ContainerParse("no rootfile".to_string()))?;

    let content = archive.read_text(&package_path)?;
    let model = PackageModel::parse(&package_path, &content)?;
    debug!(
        path = %package_path,
        items = model.manifest.len(),
        spine = model.spine.len(),
        "parsed package document"
    );
    Ok(model)
}
