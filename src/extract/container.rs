use crate::extract::error::{ExtractError, Result};
use crate::extract::opf::xml::XmlNode;

/// container.xml 在归档中的固定路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// 缺少 `full-path` 的rootfile会被忽略；一个都没有时返回错误。
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let root = XmlNode::parse(xml_content)?;

        let rootfiles: Vec<RootFile> = root
            .children_named("rootfiles")
            .flat_map(|rootfiles| rootfiles.children_named("rootfile"))
            .filter_map(|node| {
                let full_path = node.attribute("full-path")?.trim();
                if full_path.is_empty() {
                    return None;
                }
                Some(RootFile {
                    full_path: full_path.to_string(),
                    media_type: node.attribute("media-type").unwrap_or_default().to_string(),
                })
            })
            .collect();

        if rootfiles.is_empty() {
            return Err(ExtractError::ContainerParse(
                "container.xml has no rootfile entry".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 获取包文档路径：第一个rootfile
    pub fn package_path(&self) -> Option<&str> {
        self.rootfiles.first().map(|rf| rf.full_path.as_str())
    }
}
