//! OPF（Open Packaging Format）包文档模块
//!
//! 提供XML树与属性探测、清单与脊柱模型、元数据读取以及包文档定位。

pub mod xml;
pub mod manifest;
pub mod metadata;
pub mod parser;

pub use xml::{AttrForm, XmlNode, get_attribute};
pub use manifest::{ManifestItem, SpineRef, resolve_href};
pub use metadata::BookMetadata;
pub use parser::{PackageModel, resolve_manifest};
