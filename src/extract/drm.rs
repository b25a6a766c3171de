//! MOBI系列文件的DRM检测
//!
//! 只读取PDB头与record 0的固定偏移字段。任何截断或格式不符的输入都判定为未加密。

use tracing::debug;

/// PDB头中record数量字段的偏移
const RECORD_COUNT_OFFSET: usize = 76;
/// record信息表的起始偏移，每项8字节
const RECORD_TABLE_OFFSET: usize = 78;
const RECORD_INFO_LEN: usize = 8;
/// record 0 中MOBI签名相对record起点的偏移
const MOBI_SIGNATURE_OFFSET: usize = 16;
const MOBI_SIGNATURE: &[u8; 4] = b"MOBI";
/// record 0 中加密类型字段相对record起点的偏移
const ENCRYPTION_TYPE_OFFSET: usize = 12;

fn read_u16_be(buffer: &[u8], offset: usize) -> Option<u16> {
    let bytes = buffer.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32_be(buffer: &[u8], offset: usize) -> Option<u32> {
    let bytes = buffer.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// 读取record 0的加密类型字段
///
/// 头部不完整、record表越界或签名不匹配时返回 `None`。
pub fn encryption_type(buffer: &[u8]) -> Option<u16> {
    let record_count = read_u16_be(buffer, RECORD_COUNT_OFFSET)? as usize;
    if record_count == 0 {
        return None;
    }

    let table_end = RECORD_TABLE_OFFSET.checked_add(record_count.checked_mul(RECORD_INFO_LEN)?)?;
    if table_end > buffer.len() {
        return None;
    }

    let record0 = read_u32_be(buffer, RECORD_TABLE_OFFSET)? as usize;
    let signature_start = record0.checked_add(MOBI_SIGNATURE_OFFSET)?;
    let signature = buffer.get(signature_start..signature_start.checked_add(MOBI_SIGNATURE.len())?)?;
    if signature != MOBI_SIGNATURE {
        return None;
    }

    read_u16_be(buffer, record0.checked_add(ENCRYPTION_TYPE_OFFSET)?)
}

/// 判断MOBI系列文件是否被DRM加密
///
/// 只有在签名校验通过且加密类型字段非零时才返回 `true`。
pub fn is_encrypted(buffer: &[u8]) -> bool {
    match encryption_type(buffer) {
        Some(kind) => {
            debug!(encryption_type = kind, "read MOBI encryption header");
            kind != 0
        }
        None => {
            debug!(len = buffer.len(), "MOBI header not recognised, assuming unencrypted");
            false
        }
    }
}
