//! SHA-256 摘要计算与校验

use crate::error::{CoreError, IoContext, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// 解析并规范化十六进制 SHA-256（小写，64 位）
pub fn parse_sha256(value: &str) -> std::result::Result<String, String> {
    let v = value.trim().to_ascii_lowercase();
    if v.len() != 64 {
        return Err(format!("expected 64 hex characters, got {}", v.len()));
    }
    if !v.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("digest contains non-hex characters".to_string());
    }
    Ok(v)
}

pub fn sha256_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// 流式计算文件摘要
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).with_path(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).with_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// 校验文件与固定摘要一致
pub fn verify_file(path: &Path, name: &str, expected: &str) -> Result<String> {
    let expected = parse_sha256(expected).map_err(CoreError::invalid_input)?;
    let actual = sha256_file(path)?;
    if actual != expected {
        return Err(CoreError::ChecksumMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(actual)
}
