//! 发布包解包
//!
//! 支持 `.tar.gz` / `.tgz` 压缩包以及直接发布的单个可执行文件。

use crate::error::{CoreError, IoContext, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    /// 不是压缩包，下载内容即为可执行文件
    Binary,
}

impl ArchiveKind {
    /// 根据 URL 文件名判断类型（忽略查询串）
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            ArchiveKind::TarGz
        } else {
            ArchiveKind::Binary
        }
    }
}

/// 将下载内容展开到 `dest`，返回包含 `binary_name` 的目录
pub async fn unpack(
    kind: ArchiveKind,
    download: &Path,
    dest: &Path,
    binary_name: &str,
) -> Result<PathBuf> {
    let download = download.to_owned();
    let dest = dest.to_owned();
    let binary_name = binary_name.to_owned();
    spawn_blocking(move || unpack_sync(kind, &download, &dest, &binary_name))
        .await
        .map_err(|e| CoreError::archive(format!("extraction task failed: {e}")))?
}

fn unpack_sync(kind: ArchiveKind, download: &Path, dest: &Path, binary_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dest).with_path(dest)?;
    match kind {
        ArchiveKind::TarGz => {
            let file = File::open(download).with_path(download)?;
            let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
            archive.set_preserve_permissions(true);
            archive
                .unpack(dest)
                .map_err(|e| CoreError::archive(format!("failed to extract archive: {e}")))?;
            debug!(dest = %dest.display(), "extracted tar.gz archive");
        }
        ArchiveKind::Binary => {
            let target = dest.join(binary_name);
            std::fs::copy(download, &target).with_path(&target)?;
            debug!(target = %target.display(), "staged raw binary");
        }
    }

    let root = locate_payload(dest, binary_name)?;
    make_executable(&root.join(binary_name))?;
    Ok(root)
}

/// 在解包目录（或其唯一子目录）中找到可执行文件所在目录
pub fn locate_payload(dest: &Path, binary_name: &str) -> Result<PathBuf> {
    if dest.join(binary_name).is_file() {
        return Ok(dest.to_path_buf());
    }
    let dirs: Vec<PathBuf> = std::fs::read_dir(dest)
        .with_path(dest)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    if let [only] = dirs.as_slice()
        && only.join(binary_name).is_file()
    {
        return Ok(only.clone());
    }
    Err(CoreError::archive(format!(
        "{binary_name} not found in release archive"
    )))
}

fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).with_path(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms).with_path(path)
}

/// 测试用：构造 tar.gz
#[cfg(any(test, feature = "testing"))]
pub fn build_tar_gz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(enc);
    for (path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, *data)
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .and_then(|enc| enc.finish())
        .expect("finish tar.gz")
}
