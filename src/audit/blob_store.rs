// ==========================================
// 募捐活动结项 - 审计文档存储
// ==========================================
// BlobStore: 流水线的上传出口
// LocalBlobStore: 写入本地根目录，返回公开 URL（配置了 base url）或 file:// URL
// 约束: key 只允许普通路径分量，拒绝 .. / 绝对路径
// ==========================================

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BlobStoreError {
    #[error("无效的存储键: {0}")]
    InvalidKey(String),

    #[error("存储读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储不可用: {0}")]
    Unavailable(String),
}

/// 审计文档存储
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 以 `key` 保存 `data`，返回可下载的 URL
    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, BlobStoreError>;

    /// 删除 `key` 对应的对象；不存在视为成功
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;
}

// ==========================================
// LocalBlobStore - 本地文件系统存储
// ==========================================
pub struct LocalBlobStore {
    root_dir: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStore {
    /// 创建存储，根目录不存在时自动创建
    pub async fn new<P: AsRef<Path>>(
        root_dir: P,
        public_base_url: Option<String>,
    ) -> Result<Self, BlobStoreError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "审计文档存储已初始化");

        Ok(Self {
            root_dir,
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let relative = Path::new(key);
        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root_dir.join(relative))
    }

    fn url_for(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("file://{}", path.display()),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        debug!(key, content_type, size_bytes = data.len(), "审计文档已写入");
        Ok(self.url_for(key, &path))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "审计文档已删除");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
