// ==========================================
// 募捐活动结项 - 审计文档层
// ==========================================
// 职责: 结项后异步生成、上传并挂载可校验的审计文档
// ==========================================

pub mod blob_store;
pub mod digest;
pub mod pipeline;
pub mod renderer;

pub use blob_store::{BlobStore, BlobStoreError, LocalBlobStore};
pub use digest::{content_hash, verify_content_hash};
pub use pipeline::{
    document_key, AuditDocumentPipeline, DocumentAttachment, PipelineError, RetryPolicy,
};
pub use renderer::{DocumentRenderer, PlainTextRenderer, RenderError};
