// ==========================================
// 募捐活动结项 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 约束: 重复结项统一表现为 AlreadyClosed，不泄漏存储层冲突错误
// ==========================================

use crate::domain::types::CampaignStatus;
use crate::engine::closure_report_builder::ClosureValidationError;
use crate::engine::metrics_aggregator::AggregationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("活动当前状态不允许结项: campaign_id={campaign_id}, status={status}")]
    InvalidState { campaign_id: Uuid, status: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("活动已结项: campaign_id={0}")]
    AlreadyClosed(Uuid),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("审计文档尚未生成: campaign_id={0}")]
    DocumentPending(Uuid),

    // ==========================================
    // 依赖错误
    // ==========================================
    /// 硬依赖失败（带上下文）
    #[error("{context}: {source}")]
    Dependency {
        context: String,
        #[source]
        source: RepositoryError,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_state(campaign_id: Uuid, status: CampaignStatus) -> Self {
        ApiError::InvalidState {
            campaign_id,
            status: status.to_string(),
        }
    }

    pub fn dependency(context: impl Into<String>, source: RepositoryError) -> Self {
        ApiError::Dependency {
            context: context.into(),
            source,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseError(format!("数据库事务失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::DataCorruption { field, message } => {
                ApiError::DatabaseError(format!("存储数据损坏 (field={}): {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError::dependency(err.context, err.source)
    }
}

impl From<ClosureValidationError> for ApiError {
    fn from(err: ClosureValidationError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
