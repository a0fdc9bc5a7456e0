// ==========================================
// 募捐活动结项 - 组织者数据仓储
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::sources::OrganizerDirectory;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct OrganizerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrganizerRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询组织者显示名称
    pub fn find_name(&self, organizer_id: Uuid) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let name = conn
            .query_row(
                "SELECT name FROM organizers WHERE id = ?1",
                params![organizer_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name)
    }
}

#[async_trait]
impl OrganizerDirectory for OrganizerRepository {
    async fn organizer_name(&self, organizer_id: Uuid) -> RepositoryResult<String> {
        self.find_name(organizer_id)?
            .ok_or_else(|| RepositoryError::not_found("Organizer", organizer_id))
    }
}
