// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化 + 协作方测试数据写入
// ==========================================
#![allow(dead_code)]

use campaign_closure::db::{init_schema, open_sqlite_connection};
use campaign_closure::domain::types::CampaignStatus;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接（与 AppState 相同的装配方式）
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    let conn = open_sqlite_connection(db_path).unwrap();
    Arc::new(Mutex::new(conn))
}

// ==========================================
// 测试数据写入
// ==========================================

pub fn seed_organizer(conn: &Connection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO organizers (id, name) VALUES (?1, ?2)",
        params![id.to_string(), name],
    )
    .unwrap();
    id
}

pub fn seed_campaign(
    conn: &Connection,
    organizer_id: Uuid,
    title: &str,
    goal: f64,
    status: CampaignStatus,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        r#"
        INSERT INTO campaigns (id, organizer_id, title, goal, status, start_date, end_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            id.to_string(),
            organizer_id.to_string(),
            title,
            goal,
            status.as_str(),
            start_date,
            end_date
        ],
    )
    .unwrap();
    id
}

/// 组织者 + 一个进行中的活动（开始于 45 天前，15 天后结束）
pub fn seed_active_campaign(conn: &Connection, goal: f64) -> Uuid {
    let organizer_id = seed_organizer(conn, "Fundación Esperanza");
    let now = Utc::now();
    seed_campaign(
        conn,
        organizer_id,
        "Agua potable para San Marcos",
        goal,
        CampaignStatus::Active,
        now - Duration::days(45),
        now + Duration::days(15),
    )
}

pub fn seed_donation(conn: &Connection, campaign_id: Uuid, donor_id: &str, amount: f64, status: &str) {
    conn.execute(
        r#"
        INSERT INTO donations (id, campaign_id, donor_id, amount, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            Uuid::new_v4().to_string(),
            campaign_id.to_string(),
            donor_id,
            amount,
            status,
            Utc::now()
        ],
    )
    .unwrap();
}

pub fn seed_receipt(
    conn: &Connection,
    campaign_id: Uuid,
    provider: &str,
    name: &str,
    total: f64,
    document_url: Option<&str>,
    issued_at: DateTime<Utc>,
) {
    conn.execute(
        r#"
        INSERT INTO receipts (id, campaign_id, provider, name, total, document_url, issued_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            Uuid::new_v4().to_string(),
            campaign_id.to_string(),
            provider,
            name,
            total,
            document_url,
            issued_at
        ],
    )
    .unwrap();
}

pub fn seed_activity(conn: &Connection, campaign_id: Uuid, title: &str, occurred_at: DateTime<Utc>) {
    conn.execute(
        r#"
        INSERT INTO campaign_activities (id, campaign_id, title, activity_type, occurred_at)
        VALUES (?1, ?2, ?3, 'update', ?4)
        "#,
        params![Uuid::new_v4().to_string(), campaign_id.to_string(), title, occurred_at],
    )
    .unwrap();
}

pub fn seed_alert(conn: &Connection, campaign_id: Uuid, resolved: bool) {
    conn.execute(
        r#"
        INSERT INTO campaign_alerts (id, campaign_id, alert_type, resolved, created_at)
        VALUES (?1, ?2, 'missing_receipt', ?3, ?4)
        "#,
        params![
            Uuid::new_v4().to_string(),
            campaign_id.to_string(),
            resolved as i64,
            Utc::now()
        ],
    )
    .unwrap();
}

pub fn seed_contract(conn: &Connection, campaign_id: Uuid, signed_at: Option<DateTime<Utc>>) {
    conn.execute(
        "INSERT INTO campaign_contracts (campaign_id, signed_at, document_url) VALUES (?1, ?2, NULL)",
        params![campaign_id.to_string(), signed_at],
    )
    .unwrap();
}

pub fn campaign_status(conn: &Connection, campaign_id: Uuid) -> String {
    conn.query_row(
        "SELECT status FROM campaigns WHERE id = ?1",
        params![campaign_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn count_reports(conn: &Connection, campaign_id: Uuid) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM campaign_closure_reports WHERE campaign_id = ?1",
        params![campaign_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}
