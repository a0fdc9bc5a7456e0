// ==========================================
// 募捐活动结项 - 命令行入口
// ==========================================
// 用法:
//   campaign-closure close <campaign_id> <goal_reached|end_date|manual> [reason]
//   campaign-closure report <campaign_id>
//   campaign-closure audit <campaign_id>
//   campaign-closure resume-documents
// 数据库路径: CAMPAIGN_CLOSURE_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use campaign_closure::api::parse_closure_type;
use campaign_closure::app::{get_default_db_path, AppState};
use campaign_closure::logging;
use std::time::Duration;
use uuid::Uuid;

const DOCUMENT_WAIT: Duration = Duration::from_secs(120);

const USAGE: &str = "用法:
  campaign-closure close <campaign_id> <goal_reached|end_date|manual> [reason]
  campaign-closure report <campaign_id>
  campaign-closure audit <campaign_id>
  campaign-closure resume-documents";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    tracing::info!(
        "{} v{} 启动",
        campaign_closure::APP_NAME,
        campaign_closure::VERSION
    );

    let db_path = get_default_db_path();
    let state = AppState::new(db_path).await.map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "close" => {
            let campaign_id = parse_id(args.get(1))?;
            let closure_type = parse_closure_type(
                args.get(2).map(String::as_str).context("缺少结项类型")?,
            )?;
            let reason = (args.len() > 3).then(|| args[3..].join(" "));

            let report = state
                .closure_api
                .close_campaign(campaign_id, closure_type, reason, None)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            // 等待文档流水线结束后再退出
            let job = state
                .closure_api
                .wait_for_document(campaign_id, DOCUMENT_WAIT)
                .await?;
            println!("audit_document: {}", job.status);
        }
        "report" => {
            let campaign_id = parse_id(args.get(1))?;
            let report = state.closure_api.get_public_audit_report(campaign_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "audit" => {
            let campaign_id = parse_id(args.get(1))?;
            let job = state.closure_api.get_document_job(campaign_id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            match state.closure_api.get_audit_document_url(campaign_id).await {
                Ok(url) => println!("document_url: {}", url),
                Err(e) => println!("{}", e),
            }
        }
        "resume-documents" => {
            let handles = state.pipeline.resume_pending().await?;
            let count = handles.len();
            futures::future::join_all(handles).await;
            println!("已处理 {} 个审计文档任务", count);
        }
        other => bail!("未知命令 '{}'\n{}", other, USAGE),
    }

    Ok(())
}

fn parse_id(raw: Option<&String>) -> Result<Uuid> {
    let raw = raw.context("缺少 campaign_id")?;
    Uuid::parse_str(raw).with_context(|| format!("无效的 campaign_id: {}", raw))
}
