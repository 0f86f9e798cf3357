use std::sync::Arc;

use axum::{response::Response, Extension};
use modkit::api::problem::bad_request;
use modkit::api::response::{created_json, ok_json, ok_message, page_json};
use modkit::api::{PageRequest, ProblemResponse, ValidatedJson, ValidatedQuery};
use modkit::SecurityCtx;

use crate::api::rest::dto::{
    BoardEntryDto, CallNextReq, DebugDumpDto, HistoryQuery, JoinQueueReq, QueueEntryDto,
    QueueFilterQuery, QueueStatusDto, StaffQueueEntryDto,
};
use crate::api::rest::error::map_domain_error;
use crate::domain::service::Service;

/// Page size bounds from the module config.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default: u64,
    pub max: u64,
}

pub async fn join_queue(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    ValidatedJson(req): ValidatedJson<JoinQueueReq>,
) -> Result<Response, ProblemResponse> {
    let entry = svc
        .join(ctx.user_id, req.into())
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(created_json(
        "Successfully joined the queue",
        QueueEntryDto::from(entry),
    ))
}

pub async fn queue_status(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
) -> Result<Response, ProblemResponse> {
    let (entry, stats) = svc
        .status(ctx.user_id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(QueueStatusDto {
        entry: entry.into(),
        queue_stats: stats.into(),
    }))
}

pub async fn leave_queue(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
) -> Result<Response, ProblemResponse> {
    let entry = svc
        .leave(ctx.user_id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Successfully left the queue",
        QueueEntryDto::from(entry),
    ))
}

pub async fn queue_history(
    Extension(svc): Extension<Arc<Service>>,
    Extension(limits): Extension<PageLimits>,
    ctx: SecurityCtx,
    ValidatedQuery(q): ValidatedQuery<HistoryQuery>,
) -> Result<Response, ProblemResponse> {
    let page = PageRequest::clamp(q.page, q.limit, limits.default, limits.max);
    let (items, pagination) = svc
        .history(ctx.user_id, page)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(page_json(
        items.into_iter().map(QueueEntryDto::from).collect(),
        pagination,
    ))
}

pub async fn queue_board(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(q): ValidatedQuery<QueueFilterQuery>,
) -> Result<Response, ProblemResponse> {
    let rows = svc
        .board(q.hospital().as_deref(), q.specialty().as_deref())
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(
        rows.into_iter().map(BoardEntryDto::from).collect::<Vec<_>>(),
    ))
}

pub async fn hospital_queue(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(q): ValidatedQuery<QueueFilterQuery>,
) -> Result<Response, ProblemResponse> {
    let hospital = q
        .hospital()
        .ok_or_else(|| bad_request("Hospital name is required"))?;
    let rows = svc
        .hospital_queue(&hospital, q.specialty().as_deref())
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(
        rows.into_iter()
            .map(StaffQueueEntryDto::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn call_next(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    ValidatedJson(req): ValidatedJson<CallNextReq>,
) -> Result<Response, ProblemResponse> {
    let (hospital, specialty) = req
        .target()
        .ok_or_else(|| bad_request("Hospital name and specialty are required"))?;
    let entry = svc
        .call_next(ctx.user_id, &hospital, &specialty)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Next patient called successfully",
        QueueEntryDto::from(entry),
    ))
}

pub async fn debug_dump(
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Response, ProblemResponse> {
    let rows = svc.dump().await.map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(DebugDumpDto {
        total: rows.len(),
        entries: rows.into_iter().map(StaffQueueEntryDto::from).collect(),
    }))
}
