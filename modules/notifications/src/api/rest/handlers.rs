use std::sync::Arc;

use axum::{extract::Path, response::Response, Extension};
use modkit::api::response::{ok_json, ok_message, page_json};
use modkit::api::{PageRequest, ProblemResponse, ValidatedQuery};
use modkit::SecurityCtx;
use uuid::Uuid;

use crate::api::rest::dto::{
    ListNotificationsQuery, MarkAllReadDto, NotificationDto, UnreadCountDto,
};
use crate::api::rest::error::map_domain_error;
use crate::domain::service::Service;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

pub async fn list_notifications(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    ValidatedQuery(q): ValidatedQuery<ListNotificationsQuery>,
) -> Result<Response, ProblemResponse> {
    let page = PageRequest::clamp(q.page, q.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let (items, pagination) = svc
        .list(ctx.user_id, q.unread.unwrap_or(false), page)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(page_json(
        items.into_iter().map(NotificationDto::from).collect(),
        pagination,
    ))
}

pub async fn unread_count(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
) -> Result<Response, ProblemResponse> {
    let count = svc
        .unread_count(ctx.user_id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(UnreadCountDto { count }))
}

pub async fn mark_read(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    Path(id): Path<Uuid>,
) -> Result<Response, ProblemResponse> {
    let n = svc
        .mark_read(ctx.user_id, id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Notification marked as read",
        NotificationDto::from(n),
    ))
}

pub async fn mark_all_read(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
) -> Result<Response, ProblemResponse> {
    let updated = svc
        .mark_all_read(ctx.user_id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "All notifications marked as read",
        MarkAllReadDto { updated },
    ))
}
