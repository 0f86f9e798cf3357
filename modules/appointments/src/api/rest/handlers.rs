use std::sync::Arc;

use axum::{extract::Path, response::Response, Extension};
use modkit::api::response::{created_json, ok_json, ok_message, page_json};
use modkit::api::{PageRequest, ProblemResponse, ValidatedJson, ValidatedQuery};
use modkit::SecurityCtx;
use uuid::Uuid;

use crate::api::rest::dto::{
    AppointmentDto, CreateAppointmentReq, ListAppointmentsQuery, UpdateAppointmentReq,
};
use crate::api::rest::error::map_domain_error;
use crate::domain::model::{parse_status_filter, AppointmentPatch, NewAppointment};
use crate::domain::service::Service;

/// Page size bounds from the module config.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default: u64,
    pub max: u64,
}

pub async fn create_appointment(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    ValidatedJson(req): ValidatedJson<CreateAppointmentReq>,
) -> Result<Response, ProblemResponse> {
    let new = NewAppointment::try_from(req).map_err(|e| map_domain_error(&e))?;
    let appointment = svc
        .create(ctx.user_id, new)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(created_json(
        "Appointment created successfully",
        AppointmentDto::from(appointment),
    ))
}

pub async fn list_appointments(
    Extension(svc): Extension<Arc<Service>>,
    Extension(limits): Extension<PageLimits>,
    ctx: SecurityCtx,
    ValidatedQuery(q): ValidatedQuery<ListAppointmentsQuery>,
) -> Result<Response, ProblemResponse> {
    let statuses = parse_status_filter(q.status.as_deref()).map_err(|e| map_domain_error(&e))?;
    let page = PageRequest::clamp(q.page, q.limit, limits.default, limits.max);
    let (items, pagination) = svc
        .list(ctx.user_id, &statuses, page)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(page_json(
        items.into_iter().map(AppointmentDto::from).collect(),
        pagination,
    ))
}

pub async fn get_appointment(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    Path(id): Path<Uuid>,
) -> Result<Response, ProblemResponse> {
    let appointment = svc
        .get(ctx.user_id, id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(AppointmentDto::from(appointment)))
}

pub async fn update_appointment(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAppointmentReq>,
) -> Result<Response, ProblemResponse> {
    let patch = AppointmentPatch::try_from(req).map_err(|e| map_domain_error(&e))?;
    let appointment = svc
        .update(ctx.user_id, id, patch)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Appointment updated successfully",
        AppointmentDto::from(appointment),
    ))
}

pub async fn cancel_appointment(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    Path(id): Path<Uuid>,
) -> Result<Response, ProblemResponse> {
    let appointment = svc
        .cancel(ctx.user_id, id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Appointment cancelled successfully",
        AppointmentDto::from(appointment),
    ))
}

pub async fn complete_appointment(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
    Path(id): Path<Uuid>,
) -> Result<Response, ProblemResponse> {
    let appointment = svc
        .complete(ctx.user_id, id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Appointment marked as completed",
        AppointmentDto::from(appointment),
    ))
}
