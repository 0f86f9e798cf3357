use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};
use modkit::{Role, RouterSecurityExt, TokenVerifier};

use crate::api::rest::handlers::PageLimits;
use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

/// Booking routes are patient-only; completion is staff-only.
pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
    limits: PageLimits,
) -> anyhow::Result<Router> {
    let mut patient = Router::new();

    patient = OperationBuilder::<Missing, Missing, ()>::post("/api/appointments")
        .operation_id("appointments.create")
        .summary("Book an appointment")
        .tag("appointments")
        .bearer_auth()
        .json_request::<dto::CreateAppointmentReq>(openapi, "Appointment details")
        .handler(handlers::create_appointment)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 201, "Appointment scheduled")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Validation failed or date in the past")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::get("/api/appointments")
        .operation_id("appointments.list")
        .summary("List the caller's appointments")
        .description("Sorted by appointment date, earliest first.")
        .tag("appointments")
        .bearer_auth()
        .query_param("status", false, "Comma-separated statuses")
        .query_param_typed("page", false, "1-based page", "integer")
        .query_param_typed("limit", false, "Page size", "integer")
        .handler(handlers::list_appointments)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 200, "Page of appointments")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Unknown status")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::get("/api/appointments/{id}")
        .operation_id("appointments.get")
        .summary("Get one of the caller's appointments")
        .tag("appointments")
        .bearer_auth()
        .path_param("id", "Appointment UUID")
        .handler(handlers::get_appointment)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 200, "Appointment")
        .auth_errors(openapi)
        .problem_response(openapi, 404, "Not found or not the caller's")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::put("/api/appointments/{id}")
        .operation_id("appointments.update")
        .summary("Reschedule or edit a scheduled appointment")
        .tag("appointments")
        .bearer_auth()
        .path_param("id", "Appointment UUID")
        .json_request::<dto::UpdateAppointmentReq>(openapi, "Fields to change")
        .handler(handlers::update_appointment)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 200, "Updated appointment")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Validation failed or appointment is final")
        .problem_response(openapi, 404, "Not found or not the caller's")
        .problem_response(openapi, 409, "Changed concurrently")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::delete("/api/appointments/{id}")
        .operation_id("appointments.cancel")
        .summary("Cancel a scheduled appointment")
        .tag("appointments")
        .bearer_auth()
        .path_param("id", "Appointment UUID")
        .handler(handlers::cancel_appointment)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 200, "Cancelled appointment")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Already cancelled or completed")
        .problem_response(openapi, 404, "Not found or not the caller's")
        .register(patient, openapi);

    let patient = patient.guard(verifier.clone(), &[Role::Patient]);

    let mut staff = Router::new();
    staff = OperationBuilder::<Missing, Missing, ()>::put("/api/appointments/{id}/complete")
        .operation_id("appointments.complete")
        .summary("Mark an appointment as completed")
        .tag("appointments")
        .bearer_auth()
        .path_param("id", "Appointment UUID")
        .handler(handlers::complete_appointment)
        .json_response_with_schema::<dto::AppointmentDto>(openapi, 200, "Completed appointment")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Appointment is not scheduled")
        .problem_response(openapi, 404, "Appointment not found")
        .register(staff, openapi);
    let staff = staff.guard(verifier, &[Role::Staff]);

    Ok(router.merge(
        patient
            .merge(staff)
            .layer(Extension(service))
            .layer(Extension(limits)),
    ))
}
