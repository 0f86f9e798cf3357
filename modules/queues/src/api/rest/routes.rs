use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};
use modkit::{Role, RouterSecurityExt, TokenVerifier};

use crate::api::rest::handlers::PageLimits;
use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

/// Patient routes: join, status, leave, history, the board and, when
/// `debug_endpoint` is set, the full dump. Staff routes: hospital listing
/// and call-next.
pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
    limits: PageLimits,
    debug_endpoint: bool,
) -> anyhow::Result<Router> {
    let mut patient = Router::new();

    patient = OperationBuilder::<Missing, Missing, ()>::post("/api/queues/join")
        .operation_id("queues.join")
        .summary("Join a hospital queue")
        .tag("queues")
        .bearer_auth()
        .json_request::<dto::JoinQueueReq>(openapi, "Hospital, specialty and priority")
        .handler(handlers::join_queue)
        .json_response_with_schema::<dto::QueueEntryDto>(openapi, 201, "Queue entry")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Validation failed or already in a queue")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::get("/api/queues/status")
        .operation_id("queues.status")
        .summary("Current queue entry with live stats")
        .tag("queues")
        .bearer_auth()
        .handler(handlers::queue_status)
        .json_response_with_schema::<dto::QueueStatusDto>(openapi, 200, "Entry and stats")
        .auth_errors(openapi)
        .problem_response(openapi, 404, "Not in a queue")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::delete("/api/queues/leave")
        .operation_id("queues.leave")
        .summary("Leave the current queue")
        .tag("queues")
        .bearer_auth()
        .handler(handlers::leave_queue)
        .json_response_with_schema::<dto::QueueEntryDto>(openapi, 200, "Cancelled entry")
        .auth_errors(openapi)
        .problem_response(openapi, 404, "Not in a queue")
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::get("/api/queues/history")
        .operation_id("queues.history")
        .summary("The caller's queue entries, newest first")
        .tag("queues")
        .bearer_auth()
        .query_param_typed("page", false, "1-based page", "integer")
        .query_param_typed("limit", false, "Page size", "integer")
        .handler(handlers::queue_history)
        .json_response_with_schema::<dto::QueueEntryDto>(openapi, 200, "Page of entries")
        .auth_errors(openapi)
        .register(patient, openapi);

    patient = OperationBuilder::<Missing, Missing, ()>::get("/api/queues/all")
        .operation_id("queues.board")
        .summary("Waiting-room board")
        .description("Waiting and called entries with the patient's name only.")
        .tag("queues")
        .bearer_auth()
        .query_param("hospitalName", false, "Hospital filter")
        .query_param("specialty", false, "Specialty filter")
        .handler(handlers::queue_board)
        .json_response_with_schema::<dto::BoardEntryDto>(openapi, 200, "Board rows")
        .auth_errors(openapi)
        .register(patient, openapi);

    if debug_endpoint {
        patient = OperationBuilder::<Missing, Missing, ()>::get("/api/queues/debug")
            .operation_id("queues.debug")
            .summary("Dump every queue entry")
            .description("Enabled by `modules.queues.config.enable_debug_endpoint`.")
            .tag("queues")
            .bearer_auth()
            .handler(handlers::debug_dump)
            .json_response_with_schema::<dto::DebugDumpDto>(openapi, 200, "All entries")
            .auth_errors(openapi)
            .register(patient, openapi);
    }

    let patient = patient.guard(verifier.clone(), &[Role::Patient]);

    let mut staff = Router::new();
    staff = OperationBuilder::<Missing, Missing, ()>::get("/api/queues/hospital")
        .operation_id("queues.hospital")
        .summary("Waiting patients of a hospital")
        .tag("queues")
        .bearer_auth()
        .query_param("hospitalName", true, "Hospital name")
        .query_param("specialty", false, "Specialty filter")
        .handler(handlers::hospital_queue)
        .json_response_with_schema::<dto::StaffQueueEntryDto>(openapi, 200, "Waiting entries")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Hospital name missing")
        .register(staff, openapi);

    staff = OperationBuilder::<Missing, Missing, ()>::post("/api/queues/call-next")
        .operation_id("queues.call_next")
        .summary("Call the next waiting patient")
        .description("Strict first-come first-served by join time.")
        .tag("queues")
        .bearer_auth()
        .json_request::<dto::CallNextReq>(openapi, "Hospital and specialty")
        .handler(handlers::call_next)
        .json_response_with_schema::<dto::QueueEntryDto>(openapi, 200, "Called entry")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Hospital or specialty missing")
        .problem_response(openapi, 404, "Nobody waiting")
        .register(staff, openapi);
    let staff = staff.guard(verifier, &[Role::Staff]);

    Ok(router.merge(
        patient
            .merge(staff)
            .layer(Extension(service))
            .layer(Extension(limits)),
    ))
}
