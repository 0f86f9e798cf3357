use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};
use modkit::{RouterSecurityExt, TokenVerifier};

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

/// Every route needs a bearer token; any role may read its own feed.
pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
) -> anyhow::Result<Router> {
    let mut feed = Router::new();

    feed = OperationBuilder::<Missing, Missing, ()>::get("/api/notifications")
        .operation_id("notifications.list")
        .summary("List the caller's notifications")
        .description("Newest first, paginated.")
        .tag("notifications")
        .bearer_auth()
        .query_param_typed("unread", false, "Only unread notifications", "boolean")
        .query_param_typed("page", false, "1-based page", "integer")
        .query_param_typed("limit", false, "Page size (max 100)", "integer")
        .handler(handlers::list_notifications)
        .json_response_with_schema::<dto::NotificationDto>(openapi, 200, "Page of notifications")
        .auth_errors(openapi)
        .problem_response(openapi, 400, "Bad query")
        .register(feed, openapi);

    feed = OperationBuilder::<Missing, Missing, ()>::get("/api/notifications/unread-count")
        .operation_id("notifications.unread_count")
        .summary("Number of unread notifications")
        .tag("notifications")
        .bearer_auth()
        .handler(handlers::unread_count)
        .json_response_with_schema::<dto::UnreadCountDto>(openapi, 200, "Unread count")
        .auth_errors(openapi)
        .register(feed, openapi);

    feed = OperationBuilder::<Missing, Missing, ()>::put("/api/notifications/read-all")
        .operation_id("notifications.mark_all_read")
        .summary("Mark every notification as read")
        .tag("notifications")
        .bearer_auth()
        .handler(handlers::mark_all_read)
        .json_response_with_schema::<dto::MarkAllReadDto>(openapi, 200, "Number of notifications updated")
        .auth_errors(openapi)
        .register(feed, openapi);

    feed = OperationBuilder::<Missing, Missing, ()>::put("/api/notifications/{id}/read")
        .operation_id("notifications.mark_read")
        .summary("Mark one notification as read")
        .tag("notifications")
        .bearer_auth()
        .path_param("id", "Notification UUID")
        .handler(handlers::mark_read)
        .json_response_with_schema::<dto::NotificationDto>(openapi, 200, "Updated notification")
        .auth_errors(openapi)
        .problem_response(openapi, 404, "Not found or not the caller's")
        .register(feed, openapi);

    let feed = feed.require_auth(verifier).layer(Extension(service));
    Ok(router.merge(feed))
}
