//! OpenAPI 3.1 document assembled from registered operation specs and
//! component schemas.

use std::collections::BTreeMap;

use modkit::api::{OperationSpec, ParamLocation};
use serde_json::{json, Map, Value};
use utoipa::openapi::{schema::Schema, RefOr};

pub type ComponentsMap = BTreeMap<String, RefOr<Schema>>;

pub const BEARER_SCHEME: &str = "bearerAuth";

#[derive(serde::Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: BTreeMap<String, BTreeMap<String, Value>>,
    pub components: OpenApiComponents,
}

#[derive(serde::Serialize)]
pub struct OpenApiInfo {
    pub title: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

#[derive(serde::Serialize, Default)]
pub struct OpenApiComponents {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
    #[serde(rename = "securitySchemes")]
    pub security_schemes: BTreeMap<String, Value>,
}

fn schema_ref(components: &ComponentsMap, content_type: &str, name: Option<&str>) -> Value {
    match name {
        Some(name) if components.contains_key(name) => {
            json!({ "$ref": format!("#/components/schemas/{name}") })
        }
        _ if content_type.ends_with("json") => json!({ "type": "object" }),
        _ => json!({}),
    }
}

fn content(components: &ComponentsMap, content_type: &str, name: Option<&str>) -> Value {
    json!({ content_type: { "schema": schema_ref(components, content_type, name) } })
}

fn operation(spec: &OperationSpec, components: &ComponentsMap) -> Value {
    let mut op = Map::new();
    op.insert(
        "operationId".into(),
        Value::String(
            spec.operation_id
                .clone()
                .unwrap_or_else(|| spec.handler_id.clone()),
        ),
    );
    if let Some(summary) = &spec.summary {
        op.insert("summary".into(), Value::String(summary.clone()));
    }
    if let Some(description) = &spec.description {
        op.insert("description".into(), Value::String(description.clone()));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }

    if !spec.params.is_empty() {
        let params: Vec<Value> = spec
            .params
            .iter()
            .map(|p| {
                let location = match p.location {
                    ParamLocation::Path => "path",
                    ParamLocation::Query => "query",
                };
                json!({
                    "name": p.name,
                    "in": location,
                    "required": p.location == ParamLocation::Path || p.required,
                    "description": p.description,
                    "schema": { "type": p.param_type },
                })
            })
            .collect();
        op.insert("parameters".into(), Value::Array(params));
    }

    if let Some(body) = &spec.request_body {
        op.insert(
            "requestBody".into(),
            json!({
                "description": body.description,
                "required": body.required,
                "content": content(components, body.content_type, body.schema_name.as_deref()),
            }),
        );
    }

    let responses: Map<String, Value> = spec
        .responses
        .iter()
        .map(|r| {
            (
                r.status.to_string(),
                json!({
                    "description": r.description,
                    "content": content(components, r.content_type, r.schema_name.as_deref()),
                }),
            )
        })
        .collect();
    op.insert("responses".into(), Value::Object(responses));

    if spec.bearer_auth {
        op.insert("security".into(), json!([{ BEARER_SCHEME: [] }]));
    }
    Value::Object(op)
}

pub fn build_document<'a>(
    specs: impl IntoIterator<Item = &'a OperationSpec>,
    components: &ComponentsMap,
) -> anyhow::Result<OpenApi> {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for spec in specs {
        paths
            .entry(spec.path.clone())
            .or_default()
            .insert(spec.method.as_str().to_lowercase(), operation(spec, components));
    }

    let mut schemas = BTreeMap::new();
    for (name, schema) in components {
        schemas.insert(name.clone(), serde_json::to_value(schema)?);
    }

    let security_schemes = BTreeMap::from([(
        BEARER_SCHEME.to_string(),
        json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }),
    )]);

    Ok(OpenApi {
        openapi: "3.1.0",
        info: OpenApiInfo {
            title: "Qure API",
            version: env!("CARGO_PKG_VERSION"),
            description: "Hospital appointments and patient queues",
        },
        paths,
        components: OpenApiComponents {
            schemas,
            security_schemes,
        },
    })
}
