//! Type-state operation builder.
//!
//! - `register()` exists only once a handler and at least one response are set
//! - descriptive methods are available at any stage
//! - request and response schemas are registered with the OpenAPI registry on the fly

use axum::http::Method;
use axum::{handler::Handler, routing::MethodRouter, Router};
use std::marker::PhantomData;

use crate::api::problem;

type SchemaCollection = Vec<(
    String,
    utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
)>;

pub mod state {
    #[derive(Debug, Clone, Copy)]
    pub struct Missing;

    #[derive(Debug, Clone, Copy)]
    pub struct Present;
}

mod sealed {
    pub trait Sealed {}
}

/// Maps the handler state to the router slot: `()` while missing, `MethodRouter<S>` once set.
pub trait HandlerSlot<S>: sealed::Sealed {
    type Slot;
}

impl sealed::Sealed for Missing {}
impl sealed::Sealed for Present {}

impl<S> HandlerSlot<S> for Missing {
    type Slot = ();
}
impl<S> HandlerSlot<S> for Present {
    type Slot = MethodRouter<S>;
}

pub use state::{Missing, Present};

#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: Option<String>,
    /// JSON Schema type (`string`, `integer`, ...).
    pub param_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

#[derive(Clone, Debug)]
pub struct RequestBodySpec {
    pub content_type: &'static str,
    pub description: Option<String>,
    /// Component schema referenced by `$ref`.
    pub schema_name: Option<String>,
    pub required: bool,
}

#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub status: u16,
    pub content_type: &'static str,
    pub description: String,
    pub schema_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
    /// Requires `Authorization: Bearer <jwt>`.
    pub bearer_auth: bool,
    pub handler_id: String,
}

/// Sink for operations and component schemas; implemented by the REST host.
pub trait OpenApiRegistry {
    fn register_operation(&self, spec: &OperationSpec);

    /// Insert `schemas` (root first, then dependencies) under components and
    /// return the canonical name for `$ref`.
    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// Register `T` and everything it references; returns its component name.
pub fn ensure_schema<T: utoipa::ToSchema + utoipa::PartialSchema + 'static>(
    registry: &dyn OpenApiRegistry,
) -> String {
    use utoipa::PartialSchema;

    let root_name = T::name().to_string();
    let mut collected: SchemaCollection = vec![(root_name.clone(), <T as PartialSchema>::schema())];
    T::schemas(&mut collected);
    registry.ensure_schema_raw(&root_name, collected)
}

/// Generic parameters: `H` handler state, `R` response state, `S` router state.
pub struct OperationBuilder<H, R, S>
where
    H: HandlerSlot<S>,
{
    spec: OperationSpec,
    method_router: <H as HandlerSlot<S>>::Slot,
    _has_handler: PhantomData<H>,
    _has_response: PhantomData<R>,
    _state: PhantomData<fn() -> S>,
}

impl<S> OperationBuilder<Missing, Missing, S> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path_str = path.into();
        let handler_id = format!(
            "{}:{}",
            method.as_str().to_lowercase(),
            path_str.replace(['/', '{', '}'], "_")
        );

        Self {
            spec: OperationSpec {
                method,
                path: path_str,
                operation_id: None,
                summary: None,
                description: None,
                tags: Vec::new(),
                params: Vec::new(),
                request_body: None,
                responses: Vec::new(),
                bearer_auth: false,
                handler_id,
            },
            method_router: (),
            _has_handler: PhantomData,
            _has_response: PhantomData,
            _state: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }
}

impl<H, R, S> OperationBuilder<H, R, S>
where
    H: HandlerSlot<S>,
{
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.spec.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.spec.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    /// Documents the bearer requirement; enforcement is the router's auth layer.
    pub fn bearer_auth(mut self) -> Self {
        self.spec.bearer_auth = true;
        self
    }

    pub fn path_param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.into(),
            location: ParamLocation::Path,
            required: true,
            description: Some(description.into()),
            param_type: "string".to_string(),
        });
        self
    }

    pub fn query_param(
        self,
        name: impl Into<String>,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.query_param_typed(name, required, description, "string")
    }

    pub fn query_param_typed(
        mut self,
        name: impl Into<String>,
        required: bool,
        description: impl Into<String>,
        param_type: impl Into<String>,
    ) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.into(),
            location: ParamLocation::Query,
            required,
            description: Some(description.into()),
            param_type: param_type.into(),
        });
        self
    }

    /// Required JSON body; the schema of `T` is registered.
    pub fn json_request<T>(
        mut self,
        registry: &dyn OpenApiRegistry,
        desc: impl Into<String>,
    ) -> Self
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.spec.request_body = Some(RequestBodySpec {
            content_type: "application/json",
            description: Some(desc.into()),
            schema_name: Some(name),
            required: true,
        });
        self
    }

    fn push_response(
        &mut self,
        status: u16,
        content_type: &'static str,
        description: String,
        schema_name: Option<String>,
    ) {
        self.spec.responses.push(ResponseSpec {
            status,
            content_type,
            description,
            schema_name,
        });
    }
}

impl<R, S> OperationBuilder<Missing, R, S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn handler<F, T>(self, h: F) -> OperationBuilder<Present, R, S>
    where
        F: Handler<T, S> + Clone + Send + 'static,
        T: 'static,
    {
        let method_router = match self.spec.method {
            Method::GET => axum::routing::get(h),
            Method::POST => axum::routing::post(h),
            Method::PUT => axum::routing::put(h),
            Method::DELETE => axum::routing::delete(h),
            _ => axum::routing::any(|| async { axum::http::StatusCode::METHOD_NOT_ALLOWED }),
        };

        OperationBuilder {
            spec: self.spec,
            method_router,
            _has_handler: PhantomData::<Present>,
            _has_response: self._has_response,
            _state: self._state,
        }
    }
}

impl<H, S> OperationBuilder<H, Missing, S>
where
    H: HandlerSlot<S>,
{
    fn into_responded(self) -> OperationBuilder<H, Present, S> {
        OperationBuilder {
            spec: self.spec,
            method_router: self.method_router,
            _has_handler: self._has_handler,
            _has_response: PhantomData::<Present>,
            _state: self._state,
        }
    }

    pub fn json_response(
        mut self,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        self.push_response(status, "application/json", description.into(), None);
        self.into_responded()
    }

    pub fn json_response_with_schema<T>(
        mut self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S>
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.push_response(status, "application/json", description.into(), Some(name));
        self.into_responded()
    }
}

impl<H, S> OperationBuilder<H, Present, S>
where
    H: HandlerSlot<S>,
{
    pub fn json_response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.push_response(status, "application/json", description.into(), None);
        self
    }

    pub fn json_response_with_schema<T>(
        mut self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> Self
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.push_response(status, "application/json", description.into(), Some(name));
        self
    }

    /// `application/problem+json` error response.
    pub fn problem_response(
        mut self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> Self {
        let name = ensure_schema::<problem::Problem>(registry);
        self.push_response(
            status,
            problem::APPLICATION_PROBLEM_JSON,
            description.into(),
            Some(name),
        );
        self
    }

    /// 401 and 403 problems for routes behind the auth layers.
    pub fn auth_errors(self, registry: &dyn OpenApiRegistry) -> Self {
        self.problem_response(registry, 401, "Missing or invalid token")
            .problem_response(registry, 403, "Role not allowed")
    }
}

impl<S> OperationBuilder<Present, Present, S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn register(self, router: Router<S>, openapi: &dyn OpenApiRegistry) -> Router<S> {
        openapi.register_operation(&self.spec);
        router.route(&self.spec.path, self.method_router)
    }
}
