//! HTTP API building blocks shared by every module: the type-state operation
//! builder, success and problem envelopes, validating extractors.

pub mod error_layer;
pub mod operation_builder;
pub mod problem;
pub mod response;
pub mod validation;

pub use error_layer::problem_context_middleware;
pub use operation_builder::{
    ensure_schema, state, Missing, OpenApiRegistry, OperationBuilder, OperationSpec,
    ParamLocation, ParamSpec, Present, RequestBodySpec, ResponseSpec,
};
pub use problem::{FieldError, Problem, ProblemResponse};
pub use response::{ApiResponse, PageRequest, Pagination};
pub use validation::{ValidatedJson, ValidatedQuery};
