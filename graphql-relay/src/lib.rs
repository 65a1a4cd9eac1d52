//! A GraphQL relay: single and batched endpoints in front of an [`Executor`],
//! opaque global object ids and argument presence checks.

pub mod json_ext;

mod axum_factory;
pub mod batching;
pub mod configuration;
pub mod error;
mod executable;
pub mod fields;
pub mod global_id;
pub mod graphql;
pub mod services;
pub mod test_harness;

pub use axum_factory::HttpServerHandle;
pub use axum_factory::make_router;
pub use axum_factory::serve;
pub use batching::BatchExecutor;
pub use batching::BatchRequest;
pub use batching::BatchResponse;
pub use configuration::Configuration;
pub use executable::main;
pub use fields::Checker;
pub use fields::FieldChecker;
pub use global_id::Id;
pub use global_id::marshal_id;
pub use global_id::unmarshal_kind;
pub use global_id::unmarshal_spec;
pub use services::Executor;
pub use services::executor_fn;
