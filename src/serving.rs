//! Prediction serving.
//!
//! [`service`] holds the shared model registry and answers prediction and
//! status requests without ever returning an error across its boundary.
//! [`http`] exposes it over HTTP.

pub mod http;
pub mod service;

pub use http::{router, serve};
pub use service::{
    ModelStatusRequest, ModelStatusResponse, PredictRequest, PredictResponse, ServingState,
};
