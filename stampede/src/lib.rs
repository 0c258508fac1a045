#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod client;
pub mod scheduler;

pub(crate) mod executor;
pub(crate) mod vu;

pub use scheduler::{start, start_http, RunHandle, RunError};

pub mod prelude {
    pub use crate::aggregator::Aggregator;
    pub use crate::client::{ClientError, HttpClient, ReqwestClient};
    pub use crate::scheduler::{start, start_http, RunError, RunHandle};

    pub use stampede_core::{
        AggregateSnapshot, Check, ConfigError, FailureReason, LatencySummary, RequestOutcome,
        ResponseData, RunConfig,
    };
}
