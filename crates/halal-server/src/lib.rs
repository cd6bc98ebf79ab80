//! HTTP gateway for halal label analysis.

pub mod gateway;
