//! CLI command implementations.

pub(crate) mod replay;
pub(crate) mod route;

pub(crate) use replay::ReplayArgs;
pub(crate) use route::RouteArgs;
