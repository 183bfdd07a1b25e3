//! Request-processing pipeline.
//!
//! Stages run in a fixed order per request: the classification resolver
//! turns raw attributes into a composite key, the routing table maps the
//! key to a plugin chain and a destination tree, the plugin chain
//! executor threads the PDU through the resolved plugins, and the tree
//! multiplexer applies the surviving operation to the destination tree.
//! Everything here is built and validated once by the responder builder,
//! then frozen for the process lifetime.

pub mod classify;
pub mod config;
pub mod mux;
pub mod plugin;
pub mod registry;
pub mod responder;
pub mod route;
pub mod rules;

pub use classify::{Classification, ClassificationResolver};
pub use config::{
    ContentConfig, ContextConfig, CredentialsConfig, PeerConfig, PluginRouteConfig,
    ResponderConfig, RouteMatch, SetupError, TreeRouteConfig,
};
pub use mux::{MibTreeMux, TreeEntry};
pub use plugin::{ChainOutcome, Plugin, PluginRegistry, PluginScratch, PluginStatus};
pub use registry::{EngineHandle, EngineRegistry};
pub use responder::{Responder, ResponderBuilder};
pub use route::{RouteTable, RouteTableBuilder};
