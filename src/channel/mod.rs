//! Channel map compiler
//!
//! Turns a textual channel map (`"10"`, `"+01,z"`, `"auto"`) or a subscribe
//! mask into a [`RoutingPlan`], classified once so the dispatch engine can
//! pick the cheapest way to apply it.

pub mod op;
pub mod parser;
pub mod plan;

pub use op::{ChannelOp, OpKind};
pub use parser::{parse_spec, ChannelSpec};
pub use plan::{classify, PlanKind, RoutingPlan};
