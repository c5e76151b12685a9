// Engine module - the retroactive item-tree publisher and its filter rules.
// This layer sits between producer events (types) and the backend boundary
// (client).

pub mod error;
pub mod filter;
pub mod matcher;
pub mod node;
pub mod publisher;

pub use error::{Error, Result};
pub use filter::{
    FilterTarget, FlattenFilters, FlattenRule, RemoveFilters, RemoveReason, RemoveRule,
    WUKS_KEYWORD_NAME,
};
pub use matcher::Matcher;
pub use node::{Node, NodeId};
pub use publisher::Publisher;
