//! Domain Layer
//!
//! Value objects and ports the erasure code core is written against.
//!
//! - **Value objects**: [`ShardId`], [`ShardSet`], [`ShardMap`]
//! - **Ports**: [`ShardTransform`], [`TransformLoader`], [`PlacementRules`]
//!
//! Concrete providers of the ports live in [`crate::adapters`].

pub mod ports;

pub use ports::{
    // Port traits
    PlacementRules,
    ShardTransform,
    TransformLoader,
    // Value objects
    RuleMode,
    ShardId,
    ShardMap,
    ShardSet,
};
