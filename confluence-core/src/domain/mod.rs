//! Domain types for the decision core

pub mod ids;
pub mod instrument;
pub mod level;
pub mod regime;
pub mod side;
pub mod snapshot;

pub use ids::ConfigHash;
pub use instrument::{Instrument, TickPolicy};
pub use level::{LevelCategory, LevelSet, LevelSetError, LevelSide, ReferenceLevel};
pub use regime::Regime;
pub use side::{Action, Side};
pub use snapshot::{
    DepthBook, DepthLevel, FeedFrame, Freshness, MarketSnapshot, OrderFlowStats, Pressure,
    ValueArea, VwapBands,
};
