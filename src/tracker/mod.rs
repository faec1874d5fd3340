pub mod enhance;
pub mod predict;
pub mod smooth;

pub use enhance::ConsistencyEnhancer;
pub use predict::HandPredictor;
pub use smooth::HandSmoother;
