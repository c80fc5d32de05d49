pub mod identity;
pub mod metrics;
pub mod normalize;
pub mod table;
