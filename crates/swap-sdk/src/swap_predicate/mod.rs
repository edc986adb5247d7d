pub mod contract;
pub mod funding;
pub mod params;
pub mod root;
pub mod rule;
pub mod template;
pub mod tx;
