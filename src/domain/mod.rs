// Domain layer - Black frame detection, substitution and timestamp rules

pub mod classifier;
pub mod model;
pub mod substitution;
pub mod timestamps;
