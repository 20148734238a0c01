pub mod params;
pub mod scalar;
