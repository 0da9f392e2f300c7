pub mod coupled;
pub mod optimization;
