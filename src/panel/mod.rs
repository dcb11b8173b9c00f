pub mod display;
pub mod regions;
pub mod surface;
