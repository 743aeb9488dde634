pub mod camera;
pub mod canvas;
pub mod core;
pub mod math;
pub mod parser;
pub mod render;
pub mod shading;

pub use math::*;
