pub mod error;
pub mod field;
pub mod grid;
pub mod interp;
pub mod march;
pub mod mesh;
pub mod plugin;
pub mod tables;
pub mod types;
pub mod utils;

pub use plugin::IsosurfacePlugin;
