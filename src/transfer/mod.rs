//! Transfer functions - scalar value to RGBA lookup tables
//!
//! - transfer_function.rs: the table and its device texture mirror
//! - control_points.rs: building tables from color/opacity control points
//! - transfer_function_registry.rs: named definitions shared with renderers

pub mod control_points;
pub mod transfer_function;
pub mod transfer_function_registry;

pub use control_points::{build_rgba_table, ColorControlPoint, OpacityControlPoint};
pub use transfer_function::{colorize_points, sample_table, TransferFunction};
pub use transfer_function_registry::{SharedTransferFunction, TransferFunctionRegistry};
