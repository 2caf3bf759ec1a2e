//! Element-level assembly of viscous operators.
pub mod buffers;
pub mod local;
