pub mod patient;
pub mod vital_sign;

pub use patient::*;
pub use vital_sign::*;
