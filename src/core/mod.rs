pub mod matrix_profile;
pub mod options;
pub mod persist;
pub mod stats;
