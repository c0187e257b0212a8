pub mod constants;
pub mod tuning;
