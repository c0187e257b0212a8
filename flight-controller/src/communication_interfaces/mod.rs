pub mod controller;
pub mod radio;
