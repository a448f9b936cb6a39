pub mod analyze;
pub mod config;
pub mod doctor;
pub mod research;
pub mod search;
pub mod serve;
