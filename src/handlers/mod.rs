mod health;
mod statistics;

pub use health::health_check;
pub use statistics::get_statistics;
