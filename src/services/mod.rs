mod statistics;

pub use statistics::StatisticsService;
