pub mod bootstrap;
pub mod notification_scheduler;
pub mod prayer_schedule;
pub mod rollover;
pub mod service;
