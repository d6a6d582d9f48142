pub mod calendar;
pub mod chat;
pub mod courses;
pub mod generation;
pub mod health;
pub mod ingest;
pub mod lms;
pub mod study;
pub mod uploads;
