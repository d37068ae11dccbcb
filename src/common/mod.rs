// Common utilities and shared constants used across the application

pub mod constants;
