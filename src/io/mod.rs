//! File output for session telemetry and itineraries.

pub mod export;
