//! Shared utility modules used across the spam detector.

pub mod fs;
