//! Submission formats for public health data repositories

pub mod gisaid;
pub mod nwss;
