pub mod format;
pub mod generic;
pub mod parallel;
