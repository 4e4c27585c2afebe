//! Reading and validating the files a batch is built from

pub mod check;
pub mod table;
pub mod yaml;

pub use check::{check_file, file_exists_error};
pub use table::{detect_delimiter, read_table, write_table, TableRow};
pub use yaml::{read_yaml, write_yaml, Scalar};
