pub mod gisaid_batch;

pub use gisaid_batch::{BatchOutputs, GisaidBatch, Submission};
