pub mod gisaid_batch;
pub mod nwss_batch;
