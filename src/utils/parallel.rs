/// Parallel processing utilities

/// Build the global rayon pool, returning the thread count in use
///
/// `threads == 0` means one thread per available CPU.
pub fn configure_thread_pool(threads: usize) -> Result<usize, rayon::ThreadPoolBuildError> {
    let threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    Ok(threads)
}
