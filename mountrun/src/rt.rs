use anyhow::Context;

/// Drives `f` to completion on a fresh multi-thread runtime owned by the
/// calling thread. The runtime is torn down before this returns.
pub fn block_on<F>(thread_name: &str, f: F) -> anyhow::Result<F::Output>
where
    F: Future,
{
    let rt = tokio::runtime::Builder::new_multi_thread()
        .thread_name(thread_name)
        .enable_all()
        .build()
        .with_context(|| format!("Failed to build Tokio runtime for {thread_name}"))?;
    Ok(rt.block_on(f))
}
