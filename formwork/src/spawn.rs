use std::future::Future;

use futures::FutureExt;

/// Run a future without waiting for it.
///
/// Inside a Tokio runtime the future is spawned as a task. Without one it is
/// polled once on the calling thread, and whatever has not finished by then is
/// driven to completion on a helper thread. Neither path enters an executor on
/// the calling thread, so this is safe to call from inside any other executor.
pub(crate) fn detach<F>(future: F)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => {
            let mut future = Box::pin(future);
            if (&mut future).now_or_never().is_none() {
                log::debug!("No Tokio runtime, finishing validation on a helper thread");
                std::thread::spawn(move || futures::executor::block_on(future));
            }
        }
    }
}
