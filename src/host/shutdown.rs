use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels `cancelation` on Ctrl-C. Returns early when something else cancelled it first, which
/// is the usual case: browsers stop the host by closing its stdin.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
