use std::future::Future;
use std::io;

use tracing::info;

/// Installs the shutdown handlers and returns a future that resolves on
/// Ctrl+C, or on SIGTERM where the platform has it.
///
/// Handlers are in place once this returns, before the future is polled.
pub fn signal() -> io::Result<impl Future<Output = io::Result<()>>> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        #[cfg(unix)]
        let terminated = terminate.recv();
        #[cfg(not(unix))]
        let terminated = std::future::pending::<Option<()>>();

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminated => {
                info!("Received SIGTERM, shutting down");
            }
        }
        Ok(())
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_resolves_shutdown() {
        let shutdown = signal().unwrap();

        let status = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("SIGTERM did not trigger shutdown")
            .unwrap();
    }
}
