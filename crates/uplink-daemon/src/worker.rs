use anyhow::anyhow;
use tokio::task::JoinError;

/// Error for an arbiter worker that ended before shutdown was requested.
/// The worker only returns once cancelled.
pub fn unexpected_exit(result: Result<(), JoinError>) -> anyhow::Error {
    match result {
        Ok(()) => anyhow!("arbiter worker stopped without a shutdown signal"),
        Err(err) => anyhow::Error::new(err).context("arbiter worker failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panicked_worker_is_error() {
        let result = tokio::task::spawn_blocking(|| panic!("tick blew up")).await;
        let err = unexpected_exit(result);
        assert_eq!(err.to_string(), "arbiter worker failed");
        assert!(err.root_cause().to_string().contains("panic"));
    }

    #[tokio::test]
    async fn test_clean_early_return_is_error() {
        let result = tokio::task::spawn_blocking(|| ()).await;
        let err = unexpected_exit(result);
        assert!(err.to_string().contains("without a shutdown signal"));
    }
}
