use std::future::Future;

/// Runs a network operation as its own runtime task and waits for it.
///
/// The calling task only yields while the operation is in flight. A panic
/// inside the operation comes back as an error instead of unwinding into
/// the caller. There is no cancellation: once spawned, the task runs to
/// completion even if the caller stops waiting.
pub async fn offload<F, T>(task: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| anyhow::anyhow!("Worker task failed: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offload_returns_result() {
        let value = offload(async { Ok::<_, anyhow::Error>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_offload_propagates_error() {
        let result: anyhow::Result<()> =
            offload(async { Err::<(), _>(anyhow::anyhow!("Connection refused")) }).await;
        assert_eq!(result.unwrap_err().to_string(), "Connection refused");
    }

    #[tokio::test]
    async fn test_offload_contains_panic() {
        let result = offload(async {
            if 1 + 1 == 2 {
                panic!("boom");
            }
            Ok::<(), anyhow::Error>(())
        })
        .await;
        assert!(result.is_err());
    }
}
