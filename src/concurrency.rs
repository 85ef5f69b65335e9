use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs futures with at most `limit` in flight and returns their outputs in
/// input order, regardless of completion order.
pub async fn run_ordered<T, F>(futs: Vec<F>, limit: usize) -> Vec<T>
where
    F: Future<Output = T>,
{
    stream::iter(futs)
        .buffered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let futs: Vec<_> = [30u64, 5, 15, 0]
            .into_iter()
            .enumerate()
            .map(|(i, delay)| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                i
            })
            .collect();

        assert_eq!(run_ordered(futs, 4).await, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_limit_runs_sequentially() {
        let futs: Vec<_> = (0..3).map(|i| async move { i * 2 }).collect();
        assert_eq!(run_ordered(futs, 0).await, vec![0, 2, 4]);
    }
}
