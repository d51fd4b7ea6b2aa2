//! Dashboard feeds as polling streams
//!
//! Each feed is an independent, lazy stream: nothing is fetched until it is
//! polled, and dropping it stops polling. A failed fetch is yielded as an
//! `Err` item and the stream keeps going on the next tick.

use crate::indexer::{IndexerClient, RecentTransaction, DEFAULT_TRANSACTION_LIMIT};
use crate::price::{PriceFeed, PriceHistory};
use eyre::Result;
use futures::stream::{self, Stream};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Refresh period of the price chart
pub const PRICE_REFRESH: Duration = Duration::from_secs(30);

/// Refresh period of the recent transactions list
pub const TRANSACTIONS_REFRESH: Duration = Duration::from_secs(15);

/// Call `fetch` once per `period`, starting immediately on first poll
pub fn poll_every<T, F, Fut>(period: Duration, fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::unfold(
        (None::<Interval>, fetch),
        move |(interval, mut fetch)| async move {
            // Built on first poll so an unpolled stream holds no timer
            let mut interval = interval.unwrap_or_else(|| {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });
            interval.tick().await;

            let item = fetch().await;
            if let Err(e) = &item {
                tracing::warn!("Dashboard refresh failed: {}", e);
            }
            Some((item, (Some(interval), fetch)))
        },
    )
}

/// ALGO price history, refreshed every `period`
pub fn price_snapshots(feed: PriceFeed, period: Duration) -> impl Stream<Item = Result<PriceHistory>> {
    poll_every(period, move || {
        let feed = feed.clone();
        async move { feed.fetch_history().await }
    })
}

/// Latest network transactions, refreshed every `period`
pub fn transaction_snapshots(
    indexer: IndexerClient,
    period: Duration,
) -> impl Stream<Item = Result<Vec<RecentTransaction>>> {
    poll_every(period, move || {
        let indexer = indexer.clone();
        async move { indexer.recent_transactions(DEFAULT_TRANSACTION_LIMIT).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<usize>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                std::future::ready(Err(eyre::eyre!("indexer unavailable")))
            } else {
                std::future::ready(Ok(n))
            }
        }
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stream = poll_every(Duration::from_millis(5), counting(calls.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        drop(stream);
    }

    #[tokio::test]
    async fn test_errors_do_not_end_stream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items: Vec<Result<usize>> = poll_every(Duration::from_millis(5), counting(calls.clone()))
            .take(3)
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        tokio_test::assert_ok!(&items[0]);
        tokio_test::assert_err!(&items[1]);
        assert_eq!(*items[2].as_ref().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_feeds_are_independent() {
        let fast = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(AtomicUsize::new(0));
        let mut fast_stream = Box::pin(poll_every(Duration::from_millis(1), counting(fast.clone())));
        let _slow_stream = poll_every(Duration::from_millis(1), counting(slow.clone()));

        for _ in 0..4 {
            fast_stream.next().await;
        }
        assert_eq!(fast.load(Ordering::SeqCst), 4);
        assert_eq!(slow.load(Ordering::SeqCst), 0);
    }
}
