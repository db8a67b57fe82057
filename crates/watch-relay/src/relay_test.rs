//! Unit tests for the watch relay control loop

#[cfg(test)]
mod tests {
    use crate::mock::{MockSubscriptionFactory, Notification, RecordingObserver, Script};
    use crate::{CloseReason, FibonacciBackoff, RelayError, Selector, WatchRelay};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Waits until the factory has been asked to open `count` subscriptions.
    async fn wait_for_opens<E>(factory: &MockSubscriptionFactory<E>, count: usize) {
        timeout(TEST_TIMEOUT, async {
            while factory.open_count() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("factory never reached the expected open count");
    }

    #[tokio::test]
    async fn test_events_forwarded_in_order() {
        let events: Vec<u32> = (0..50).collect();
        let factory = MockSubscriptionFactory::new([Script::EventsThenHang(events.clone())]);
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Pod", factory).spawn(Selector::all(), tx, cancel.clone());

        let mut received = Vec::new();
        while received.len() < events.len() {
            let event = timeout(TEST_TIMEOUT, rx.recv()).await.unwrap().unwrap();
            received.push(event);
        }
        assert_eq!(received, events);

        cancel.cancel();
        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert!(rx.recv().await.is_none(), "no events after cancellation");
    }

    #[tokio::test]
    async fn test_reconnect_across_subscriptions() {
        // S1 yields [A, B] then closes, S2 yields [C], then cancellation fires
        let factory = MockSubscriptionFactory::new([
            Script::Events(vec!["A", "B"]),
            Script::EventsThenHang(vec!["C"]),
        ]);
        let observer = RecordingObserver::new();
        let selector = Selector::local_node("worker-1");
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Pod", factory.clone())
            .with_observer(Arc::new(observer.clone()))
            .spawn(selector.clone(), tx, cancel.clone());

        for expected in ["A", "B", "C"] {
            let event = timeout(TEST_TIMEOUT, rx.recv()).await.unwrap();
            assert_eq!(event, Some(expected));
        }

        cancel.cancel();
        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, None);

        assert_eq!(factory.selectors(), vec![selector.clone(), selector.clone()]);
        assert_eq!(
            observer.notifications(),
            vec![
                Notification::Closed("Pod".to_string(), CloseReason::Ended),
                Notification::Reconnect("Pod".to_string(), selector, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_subscription_reopens_with_same_selector() {
        let factory = MockSubscriptionFactory::<u32>::new([
            Script::Events(vec![]),
            Script::Events(vec![]),
            Script::EventsThenHang(vec![]),
        ]);
        let selector = Selector::namespace("kube-system");
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Namespace", factory.clone()).spawn(
            selector.clone(),
            tx,
            cancel.clone(),
        );

        wait_for_opens(&factory, 3).await;
        cancel.cancel();
        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());

        let selectors = factory.selectors();
        assert_eq!(selectors.len(), 3);
        assert!(selectors.iter().all(|s| *s == selector));
    }

    #[tokio::test]
    async fn test_open_error_is_fatal() {
        let factory =
            MockSubscriptionFactory::<u32>::new([Script::OpenError("connection refused".to_string())]);
        let (tx, mut rx) = mpsc::channel(1);

        let result = timeout(
            TEST_TIMEOUT,
            WatchRelay::new("NetworkPolicy", factory.clone()).run(
                Selector::all(),
                tx,
                CancellationToken::new(),
            ),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::Open { .. }));
        let message = err.to_string();
        assert!(message.contains("NetworkPolicy"), "{message}");
        assert!(message.contains("connection refused"), "{message}");

        assert_eq!(factory.open_count(), 1, "failed open is never retried");
        assert!(rx.recv().await.is_none(), "sink untouched");
    }

    #[tokio::test]
    async fn test_open_error_after_reconnect_is_fatal() {
        let factory = MockSubscriptionFactory::new([
            Script::Events(vec![1, 2]),
            Script::OpenError("forbidden".to_string()),
        ]);
        let (tx, mut rx) = mpsc::channel(4);

        let result = timeout(
            TEST_TIMEOUT,
            WatchRelay::new("Pod", factory).run(Selector::all(), tx, CancellationToken::new()),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(RelayError::Open { .. })));
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancel_before_first_open() {
        let factory = MockSubscriptionFactory::<u32>::new([Script::HangOnOpen]);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = timeout(
            TEST_TIMEOUT,
            WatchRelay::new("Pod", factory).run(Selector::all(), tx, cancel),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_while_opening() {
        let factory = MockSubscriptionFactory::<u32>::new([Script::HangOnOpen]);
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle =
            WatchRelay::new("Pod", factory.clone()).spawn(Selector::all(), tx, cancel.clone());
        wait_for_opens(&factory, 1).await;

        cancel.cancel();
        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_wins_over_buffered_events() {
        let (upstream, upstream_rx) = mpsc::unbounded_channel();
        let factory = MockSubscriptionFactory::new([Script::Channel(upstream_rx)]);
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Pod", factory).spawn(Selector::all(), tx, cancel.clone());

        upstream.send("A").unwrap();
        upstream.send("B").unwrap();
        assert_eq!(timeout(TEST_TIMEOUT, rx.recv()).await.unwrap(), Some("A"));
        assert_eq!(timeout(TEST_TIMEOUT, rx.recv()).await.unwrap(), Some("B"));

        // Both conditions are ready when the relay next runs
        upstream.send("C").unwrap();
        cancel.cancel();

        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, None, "C must not be forwarded");
    }

    #[tokio::test]
    async fn test_failed_close_is_recoverable() {
        let factory = MockSubscriptionFactory::new([
            Script::EventsThenFail(vec![1], "connection reset".to_string()),
            Script::EventsThenHang(vec![2]),
        ]);
        let observer = RecordingObserver::new();
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Pod", factory)
            .with_observer(Arc::new(observer.clone()))
            .spawn(Selector::all(), tx, cancel.clone());

        assert_eq!(timeout(TEST_TIMEOUT, rx.recv()).await.unwrap(), Some(1));
        assert_eq!(timeout(TEST_TIMEOUT, rx.recv()).await.unwrap(), Some(2));

        cancel.cancel();
        assert!(timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap().is_ok());
        assert_eq!(
            observer.notifications()[0],
            Notification::Closed(
                "Pod".to_string(),
                CloseReason::Failed("connection reset".to_string())
            )
        );
    }

    #[tokio::test]
    async fn test_dropped_sink_stops_relay() {
        let factory = MockSubscriptionFactory::new([Script::EventsThenHang(vec![1])]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = timeout(
            TEST_TIMEOUT,
            WatchRelay::new("Pod", factory).run(Selector::all(), tx, CancellationToken::new()),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(RelayError::SinkClosed { .. })));
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_delay() {
        let factory = MockSubscriptionFactory::<u32>::new([Script::Events(vec![])]);
        let observer = RecordingObserver::new();
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = WatchRelay::new("Pod", factory.clone())
            .with_observer(Arc::new(observer.clone()))
            .with_reconnect_policy(FibonacciBackoff::new(
                Duration::from_secs(60),
                Duration::from_secs(600),
            ))
            .spawn(Selector::all(), tx, cancel.clone());

        timeout(TEST_TIMEOUT, async {
            while observer.notifications().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        let result = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert_eq!(factory.open_count(), 1, "no reopen while backing off");
    }
}
