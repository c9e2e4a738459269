use std::future::Future;

use futures::future::ready;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use futures::Stream;

use crate::{KeyringError, KeyringResult};

/// Lazily produced, pull-driven sequence of query results.
///
/// Once the sequence has yielded an error, every later pull yields the same
/// error; once it has ended, every later pull yields `Ok(None)`.
pub struct ResultSequence<T> {
    source: Option<BoxStream<'static, KeyringResult<T>>>,
    failure: Option<KeyringError>,
}

impl<T: Send + 'static> ResultSequence<T> {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = KeyringResult<T>> + Send + 'static,
    {
        Self {
            source: Some(stream.boxed()),
            failure: None,
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_stream(stream::iter(items.into_iter().map(Ok)))
    }

    pub fn empty() -> Self {
        Self {
            source: None,
            failure: None,
        }
    }

    pub fn failed(err: KeyringError) -> Self {
        Self {
            source: None,
            failure: Some(err),
        }
    }

    pub async fn next(&mut self) -> KeyringResult<Option<T>> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        match source.next().await {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(err)) => {
                self.source = None;
                self.failure = Some(err.clone());
                Err(err)
            }
            None => {
                self.source = None;
                Ok(None)
            }
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, KeyringResult<T>> {
        match (self.failure, self.source) {
            (Some(err), _) => stream::once(ready(Err(err))).boxed(),
            (None, Some(source)) => source,
            (None, None) => stream::empty().boxed(),
        }
    }

    /// Asynchronous per-item transform, applied in order.
    pub fn map<U, F, Fut>(self, mut transform: F) -> ResultSequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = KeyringResult<U>> + Send + 'static,
    {
        let mapped = self.into_stream().then(move |item| {
            let pending = item.map(&mut transform);
            async move {
                match pending {
                    Ok(fut) => fut.await,
                    Err(err) => Err(err),
                }
            }
        });
        ResultSequence::from_stream(mapped)
    }

    /// Transform producing zero or more items per input, flattened in order.
    pub fn flat_map<U, F, Fut>(self, transform: F) -> ResultSequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = KeyringResult<Vec<U>>> + Send + 'static,
    {
        let groups = self.map(transform).into_stream();
        ResultSequence::from_stream(
            groups
                .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
                .try_flatten(),
        )
    }

    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Self::from_stream(
            self.into_stream()
                .try_filter(move |item| ready(predicate(item))),
        )
    }

    /// Awaits `visitor` for each item before pulling the next. Stops at the
    /// first error from either the sequence or the visitor.
    pub async fn for_each_sequential<F, Fut>(mut self, mut visitor: F) -> KeyringResult<()>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = KeyringResult<()>>,
    {
        while let Some(item) = self.next().await? {
            visitor(item).await?;
        }
        Ok(())
    }

    pub async fn collect(mut self) -> KeyringResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    pub async fn first(mut self) -> KeyringResult<Option<T>> {
        self.next().await
    }

    pub async fn exists(mut self) -> KeyringResult<bool> {
        Ok(self.next().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::{stream, StreamExt};

    use super::ResultSequence;
    use crate::{KeyringError, KeyringResult};

    #[tokio::test]
    async fn ended_sequence_keeps_returning_none() -> KeyringResult<()> {
        let mut seq = ResultSequence::from_vec(vec![1, 2]);
        assert_eq!(seq.next().await?, Some(1));
        assert_eq!(seq.next().await?, Some(2));
        assert_eq!(seq.next().await?, None);
        assert_eq!(seq.next().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn failure_is_sticky() {
        let items: Vec<KeyringResult<i32>> = vec![
            Ok(1),
            Err(KeyringError::driver("lost connection")),
            Ok(3),
        ];
        let mut seq = ResultSequence::from_stream(stream::iter(items));
        assert_eq!(seq.next().await.expect("first"), Some(1));
        let first = seq.next().await.unwrap_err();
        let second = seq.next().await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert!(matches!(second, KeyringError::Driver { .. }));
    }

    #[tokio::test]
    async fn map_preserves_order_with_uneven_latency() -> KeyringResult<()> {
        let seq = ResultSequence::from_vec(vec![30_u64, 1, 10]).map(|delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(delay * 2)
        });
        assert_eq!(seq.collect().await?, vec![60, 2, 20]);
        Ok(())
    }

    #[tokio::test]
    async fn map_error_surfaces_and_latches() {
        let mut seq = ResultSequence::from_vec(vec![1, 2, 3]).map(|n| async move {
            if n == 2 {
                Err(KeyringError::codec("bad packet"))
            } else {
                Ok(n)
            }
        });
        assert_eq!(seq.next().await.expect("first"), Some(1));
        assert!(matches!(seq.next().await, Err(KeyringError::Codec { .. })));
        assert!(matches!(seq.next().await, Err(KeyringError::Codec { .. })));
    }

    #[tokio::test]
    async fn for_each_sequential_stops_on_visitor_error() {
        let visited = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visited);
        let result = ResultSequence::from_vec(vec![1, 2, 3])
            .for_each_sequential(|n| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if n == 2 {
                        Err(KeyringError::validation("stop"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(matches!(result, Err(KeyringError::Validation { .. })));
        assert_eq!(visited.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exists_pulls_a_single_item() -> KeyringResult<()> {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = stream::iter(0..100).map(move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(n)
        });
        assert!(ResultSequence::from_stream(source).exists().await?);
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
        assert!(!ResultSequence::<i32>::empty().exists().await?);
        Ok(())
    }

    #[tokio::test]
    async fn filter_and_flat_map_compose() -> KeyringResult<()> {
        let seq = ResultSequence::from_vec(vec![1, 2, 3, 4])
            .filter(|n| n % 2 == 0)
            .flat_map(|n| async move { Ok(vec![n, n * 10]) });
        assert_eq!(seq.collect().await?, vec![2, 20, 4, 40]);
        Ok(())
    }
}
