// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-assignment result cell with external resolve/reject.
//!
//! [`deferred`] builds both halves at once: a cloneable [`Resolver`] that any
//! number of completion sources may hold, and the [`DeferredResult`] future
//! handed to the waiting caller. The first `resolve`/`reject` wins; every
//! later attempt returns `false` and does nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::FlowError;

type Slot<T> = Arc<Mutex<Option<oneshot::Sender<Result<T, FlowError>>>>>;

/// Create a linked resolver/result pair.
pub fn deferred<T>() -> (Resolver<T>, DeferredResult<T>) {
    let (tx, rx) = oneshot::channel();
    (Resolver { slot: Arc::new(Mutex::new(Some(tx))) }, DeferredResult { rx })
}

/// Write side of a deferred result.
pub struct Resolver<T> {
    slot: Slot<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> std::fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("settled", &self.is_settled()).finish()
    }
}

impl<T> Resolver<T> {
    /// Settle with a value. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with an error. Returns `false` if already settled.
    pub fn reject(&self, err: FlowError) -> bool {
        self.settle(Err(err))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn settle(&self, result: Result<T, FlowError>) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            return false;
        };
        // The waiter may have gone away; the cell is settled either way.
        let _ = tx.send(result);
        true
    }
}

/// Read side of a deferred result. Resolves to
/// [`FlowError::Abandoned`] if every resolver is dropped unsettled.
#[derive(Debug)]
pub struct DeferredResult<T> {
    rx: oneshot::Receiver<Result<T, FlowError>>,
}

impl<T> Future for DeferredResult<T> {
    type Output = Result<T, FlowError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(FlowError::Abandoned),
        })
    }
}

#[cfg(test)]
#[path = "deferred_tests.rs"]
mod tests;
