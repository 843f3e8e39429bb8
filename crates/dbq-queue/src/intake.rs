// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unbounded multi-producer, single-consumer intake queue.
//!
//! Backed by tokio's unbounded MPSC channel: enqueue is a lock-free push
//! that never blocks, and only the drain worker holds the receiving half.

use dbq_core::CommandExecutor;
use tokio::sync::mpsc;

use crate::descriptor::CommandDescriptor;

/// Creates a connected producer/consumer pair.
pub fn intake_queue<X: CommandExecutor>() -> (IntakeQueue<X>, IntakeReceiver<X>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IntakeQueue { tx }, IntakeReceiver { rx })
}

/// Producer half. Cloneable; safe to use from any number of threads.
pub struct IntakeQueue<X: CommandExecutor> {
    tx: mpsc::UnboundedSender<CommandDescriptor<X>>,
}

impl<X: CommandExecutor> Clone for IntakeQueue<X> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<X: CommandExecutor> IntakeQueue<X> {
    /// Pushes a descriptor without blocking.
    ///
    /// Hands the descriptor back if the consumer has closed the queue.
    #[allow(clippy::result_large_err)]
    pub fn enqueue(&self, descriptor: CommandDescriptor<X>) -> Result<(), CommandDescriptor<X>> {
        self.tx.send(descriptor).map_err(|rejected| rejected.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the drain worker.
pub struct IntakeReceiver<X: CommandExecutor> {
    rx: mpsc::UnboundedReceiver<CommandDescriptor<X>>,
}

impl<X: CommandExecutor> IntakeReceiver<X> {
    /// Pops the next descriptor if one is ready. Never blocks.
    pub fn try_dequeue(&mut self) -> Option<CommandDescriptor<X>> {
        self.rx.try_recv().ok()
    }

    /// Rejects all further enqueues. Descriptors already accepted stay
    /// available to [`IntakeReceiver::dequeue_closed`].
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Pops the next descriptor of a closed queue, waiting only for pushes
    /// that were accepted before the close but are still being written.
    ///
    /// Returns `None` once the closed queue is empty. Must not be called
    /// from inside an async context.
    pub fn dequeue_closed(&mut self) -> Option<CommandDescriptor<X>> {
        self.rx.blocking_recv()
    }
}
