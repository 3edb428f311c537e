// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Queued writes applied in one all-or-nothing transaction.

use super::{check_writable, coerce_value, unchanged, ParameterOp, ParameterStrategy, StrategyKind};
use bimsync_core::{resolve_handle, AttributeValue, Document, ElementRef, Error, Result, Transaction};

/// Collects writes and replays them in enqueue order inside a single
/// transaction. Any failing write rolls the whole batch back.
#[derive(Debug, Clone)]
pub struct BatchStrategy {
    queue: Vec<ParameterOp>,
    transaction_name: String,
}

impl BatchStrategy {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            transaction_name: "Batch parameter update".into(),
        }
    }

    pub fn with_transaction_name(mut self, name: impl Into<String>) -> Self {
        self.transaction_name = name.into();
        self
    }

    /// Queue a write. Nothing touches the document until [`execute`](Self::execute).
    pub fn add(&mut self, element: &ElementRef, name: &str, value: impl Into<AttributeValue>) {
        self.queue
            .push(ParameterOp::new(element.clone(), name, value));
    }

    pub fn queued(&self) -> &[ParameterOp] {
        &self.queue
    }

    /// Apply every queued write and commit once.
    ///
    /// Returns the number of writes that changed the document. On failure
    /// the transaction is rolled back and the error carries the failing
    /// write's queue position. The queue is empty afterwards either way.
    pub fn execute(&mut self, doc: &mut dyn Document) -> Result<usize> {
        let ops = std::mem::take(&mut self.queue);
        if ops.is_empty() {
            return Ok(0);
        }

        let total = ops.len();
        let mut tx = Transaction::start(doc, &self.transaction_name)?;
        let mut applied = 0;
        for (position, op) in ops.into_iter().enumerate() {
            let changed = apply(tx.document(), op).map_err(|source| Error::BatchAborted {
                position,
                source: Box::new(source),
            })?;
            if changed {
                applied += 1;
            }
        }
        tx.commit()?;

        tracing::debug!(total, applied, "Batch committed");
        Ok(applied)
    }
}

fn apply(doc: &mut dyn Document, op: ParameterOp) -> Result<bool> {
    let handle = resolve_handle(&*doc, op.target.id, &op.attribute_name)?;
    check_writable(&handle)?;
    let value = coerce_value(&handle, op.value)?;
    if unchanged(&*doc, &handle, &value) {
        return Ok(false);
    }
    doc.write_attribute(handle.owner, &handle.name, value)?;
    Ok(true)
}

impl Default for BatchStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStrategy for BatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Batch
    }

    /// Queues the write; the document only changes in `finish`.
    fn set(
        &mut self,
        _doc: &mut dyn Document,
        element: &ElementRef,
        name: &str,
        value: AttributeValue,
    ) -> Result<bool> {
        self.add(element, name, value);
        Ok(false)
    }

    fn submit(&mut self, _doc: &mut dyn Document, op: ParameterOp) -> Result<bool> {
        self.queue.push(op);
        Ok(false)
    }

    fn finish(&mut self, doc: &mut dyn Document) -> Result<usize> {
        self.execute(doc)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn discard(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(discarded = self.queue.len(), "Batch discarded");
        }
        self.queue.clear();
    }
}
