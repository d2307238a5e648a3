use thiserror::Error;

use crate::{EpochMillis, PromptId, PromptItem, PromptStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown prompt id {0}")]
    UnknownPrompt(PromptId),
    #[error("prompt {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: PromptId,
        from: PromptStatus,
        to: PromptStatus,
    },
    #[error("prompt ids must be strictly increasing (saw {id} after {previous})")]
    NonIncreasingIds { previous: PromptId, id: PromptId },
    #[error("prompt {0} has empty text")]
    EmptyText(PromptId),
    #[error("prompt id {0} was already used in this session")]
    RetiredId(PromptId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptStats {
    pub total: usize,
    pub pending: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PromptStats {
    pub fn terminal(&self) -> usize {
        self.completed + self.failed
    }
}

/// Ordered prompt collection. Ordering by id equals insertion order, and
/// ids are never handed out twice, even across `clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRegistry {
    items: Vec<PromptItem>,
    next_id: PromptId,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Loads previously created items. `next_id` is the persisted high-water
    /// mark; it is raised if the items already use higher ids.
    pub fn from_items(items: Vec<PromptItem>, next_id: PromptId) -> Result<Self, RegistryError> {
        let mut previous: Option<PromptId> = None;
        for item in &items {
            if let Some(previous) = previous {
                if item.id <= previous {
                    return Err(RegistryError::NonIncreasingIds {
                        previous,
                        id: item.id,
                    });
                }
            }
            if item.id == 0 {
                return Err(RegistryError::NonIncreasingIds {
                    previous: 0,
                    id: 0,
                });
            }
            if item.text.trim().is_empty() {
                return Err(RegistryError::EmptyText(item.id));
            }
            previous = Some(item.id);
        }
        let floor = previous.map_or(1, |max| max + 1);
        Ok(Self {
            items,
            next_id: next_id.max(floor),
        })
    }

    /// Builds the registry that replaces this one when the UI hands over an
    /// edited list. Known ids keep their recorded status, error and
    /// timestamps and take only their text from `incoming`. Unknown ids must
    /// be at or above `next_id`. An unknown item that arrives already
    /// submitted is timed from `now`.
    pub fn reconcile(
        &self,
        incoming: Vec<PromptItem>,
        now: EpochMillis,
    ) -> Result<Self, RegistryError> {
        let mut items = Vec::with_capacity(incoming.len());
        for item in incoming {
            let item = match self.find(item.id) {
                Some(known) => PromptItem {
                    text: item.text,
                    ..known.clone()
                },
                None if item.id < self.next_id => return Err(RegistryError::RetiredId(item.id)),
                None if item.status == PromptStatus::Submitted && item.submitted_at.is_none() => {
                    PromptItem {
                        submitted_at: Some(now),
                        ..item
                    }
                }
                None => item,
            };
            items.push(item);
        }
        Self::from_items(items, self.next_id)
    }

    /// Appends new pending items; blank texts are skipped.
    pub fn append<I, S>(&mut self, texts: I, now: EpochMillis) -> Vec<PromptItem>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for text in texts {
            let text = text.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            let item = PromptItem::new(self.next_id, text.to_owned(), now);
            self.next_id += 1;
            added.push(item.clone());
            self.items.push(item);
        }
        added
    }

    pub fn find(&self, id: PromptId) -> Option<&PromptItem> {
        self.position(id).map(|pos| &self.items[pos])
    }

    pub fn position(&self, id: PromptId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |item| item.id).ok()
    }

    pub fn set_status(
        &mut self,
        id: PromptId,
        status: PromptStatus,
        error: Option<String>,
        now: EpochMillis,
    ) -> Result<(), RegistryError> {
        let pos = self.position(id).ok_or(RegistryError::UnknownPrompt(id))?;
        let item = &mut self.items[pos];
        if !item.status.can_advance_to(status) {
            return Err(RegistryError::InvalidTransition {
                id,
                from: item.status,
                to: status,
            });
        }
        item.status = status;
        match status {
            PromptStatus::Submitted => item.submitted_at = Some(now),
            PromptStatus::Failed => {
                item.error = Some(error.unwrap_or_else(|| "unknown error".to_string()))
            }
            PromptStatus::Pending | PromptStatus::Completed => {}
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Puts every item back to `Pending`, dropping recorded errors.
    pub fn reset_statuses(&mut self) {
        for item in &mut self.items {
            item.status = PromptStatus::Pending;
            item.error = None;
            item.submitted_at = None;
        }
    }

    pub fn stats(&self) -> PromptStats {
        let mut stats = PromptStats {
            total: self.items.len(),
            ..PromptStats::default()
        };
        for item in &self.items {
            match item.status {
                PromptStatus::Pending => stats.pending += 1,
                PromptStatus::Submitted => stats.submitted += 1,
                PromptStatus::Completed => stats.completed += 1,
                PromptStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn all_terminal(&self) -> bool {
        self.items.iter().all(|item| item.status.is_terminal())
    }

    pub fn items(&self) -> &[PromptItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn next_id(&self) -> PromptId {
        self.next_id
    }
}
