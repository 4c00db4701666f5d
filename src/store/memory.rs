//! In-process store

use super::traits::*;
use crate::policy::{ActionKind, Quota};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    connections: HashMap<String, ConnectionRecord>,
    messages: Vec<MessageRecord>,
    daily: HashMap<NaiveDate, Quota>,
    processed: HashSet<String>,
    session: Option<SessionRecord>,
}

/// Volatile [`Store`]; can be switched into a failing mode to exercise
/// persistence error handling
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<MessageRecord> {
        self.lock().map(|s| s.messages.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::persistence("store unavailable"));
        }
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Store for MemoryStore {
    fn upsert_connection(&self, record: &ConnectionRecord) -> Result<()> {
        let mut state = self.lock()?;
        match state.connections.get_mut(&record.target_id) {
            Some(existing) => {
                existing.profile_url = record.profile_url.clone();
                existing.first_name = record.first_name.clone();
                existing.last_name = record.last_name.clone();
                existing.job_title = record.job_title.clone();
                existing.company = record.company.clone();
                existing.location = record.location.clone();
                existing.note = record.note.clone();
                existing.status = record.status;
            }
            None => {
                state
                    .connections
                    .insert(record.target_id.clone(), record.clone());
            }
        }
        Ok(())
    }

    fn update_connection_status(
        &self,
        target_id: &str,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(match state.connections.get_mut(target_id) {
            Some(existing) => {
                existing.status = status;
                if status == ConnectionStatus::Accepted {
                    existing.accepted_at = Some(at);
                }
                true
            }
            None => false,
        })
    }

    fn get_connection(&self, target_id: &str) -> Result<Option<ConnectionRecord>> {
        Ok(self.lock()?.connections.get(target_id).cloned())
    }

    fn list_connections(&self, status: Option<ConnectionStatus>) -> Result<Vec<ConnectionRecord>> {
        let state = self.lock()?;
        let mut list: Vec<ConnectionRecord> = state
            .connections
            .values()
            .filter(|c| status.map(|s| c.status == s).unwrap_or(true))
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        Ok(list)
    }

    fn record_message(&self, record: &MessageRecord) -> Result<()> {
        self.lock()?.messages.push(record.clone());
        Ok(())
    }

    fn has_message_for(&self, connection_id: Uuid) -> Result<bool> {
        Ok(self
            .lock()?
            .messages
            .iter()
            .any(|m| m.connection_id == connection_id))
    }

    fn daily_counters(&self, date: NaiveDate) -> Result<Quota> {
        Ok(self
            .lock()?
            .daily
            .get(&date)
            .cloned()
            .unwrap_or_else(|| Quota::new(date)))
    }

    fn increment_counter(&self, date: NaiveDate, kind: ActionKind, at: NaiveDateTime) -> Result<Quota> {
        let mut state = self.lock()?;
        let quota = state.daily.entry(date).or_insert_with(|| Quota::new(date));
        quota.record(kind, at);
        Ok(quota.clone())
    }

    fn is_target_processed(&self, target_id: &str) -> Result<bool> {
        Ok(self.lock()?.processed.contains(target_id))
    }

    fn mark_target_processed(&self, target_id: &str) -> Result<()> {
        self.lock()?.processed.insert(target_id.to_string());
        Ok(())
    }

    fn save_session(&self, session: &SessionRecord) -> Result<()> {
        self.lock()?.session = Some(session.clone());
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SessionRecord>> {
        Ok(self.lock()?.session.clone())
    }

    fn clear_session(&self) -> Result<()> {
        self.lock()?.session = None;
        Ok(())
    }
}
