//! In-process store
//!
//! Interprets the five gateway statements against a row vector. Rows keep
//! insertion order and, like the SQL table, nothing enforces a unique `cedula`.

use super::{PersonaStore, Statement, StoreError, StoreResult};
use crate::capability::Capability;
use crate::model::{Persona, PersonaUpdate};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Persona>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing rows
    pub fn with_rows(rows: Vec<Persona>) -> Self {
        Self {
            rows: RwLock::new(rows),
            closed: AtomicBool::new(false),
        }
    }

    /// Copy of the current rows
    pub fn snapshot(&self) -> Vec<Persona> {
        self.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn unsupported(statement: &Statement) -> StoreError {
    StoreError::QueryFailed(format!(
        "statement for {} not supported here: {}",
        statement.capability, statement.sql
    ))
}

#[async_trait]
impl PersonaStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        self.ensure_open()?;
        match statement.capability {
            Capability::Create => {
                let persona = Persona {
                    id: statement.int(0)?,
                    national_id: statement.text(1)?.to_string(),
                    given_names: statement.text(2)?.to_string(),
                    surnames: statement.text(3)?.to_string(),
                    date_of_birth: statement.date(4)?,
                    phone: statement.text(5)?.to_string(),
                    address: statement.text(6)?.to_string(),
                };
                self.rows.write().push(persona);
                Ok(1)
            }
            Capability::Update => {
                let update = PersonaUpdate {
                    given_names: statement.text(0)?.to_string(),
                    surnames: statement.text(1)?.to_string(),
                    date_of_birth: statement.date(2)?,
                    phone: statement.text(3)?.to_string(),
                    address: statement.text(4)?.to_string(),
                    national_id: statement.text(5)?.to_string(),
                };
                let mut rows = self.rows.write();
                let mut affected = 0;
                for row in rows.iter_mut().filter(|r| r.national_id == update.national_id) {
                    update.apply_to(row);
                    affected += 1;
                }
                Ok(affected)
            }
            Capability::Delete => {
                let key = statement.text(0)?;
                let mut rows = self.rows.write();
                let before = rows.len();
                rows.retain(|r| r.national_id != key);
                Ok((before - rows.len()) as u64)
            }
            Capability::LookupByKey | Capability::SearchWithAge => Err(unsupported(statement)),
        }
    }

    async fn query(&self, statement: &Statement) -> StoreResult<Vec<Persona>> {
        self.ensure_open()?;
        let rows = self.rows.read();
        match statement.capability {
            Capability::LookupByKey => {
                let key = statement.text(0)?;
                Ok(rows.iter().filter(|r| r.national_id == key).cloned().collect())
            }
            Capability::SearchWithAge => {
                let key = statement.text(0)?;
                let birth = statement.date(1)?;
                Ok(rows
                    .iter()
                    .filter(|r| r.national_id == key && r.date_of_birth == birth)
                    .cloned()
                    .collect())
            }
            Capability::Create | Capability::Update | Capability::Delete => {
                Err(unsupported(statement))
            }
        }
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
