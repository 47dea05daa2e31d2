//! Run-scoped registry of resolved crypt tokens.
//!
//! A task's token may be known from several places: assigned on the command
//! line, read from the one manifest entitled to hold it, or derived on demand
//! through `rclone obscure`. The registry is the single place all of those meet,
//! keyed by task identity, with at most one value per task.

use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{McloneError, Result};
use crate::executor::Rclone;
use crate::task::types::Task;

/// Length of the password generated when the user supplies none
pub const RANDOM_PASSWORD_LEN: usize = 32;

#[derive(Default)]
pub struct CredentialRegistry {
    tokens: HashMap<String, String>,
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `token` for task `id`; a different token already on record is an error.
    pub fn register(&mut self, id: &str, token: &str) -> Result<()> {
        match self.tokens.get(id) {
            Some(known) if known == token => Ok(()),
            Some(_) => Err(McloneError::CredentialConflict {
                task: id.to_string(),
            }),
            None => {
                self.tokens.insert(id.to_string(), token.to_string());
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Token known for `task` without running anything: its own, then the registry's.
    pub fn known<'a>(&'a self, task: &'a Task) -> Option<&'a str> {
        task.crypter()
            .and_then(|c| c.token.as_deref())
            .or_else(|| self.get(task.id()))
    }

    /// Resolve the token of `task`, deriving and caching it when nothing is known yet.
    ///
    /// Returns `None` for tasks without a crypter mode.
    pub async fn resolve(&mut self, task: &Task, rclone: &Rclone) -> Result<Option<String>> {
        let Some(crypter) = task.crypter() else {
            return Ok(None);
        };
        if let Some(token) = crypter.token.as_deref() {
            self.register(task.id(), token)?;
            return Ok(Some(token.to_string()));
        }
        if let Some(token) = self.get(task.id()) {
            return Ok(Some(token.to_string()));
        }

        let password = match crypter.password.clone() {
            Some(password) => password,
            None => {
                info!("Generating random password for task {}", task.id());
                random_password()
            }
        };
        debug!("Deriving crypt token for task {}", task.id());
        let token = rclone.obscure(&password).await.map_err(|e| {
            McloneError::TokenDerivation {
                task: task.id().to_string(),
                reason: e.to_string(),
            }
        })?;
        self.register(task.id(), &token)?;
        Ok(Some(token))
    }
}

fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
