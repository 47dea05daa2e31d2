//! Manifest representation of a task.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::task::credential::CredentialRegistry;
use crate::task::types::{Crypter, CrypterMode, Endpoint, Mode, Task, normalize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub volume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrypterRecord {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// One entry of a manifest's `tasks` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: String,
    pub mode: String,
    #[serde(default)]
    pub mtime: Option<String>,
    pub source: EndpointRecord,
    pub destination: EndpointRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypter: Option<CrypterRecord>,
}

impl Task {
    /// Rebuild a task from its manifest record, keeping the stored identity and
    /// timestamp. An unreadable timestamp is replaced by the current time.
    pub fn restore(record: TaskRecord) -> Result<Self> {
        let mode: Mode = record.mode.parse()?;
        let crypter = match record.crypter {
            Some(c) => Some(Crypter {
                mode: c.mode.parse::<CrypterMode>()?,
                token: normalize(c.token),
                password: None,
            }),
            None => None,
        };
        let mtime = match record.mtime.as_deref().map(DateTime::parse_from_rfc3339) {
            Some(Ok(mtime)) => mtime.with_timezone(&Utc),
            _ => {
                warn!(
                    "Task {} has unreadable timestamp {:?}, using current time",
                    record.task, record.mtime
                );
                Utc::now()
            }
        };
        Ok(Self {
            id: record.task,
            source: Endpoint::from(record.source),
            destination: Endpoint::from(record.destination),
            mode,
            include: normalize(record.include),
            exclude: normalize(record.exclude),
            mtime,
            crypter,
        })
    }

    /// Manifest record of this task as persisted on `volume`.
    ///
    /// The crypt token is included only when `volume` is the credential holder:
    /// the source of an encrypting task or the destination of a decrypting one.
    pub fn to_record(&self, volume: &str, credentials: &CredentialRegistry) -> TaskRecord {
        let crypter = self.crypter().map(|c| CrypterRecord {
            mode: c.mode.to_string(),
            token: if self.credential_holder() == Some(volume) {
                credentials.known(self).map(str::to_string)
            } else {
                None
            },
        });
        TaskRecord {
            task: self.id.clone(),
            mode: self.mode.to_string(),
            mtime: Some(self.mtime.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            source: EndpointRecord::from(&self.source),
            destination: EndpointRecord::from(&self.destination),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            crypter,
        }
    }
}

impl From<EndpointRecord> for Endpoint {
    fn from(record: EndpointRecord) -> Self {
        Endpoint::new(record.volume, record.root.unwrap_or_default())
    }
}

impl From<&Endpoint> for EndpointRecord {
    fn from(endpoint: &Endpoint) -> Self {
        EndpointRecord {
            volume: endpoint.volume.clone(),
            root: Some(endpoint.root.clone()).filter(|root| !root.is_empty()),
        }
    }
}
