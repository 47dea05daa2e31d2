use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use tracing::warn;

use crate::error::{McloneError, Result};
use crate::identity::Identified;

/// Transfer operation performed by a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Copy, skipping files newer on the destination
    #[default]
    Update,
    /// Make the destination identical to the source
    Synchronize,
    Copy,
    /// Copy, then delete from the source
    Move,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Update, Mode::Synchronize, Mode::Copy, Mode::Move];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Update => "update",
            Mode::Synchronize => "synchronize",
            Mode::Copy => "copy",
            Mode::Move => "move",
        }
    }

    /// Resolve an unambiguous (partial) pattern such as `sy` to a mode
    pub fn resolve(pattern: &str) -> Result<Self> {
        resolve_name(&Self::ALL, Self::as_str, pattern, "mode")
    }
}

impl FromStr for Mode {
    type Err = McloneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| McloneError::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a task is stored encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrypterMode {
    /// Encrypt on the way to the destination
    Encrypt,
    /// Decrypt on the way from the source
    Decrypt,
}

impl CrypterMode {
    pub const ALL: [CrypterMode; 2] = [CrypterMode::Encrypt, CrypterMode::Decrypt];

    pub fn as_str(self) -> &'static str {
        match self {
            CrypterMode::Encrypt => "encrypt",
            CrypterMode::Decrypt => "decrypt",
        }
    }

    pub fn resolve(pattern: &str) -> Result<Self> {
        resolve_name(&Self::ALL, Self::as_str, pattern, "crypter mode")
    }
}

impl FromStr for CrypterMode {
    type Err = McloneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| McloneError::UnknownCrypterMode(s.to_string()))
    }
}

impl fmt::Display for CrypterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn resolve_name<T: Copy>(
    all: &[T],
    name: fn(T) -> &'static str,
    pattern: &str,
    kind: &'static str,
) -> Result<T> {
    let rx = Regex::new(pattern).map_err(|source| McloneError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let found: Vec<T> = all.iter().copied().filter(|x| rx.is_match(name(*x))).collect();
    match found.as_slice() {
        [] => Err(McloneError::NoMatch {
            kind,
            pattern: pattern.to_string(),
        }),
        [x] => Ok(*x),
        _ => Err(McloneError::Ambiguous {
            kind,
            pattern: pattern.to_string(),
        }),
    }
}

/// One end of a task: a volume and a path relative to its root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Endpoint {
    pub volume: String,
    /// Relative path inside the volume, `""` for the volume root
    pub root: String,
}

impl Endpoint {
    pub fn new(volume: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            root: root.into(),
        }
    }
}

/// Encryption settings attached to a task.
///
/// `token` is a locally assigned obscured credential, `password` a plain text
/// password to derive one from. Neither is ever logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Crypter {
    pub mode: CrypterMode,
    pub token: Option<String>,
    pub(crate) password: Option<String>,
}

impl Crypter {
    pub fn new(mode: CrypterMode) -> Self {
        Self {
            mode,
            token: None,
            password: None,
        }
    }
}

impl fmt::Debug for Crypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crypter")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// User-supplied settings for a new task
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    pub mode: Mode,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub crypter_mode: Option<CrypterMode>,
    pub password: Option<String>,
    pub token: Option<String>,
}

/// Changes applied by [`Task::modified`]; `None` keeps the current value and an
/// empty filter clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub mode: Option<Mode>,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

/// Equality key of a task: both volumes and both roots
pub type TaskKey = (String, String, String, String);

/// A directional sync definition between two volumes.
///
/// Identity ([`Task::id`]) and equality are independent: two tasks are equal
/// when their endpoints match, whatever their identities or timestamps.
#[derive(Debug, Clone)]
pub struct Task {
    pub(crate) id: String,
    pub(crate) source: Endpoint,
    pub(crate) destination: Endpoint,
    pub(crate) mode: Mode,
    pub(crate) include: Option<String>,
    pub(crate) exclude: Option<String>,
    pub(crate) mtime: DateTime<Utc>,
    pub(crate) crypter: Option<Crypter>,
}

impl Task {
    pub fn new(source: Endpoint, destination: Endpoint, options: TaskOptions) -> Result<Self> {
        if options.password.is_some() && options.token.is_some() {
            return Err(McloneError::ConflictingCredentialInput);
        }
        let crypter = match options.crypter_mode {
            Some(mode) => Some(Crypter {
                mode,
                token: normalize(options.token),
                password: normalize(options.password),
            }),
            None => {
                if options.password.is_some() || options.token.is_some() {
                    warn!("Ignoring credential given for a task without crypter mode");
                }
                None
            }
        };
        Ok(Self {
            id: new_id(),
            source,
            destination,
            mode: options.mode,
            include: normalize(options.include),
            exclude: normalize(options.exclude),
            mtime: Utc::now(),
            crypter,
        })
    }

    /// Copy of `self` with `changes` applied and a refreshed timestamp.
    ///
    /// The identity is kept, so the copy replaces `self` on re-insertion.
    pub fn modified(&self, changes: TaskChanges) -> Self {
        let mut task = self.clone();
        if let Some(mode) = changes.mode {
            task.mode = mode;
        }
        if let Some(include) = changes.include {
            task.include = normalize(Some(include));
        }
        if let Some(exclude) = changes.exclude {
            task.exclude = normalize(Some(exclude));
        }
        task.touch();
        task
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn include(&self) -> Option<&str> {
        self.include.as_deref()
    }

    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_deref()
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn crypter(&self) -> Option<&Crypter> {
        self.crypter.as_ref()
    }

    pub fn crypter_mode(&self) -> Option<CrypterMode> {
        self.crypter.as_ref().map(|c| c.mode)
    }

    /// Whether `volume` references this task as source or destination
    pub fn references(&self, volume: &str) -> bool {
        self.source.volume == volume || self.destination.volume == volume
    }

    /// The only volume allowed to persist this task's credential
    pub fn credential_holder(&self) -> Option<&str> {
        self.crypter.as_ref().map(|c| match c.mode {
            CrypterMode::Encrypt => self.source.volume.as_str(),
            CrypterMode::Decrypt => self.destination.volume.as_str(),
        })
    }

    /// Advance the timestamp, strictly past the previous one
    fn touch(&mut self) {
        self.mtime = Utc::now().max(self.mtime + Duration::nanoseconds(1));
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Identified for Task {
    type Key = TaskKey;
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> TaskKey {
        (
            self.source.volume.clone(),
            self.destination.volume.clone(),
            self.source.root.clone(),
            self.destination.root.clone(),
        )
    }

    /// Last write wins
    fn supersedes(&self, current: &Self) -> bool {
        self.mtime > current.mtime
    }
}

/// Fresh random identity for a task or volume
pub fn new_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

pub(crate) fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
