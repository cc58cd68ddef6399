/// Upload staging area
///
/// A file is uploaded before the form that publishes it is submitted. The
/// bytes wait here, keyed by a single-use [`StagingHandle`], until a publish
/// call takes them. Each handle is bound to the member who staged it and to
/// one publish kind; a member holds at most one staged file per kind, and
/// staging a new file replaces (and invalidates) the previous handle.
///
/// Entries older than the configured TTL are purged whenever a new file is
/// staged, and are treated as absent when taken.
///
/// The map is guarded by a synchronous mutex that is never held across an
/// `.await`.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use conatoc_shared::auth::authorization::Actor;
/// use conatoc_shared::models::user::Role;
/// use conatoc_shared::staging::{UploadKind, UploadStaging};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let staging = UploadStaging::new(10 * 1024 * 1024, std::time::Duration::from_secs(3600));
/// let actor = Actor::member(1, Role::Researcher);
///
/// let handle = staging.stage(&actor, UploadKind::Paper, Bytes::from_static(b"%PDF"), "a.pdf")?;
/// let file = staging.take(&actor, UploadKind::Paper, &handle)?;
/// assert_eq!(file.file_name.as_deref(), Some("a.pdf"));
///
/// // Handles are single use
/// assert!(staging.take(&actor, UploadKind::Paper, &handle).is_err());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::Actor;
use crate::error::{PortalError, PortalResult};

/// What a staged file will be published as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Paper,
    Dataset,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Paper => "paper",
            UploadKind::Dataset => "dataset",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque single-use reference to a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingHandle(Uuid);

impl StagingHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StagingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for StagingHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A staged file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Client-supplied file name, if any
    pub file_name: Option<String>,

    /// Raw bytes
    pub bytes: Bytes,
}

impl StagedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug)]
struct Entry {
    owner: i64,
    kind: UploadKind,
    file: StagedFile,
    staged_at: Instant,
}

#[derive(Debug)]
struct Inner {
    entries: Mutex<HashMap<StagingHandle, Entry>>,
    max_bytes: usize,
    ttl: Duration,
}

/// Shared staging area; clones refer to the same map
#[derive(Debug, Clone)]
pub struct UploadStaging {
    inner: Arc<Inner>,
}

impl UploadStaging {
    /// Creates an empty staging area
    pub fn new(max_bytes: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                max_bytes,
                ttl,
            }),
        }
    }

    /// Largest accepted upload, in bytes
    pub fn max_bytes(&self) -> usize {
        self.inner.max_bytes
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<StagingHandle, Entry>> {
        // The map stays consistent even if a holder panicked
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stages a file for the actor's next publish of `kind`
    ///
    /// # Errors
    ///
    /// - `LoginRequired` for anonymous actors
    /// - `PayloadTooLarge` when the bytes exceed the cap; nothing is staged
    pub fn stage(
        &self,
        actor: &Actor,
        kind: UploadKind,
        bytes: Bytes,
        file_name: &str,
    ) -> PortalResult<StagingHandle> {
        let (owner, _) = actor.require_member()?;

        if bytes.len() > self.inner.max_bytes {
            return Err(PortalError::PayloadTooLarge {
                size: bytes.len(),
                max: self.inner.max_bytes,
            });
        }

        let file_name = file_name.trim();
        let file = StagedFile {
            file_name: (!file_name.is_empty()).then(|| file_name.to_string()),
            bytes,
        };
        let size = file.len();
        let handle = StagingHandle::new();
        let now = Instant::now();

        let mut entries = self.entries();
        let ttl = self.inner.ttl;
        let before = entries.len();
        entries.retain(|_, entry| {
            now.duration_since(entry.staged_at) < ttl
                && !(entry.owner == owner && entry.kind == kind)
        });
        let dropped = before - entries.len();

        entries.insert(
            handle,
            Entry {
                owner,
                kind,
                file,
                staged_at: now,
            },
        );
        drop(entries);

        if dropped > 0 {
            debug!(dropped, "Discarded expired or replaced staged uploads");
        }
        info!(owner, %kind, size, %handle, "Staged upload");

        Ok(handle)
    }

    /// Removes and returns a staged file
    ///
    /// The handle is consumed, so a second take fails.
    ///
    /// # Errors
    ///
    /// - `LoginRequired` for anonymous actors
    /// - `NotFound` when the handle is unknown, expired, owned by another
    ///   member, or staged for the other kind
    pub fn take(
        &self,
        actor: &Actor,
        kind: UploadKind,
        handle: &StagingHandle,
    ) -> PortalResult<StagedFile> {
        let (owner, _) = actor.require_member()?;
        let mut entries = self.entries();

        let (usable, expired) = match entries.get(handle) {
            Some(entry) => (
                entry.owner == owner && entry.kind == kind,
                entry.staged_at.elapsed() >= self.inner.ttl,
            ),
            None => (false, false),
        };

        if expired {
            entries.remove(handle);
        }

        if !usable || expired {
            return Err(PortalError::NotFound("Staged upload"));
        }

        entries
            .remove(handle)
            .map(|entry| entry.file)
            .ok_or(PortalError::NotFound("Staged upload"))
    }

    /// Puts a taken file back under its handle after a failed publish
    ///
    /// Does nothing if the member has staged a newer file of the same kind in
    /// the meantime.
    pub fn restore(&self, owner: i64, kind: UploadKind, handle: StagingHandle, file: StagedFile) {
        let mut entries = self.entries();

        if entries
            .values()
            .any(|entry| entry.owner == owner && entry.kind == kind)
        {
            debug!(owner, %kind, %handle, "Newer upload staged; not restoring");
            return;
        }

        entries.insert(
            handle,
            Entry {
                owner,
                kind,
                file,
                staged_at: Instant::now(),
            },
        );
        debug!(owner, %kind, %handle, "Restored staged upload");
    }

    /// Number of staged files, expired ones included until the next purge
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    const HOUR: Duration = Duration::from_secs(3600);

    fn pdf(len: usize) -> Bytes {
        Bytes::from(vec![b'%'; len])
    }

    #[test]
    fn test_stage_and_take() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(1, Role::Patient);

        let handle = staging.stage(&actor, UploadKind::Paper, pdf(10), " notes.pdf ").unwrap();
        assert_eq!(staging.len(), 1);

        let file = staging.take(&actor, UploadKind::Paper, &handle).unwrap();
        assert_eq!(file.file_name.as_deref(), Some("notes.pdf"));
        assert_eq!(file.len(), 10);
        assert!(staging.is_empty());
    }

    #[test]
    fn test_handle_is_single_use() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(1, Role::Patient);

        let handle = staging.stage(&actor, UploadKind::Paper, pdf(10), "a.pdf").unwrap();
        staging.take(&actor, UploadKind::Paper, &handle).unwrap();

        assert!(matches!(
            staging.take(&actor, UploadKind::Paper, &handle),
            Err(PortalError::NotFound(_))
        ));
    }

    #[test]
    fn test_payload_too_large_stages_nothing() {
        let staging = UploadStaging::new(100, HOUR);
        let actor = Actor::member(1, Role::Researcher);

        assert!(staging.stage(&actor, UploadKind::Dataset, pdf(100), "ok.bin").is_ok());
        let err = staging
            .stage(&actor, UploadKind::Paper, pdf(101), "big.pdf")
            .unwrap_err();

        assert!(matches!(err, PortalError::PayloadTooLarge { size: 101, max: 100 }));
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_new_upload_replaces_previous_for_same_kind() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(1, Role::Researcher);

        let first = staging.stage(&actor, UploadKind::Paper, pdf(1), "1.pdf").unwrap();
        let other_kind = staging.stage(&actor, UploadKind::Dataset, pdf(2), "2.bin").unwrap();
        let second = staging.stage(&actor, UploadKind::Paper, pdf(3), "3.pdf").unwrap();

        assert_eq!(staging.len(), 2);
        assert!(staging.take(&actor, UploadKind::Paper, &first).is_err());
        assert_eq!(staging.take(&actor, UploadKind::Paper, &second).unwrap().len(), 3);
        assert_eq!(staging.take(&actor, UploadKind::Dataset, &other_kind).unwrap().len(), 2);
    }

    #[test]
    fn test_handle_bound_to_owner_and_kind() {
        let staging = UploadStaging::new(1024, HOUR);
        let owner = Actor::member(1, Role::Researcher);
        let other = Actor::member(2, Role::Researcher);

        let handle = staging.stage(&owner, UploadKind::Paper, pdf(5), "a.pdf").unwrap();

        assert!(staging.take(&other, UploadKind::Paper, &handle).is_err());
        assert!(staging.take(&owner, UploadKind::Dataset, &handle).is_err());
        assert!(staging.take(&Actor::Anonymous, UploadKind::Paper, &handle).is_err());

        // Failed attempts leave the file for its owner
        assert!(staging.take(&owner, UploadKind::Paper, &handle).is_ok());
    }

    #[test]
    fn test_anonymous_cannot_stage() {
        let staging = UploadStaging::new(1024, HOUR);
        assert!(matches!(
            staging.stage(&Actor::Anonymous, UploadKind::Paper, pdf(1), "a.pdf"),
            Err(PortalError::LoginRequired)
        ));
    }

    #[test]
    fn test_restore_after_take() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(4, Role::Admin);

        let handle = staging.stage(&actor, UploadKind::Dataset, pdf(8), "d.bin").unwrap();
        let file = staging.take(&actor, UploadKind::Dataset, &handle).unwrap();
        staging.restore(4, UploadKind::Dataset, handle, file.clone());

        assert_eq!(staging.take(&actor, UploadKind::Dataset, &handle).unwrap(), file);
    }

    #[test]
    fn test_restore_skipped_when_newer_upload_exists() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(4, Role::Admin);

        let old = staging.stage(&actor, UploadKind::Paper, pdf(1), "old.pdf").unwrap();
        let file = staging.take(&actor, UploadKind::Paper, &old).unwrap();
        let newer = staging.stage(&actor, UploadKind::Paper, pdf(2), "new.pdf").unwrap();

        staging.restore(4, UploadKind::Paper, old, file);

        assert_eq!(staging.len(), 1);
        assert!(staging.take(&actor, UploadKind::Paper, &newer).is_ok());
    }

    #[test]
    fn test_empty_file_name_is_dropped() {
        let staging = UploadStaging::new(1024, HOUR);
        let actor = Actor::member(1, Role::Patient);

        let handle = staging.stage(&actor, UploadKind::Paper, pdf(1), "   ").unwrap();
        assert_eq!(staging.take(&actor, UploadKind::Paper, &handle).unwrap().file_name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_uploads() {
        let staging = UploadStaging::new(1024, Duration::from_secs(60));
        let actor = Actor::member(1, Role::Patient);
        let other = Actor::member(2, Role::Patient);

        let stale = staging.stage(&actor, UploadKind::Paper, pdf(1), "a.pdf").unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(matches!(
            staging.take(&actor, UploadKind::Paper, &stale),
            Err(PortalError::NotFound(_))
        ));

        let _ = staging.stage(&actor, UploadKind::Dataset, pdf(1), "b.bin").unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        // Staging by anyone purges expired entries
        staging.stage(&other, UploadKind::Paper, pdf(1), "c.pdf").unwrap();
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_handle_parse() {
        let handle = StagingHandle::new();
        let parsed: StagingHandle = handle.to_string().parse().unwrap();
        assert_eq!(parsed, handle);
        assert!("not-a-handle".parse::<StagingHandle>().is_err());
    }
}
