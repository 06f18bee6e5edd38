//! Licensed capability handling.
//!
//! The schema interchange needs a licensed extension. [`LicenseManager`]
//! hands out [`LicenseToken`]s and keeps a process-wide count of the tokens
//! outstanding:
//!
//! - the first `acquire` checks the extension out of the [`LicenseProvider`]
//! - further `acquire` calls only bump the count
//! - releasing (or dropping) a token decrements the count, and the extension
//!   is checked back in only when it reaches zero
//!
//! # Example
//!
//! ```rust,ignore
//! let licenses = LicenseManager::new(ConfiguredLicenses::new(["Foundation"]), "Foundation");
//! let token = licenses.acquire()?;
//! let nested = licenses.acquire()?; // no second check-out
//! licenses.release(nested);
//! licenses.release(token);          // checked in here
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::error::{MigrateError, Result};

/// Source of licensed extensions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a manager may be cloned into any
/// component that calls the interchange.
pub trait LicenseProvider: Send + Sync {
    /// Check if `extension` can be checked out.
    fn is_available(&self, extension: &str) -> bool;

    /// Check `extension` out.
    fn check_out(&self, extension: &str) -> Result<()>;

    /// Return `extension`.
    fn check_in(&self, extension: &str);
}

/// Provider granting a fixed list of extensions, as configured.
#[derive(Debug, Default)]
pub struct ConfiguredLicenses {
    available: HashSet<String>,
    checked_out: Mutex<HashSet<String>>,
}

impl ConfiguredLicenses {
    pub fn new<I, S>(available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: available.into_iter().map(Into::into).collect(),
            checked_out: Mutex::new(HashSet::new()),
        }
    }

    /// Check if `extension` is currently checked out.
    pub fn is_checked_out(&self, extension: &str) -> bool {
        lock(&self.checked_out).contains(extension)
    }
}

impl LicenseProvider for ConfiguredLicenses {
    fn is_available(&self, extension: &str) -> bool {
        self.available.contains(extension)
    }

    fn check_out(&self, extension: &str) -> Result<()> {
        if !self.is_available(extension) {
            return Err(MigrateError::LicenseUnavailable(extension.to_string()));
        }
        lock(&self.checked_out).insert(extension.to_string());
        Ok(())
    }

    fn check_in(&self, extension: &str) {
        lock(&self.checked_out).remove(extension);
    }
}

impl<P: LicenseProvider + ?Sized> LicenseProvider for Arc<P> {
    fn is_available(&self, extension: &str) -> bool {
        (**self).is_available(extension)
    }

    fn check_out(&self, extension: &str) -> Result<()> {
        (**self).check_out(extension)
    }

    fn check_in(&self, extension: &str) {
        (**self).check_in(extension)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner {
    provider: Box<dyn LicenseProvider>,
    extension: String,
    outstanding: Mutex<usize>,
}

/// Reference-counted access to one licensed extension. Clones share the
/// same count.
#[derive(Clone)]
pub struct LicenseManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for LicenseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseManager")
            .field("extension", &self.inner.extension)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl LicenseManager {
    pub fn new(provider: impl LicenseProvider + 'static, extension: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider: Box::new(provider),
                extension: extension.into(),
                outstanding: Mutex::new(0),
            }),
        }
    }

    pub fn extension(&self) -> &str {
        &self.inner.extension
    }

    /// Check if the extension could be acquired right now.
    pub fn is_available(&self) -> bool {
        self.outstanding() > 0 || self.inner.provider.is_available(&self.inner.extension)
    }

    /// Acquire a token, checking the extension out if none is outstanding.
    pub fn acquire(&self) -> Result<LicenseToken> {
        let mut outstanding = lock(&self.inner.outstanding);
        if *outstanding == 0 {
            if !self.inner.provider.is_available(&self.inner.extension) {
                return Err(MigrateError::LicenseUnavailable(
                    self.inner.extension.clone(),
                ));
            }
            self.inner.provider.check_out(&self.inner.extension)?;
            info!("Checked out extension {}", self.inner.extension);
        }
        *outstanding += 1;
        debug!(
            "Extension {} tokens outstanding: {}",
            self.inner.extension, *outstanding
        );

        Ok(LicenseToken {
            manager: self.clone(),
        })
    }

    /// Release a token. Same as dropping it.
    pub fn release(&self, token: LicenseToken) {
        drop(token);
    }

    /// Number of tokens currently outstanding.
    pub fn outstanding(&self) -> usize {
        *lock(&self.inner.outstanding)
    }

    fn release_one(&self) {
        let mut outstanding = lock(&self.inner.outstanding);
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.inner.provider.check_in(&self.inner.extension);
            info!("Checked in extension {}", self.inner.extension);
        }
    }
}

/// Proof that the extension is held. Releases on drop.
#[must_use = "the extension is released as soon as the token is dropped"]
pub struct LicenseToken {
    manager: LicenseManager,
}

impl LicenseToken {
    pub fn extension(&self) -> &str {
        self.manager.extension()
    }
}

impl fmt::Debug for LicenseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseToken")
            .field("extension", &self.extension())
            .finish()
    }
}

impl Drop for LicenseToken {
    fn drop(&mut self) {
        self.manager.release_one();
    }
}
