use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::fetcher::{KeySetFetcher, RawKeySet};
use crate::keys::KeySet;

#[derive(Default)]
struct CachedState {
    raw: Option<RawKeySet>,
    keys: Option<Arc<KeySet>>,
}

/// Result of a forced refresh.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new key set was fetched and is now cached.
    Refreshed(Arc<KeySet>),
    /// The refresh failed; the previously cached keys are still served.
    Stale { keys: Arc<KeySet>, error: AuthError },
}

impl RefreshOutcome {
    pub fn keys(&self) -> &Arc<KeySet> {
        match self {
            RefreshOutcome::Refreshed(keys) | RefreshOutcome::Stale { keys, .. } => keys,
        }
    }

    pub fn error(&self) -> Option<&AuthError> {
        match self {
            RefreshOutcome::Refreshed(_) => None,
            RefreshOutcome::Stale { error, .. } => Some(error),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshOutcome::Stale { .. })
    }
}

/// Per-verifier memo of the last good JWKS and the key set built from it.
///
/// Population is single-flight: `populate` serialises fetch, parse and store,
/// and waiters re-check the cache once they hold it.
pub struct KeySetCache {
    fetcher: KeySetFetcher,
    state: RwLock<CachedState>,
    populate: Mutex<()>,
}

impl KeySetCache {
    pub fn new(fetcher: KeySetFetcher) -> Self {
        Self {
            fetcher,
            state: RwLock::new(CachedState::default()),
            populate: Mutex::new(()),
        }
    }

    /// Returns the cached key set, fetching it on first use. Failures leave
    /// the cache empty so a later call retries.
    pub fn get_or_fetch(&self) -> AuthResult<Arc<KeySet>> {
        if let Some(keys) = self.cached() {
            debug!("JWKS cache hit");
            return Ok(keys);
        }

        let _guard = self.populate.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(keys) = self.cached() {
            debug!("JWKS populated by a concurrent caller");
            return Ok(keys);
        }

        info!(url = %self.fetcher.endpoint(), "no JWKS cached, fetching");
        self.load()
    }

    /// Always fetches. On failure the cache keeps its previous contents; if
    /// there were none the error is returned.
    pub fn force_refresh(&self) -> AuthResult<RefreshOutcome> {
        let _guard = self.populate.lock().unwrap_or_else(PoisonError::into_inner);
        info!(url = %self.fetcher.endpoint(), "refreshing JWKS");

        match self.load() {
            Ok(keys) => Ok(RefreshOutcome::Refreshed(keys)),
            Err(error) => match self.cached() {
                Some(keys) => {
                    warn!(error = %error, "JWKS refresh failed, serving cached keys");
                    Ok(RefreshOutcome::Stale { keys, error })
                }
                None => Err(error),
            },
        }
    }

    pub fn is_populated(&self) -> bool {
        self.cached().is_some()
    }

    /// The JWKS document the cached keys were built from.
    pub fn raw_key_set(&self) -> Option<RawKeySet> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .raw
            .clone()
    }

    fn cached(&self) -> Option<Arc<KeySet>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .clone()
    }

    // Callers must hold `populate`.
    fn load(&self) -> AuthResult<Arc<KeySet>> {
        let raw = self.fetcher.fetch().map_err(|err| {
            warn!(error = %err, "unable to fetch JWKS");
            AuthError::from(err)
        })?;
        let keys = Arc::new(KeySet::parse(&raw).map_err(|err| {
            warn!(error = %err, "unable to parse JWKS");
            err
        })?);

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.raw = Some(raw);
        state.keys = Some(keys.clone());
        info!(keys = keys.len(), "cached JWKS");
        Ok(keys)
    }
}
