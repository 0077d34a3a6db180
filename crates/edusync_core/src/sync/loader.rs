//! Cold-start loader for owner-scoped aggregates.
//!
//! # Responsibility
//! - Assemble the initial value when an editing surface opens.
//!
//! # Invariants
//! - Sources are tried in order: remote, structured cache record, legacy
//!   single-field records, hard-coded defaults. The first source that
//!   yields data wins.
//! - Session identity fields are overlaid last, whatever the source.
//! - The loaded value is always keyed by the owner id.
//! - An empty structured record means the owner deleted the value; legacy
//!   records are not consulted again.
//! - Loading never fails; unusable sources are logged and skipped.
//! - Data migrated from legacy records is written back as a structured
//!   record. Legacy records are left in place.
//! - A remote value refreshes the structured record unless the record was
//!   edited after the remote copy; unpushed local edits are never
//!   overwritten by a load.

use crate::cache::NamespacedCache;
use crate::model::aggregate::OwnerScoped;
use crate::model::identifier::AggregateId;
use crate::model::session::SessionIdentity;
use crate::remote::RemoteClient;
use log::{info, warn};

/// Source the loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    LocalCache,
    LegacyMigration,
    Defaults,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalCache => "local_cache",
            Self::LegacyMigration => "legacy_migration",
            Self::Defaults => "defaults",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<A> {
    pub aggregate: A,
    pub source: LoadSource,
}

pub struct ColdStartLoader<'a> {
    cache: &'a NamespacedCache,
    remote: &'a RemoteClient,
    session: &'a SessionIdentity,
}

impl<'a> ColdStartLoader<'a> {
    pub fn new(
        cache: &'a NamespacedCache,
        remote: &'a RemoteClient,
        session: &'a SessionIdentity,
    ) -> Self {
        Self {
            cache,
            remote,
            session,
        }
    }

    pub async fn load<A: OwnerScoped>(&self) -> Loaded<A> {
        let mut loaded = self.load_stored::<A>().await;
        loaded
            .aggregate
            .set_id(AggregateId::durable(self.cache.owner_id()));
        loaded.aggregate.apply_session(self.session);
        info!(
            "event=cold_start_load module=sync status=ok kind={} source={}",
            A::KIND,
            loaded.source.as_str()
        );
        loaded
    }

    async fn load_stored<A: OwnerScoped>(&self) -> Loaded<A> {
        let owner_id = self.cache.owner_id();

        match self.remote.fetch_optional::<A>(owner_id).await {
            Ok(Some(aggregate)) => {
                self.refresh_cache(&aggregate);
                return Loaded {
                    aggregate,
                    source: LoadSource::Remote,
                };
            }
            Ok(None) => {}
            Err(err) if err.is_transient() => info!(
                "event=cold_start_load module=sync status=remote_unreachable kind={} error={err}",
                A::KIND
            ),
            Err(err) => warn!(
                "event=cold_start_load module=sync status=remote_failed kind={} error={err}",
                A::KIND
            ),
        }

        match self.cache.read_record::<A>() {
            Ok(Some(record)) => {
                return match record.entries.into_iter().next() {
                    Some(aggregate) => Loaded {
                        aggregate,
                        source: LoadSource::LocalCache,
                    },
                    None => Loaded {
                        aggregate: A::defaults(owner_id),
                        source: LoadSource::Defaults,
                    },
                };
            }
            Ok(None) => {}
            Err(err) => warn!(
                "event=cold_start_load module=sync status=cache_unreadable kind={} error={err}",
                A::KIND
            ),
        }

        match self.cache.read_legacy_fields(A::LEGACY_FIELDS) {
            Ok(fields) if !fields.is_empty() => {
                let aggregate = A::from_legacy(owner_id, &fields);
                if let Err(err) = self.cache.write_record(std::slice::from_ref(&aggregate)) {
                    warn!(
                        "event=legacy_migration module=sync status=write_failed kind={} error={err}",
                        A::KIND
                    );
                } else {
                    info!(
                        "event=legacy_migration module=sync status=ok kind={} fields={}",
                        A::KIND,
                        fields.len()
                    );
                }
                return Loaded {
                    aggregate,
                    source: LoadSource::LegacyMigration,
                };
            }
            Ok(_) => {}
            Err(err) => warn!(
                "event=legacy_migration module=sync status=read_failed kind={} error={err}",
                A::KIND
            ),
        }

        Loaded {
            aggregate: A::defaults(owner_id),
            source: LoadSource::Defaults,
        }
    }

    /// Writes the remote value locally unless the cached copy is newer.
    /// A failed write only costs offline reads.
    fn refresh_cache<A: OwnerScoped>(&self, remote: &A) {
        let local_ahead = match self.cache.read_record::<A>() {
            Ok(Some(record)) => record
                .entries
                .first()
                .is_some_and(|cached| cached.last_modified_at() > remote.last_modified_at()),
            Ok(None) | Err(_) => false,
        };
        if local_ahead {
            warn!(
                "event=cold_start_load module=sync status=local_ahead_kept kind={}",
                A::KIND
            );
            return;
        }
        if let Err(err) = self.cache.write_record(std::slice::from_ref(remote)) {
            warn!(
                "event=cold_start_load module=sync status=cache_refresh_failed kind={} error={err}",
                A::KIND
            );
        }
    }
}
