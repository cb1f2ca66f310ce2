//! Common test utilities and fixtures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dl_core::{ConfigStore, Properties};
use dl_ldap::config::keys;
use dl_ldap::{
    BindEnvironment, ConfigWatcher, DirectoryConnection, DirectoryConnector,
    DirectoryContextHolder, LdapEntry, LdapError, LdapResult, SearchPolicy,
};
use tokio::task::JoinHandle;

/// Counts connections opened and closed by the in-memory directory.
#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub searches: AtomicUsize,
}

impl Counters {
    /// Connections currently open.
    pub fn live(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory directory that can be switched to refuse connections.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    pub counters: Arc<Counters>,
    pub refuse: AtomicBool,
}

struct InMemoryConnection {
    counters: Arc<Counters>,
    closed: AtomicBool,
}

#[async_trait]
impl DirectoryConnection for InMemoryConnection {
    async fn search(
        &self,
        base: &str,
        _filter: &str,
        _attrs: &[&str],
        _policy: &SearchPolicy,
    ) -> LdapResult<Vec<LdapEntry>> {
        self.counters.searches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![LdapEntry {
            dn: format!("uid=jdoe,{base}"),
            attributes: [
                ("cn".to_string(), vec!["Jane Doe".to_string()]),
                ("mail".to_string(), vec!["jdoe@example.com".to_string()]),
            ]
            .into_iter()
            .collect(),
            binary_attributes: Default::default(),
        }])
    }

    fn close(&self) -> LdapResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl DirectoryConnector for InMemoryDirectory {
    fn connect(&self, env: &BindEnvironment) -> LdapResult<Box<dyn DirectoryConnection>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(LdapError::connection(&env.provider_url, "connection refused"));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryConnection {
            counters: self.counters.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Properties for a directory login configuration.
pub fn ldap_properties(enabled: bool, server: &str) -> Properties {
    Properties::new()
        .with(keys::ENABLED, enabled.to_string())
        .with(keys::SERVER, server)
        .with(keys::SEARCH_TIME_LIMIT, "3000")
        .with(keys::USER_DISPLAY_NAME, "cn")
        .with(keys::USER_EMAIL, "mail")
        .with(keys::BASE_DN, "dc=example,dc=com")
        .with(keys::USER_SEARCH_BASE, "ou=people")
}

/// Test environment: store, holder and a running watcher.
pub struct TestEnv {
    pub store: ConfigStore,
    pub directory: Arc<InMemoryDirectory>,
    pub holder: Arc<DirectoryContextHolder>,
    pub watcher: JoinHandle<()>,
}

impl TestEnv {
    /// Bootstraps a watcher over `initial` and starts it.
    pub async fn start(initial: Properties) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dl_ldap=debug,dl_core=debug")
            .with_test_writer()
            .try_init();

        let store = ConfigStore::new(initial);
        let directory = Arc::new(InMemoryDirectory::default());
        let holder = Arc::new(DirectoryContextHolder::new(directory.clone()));

        let watcher = ConfigWatcher::bootstrap(&store, holder.clone())?;
        let watcher = watcher.spawn();

        Ok(Self {
            store,
            directory,
            holder,
            watcher,
        })
    }

    /// Publishes `properties` and waits for the resulting rebuild.
    pub async fn apply(&self, properties: Properties) {
        let target = self.holder.snapshot().generation + 1;
        self.store.update(properties);
        self.wait_for_generation(target).await;
    }

    /// Waits until the holder has published `generation`.
    pub async fn wait_for_generation(&self, generation: u64) {
        for _ in 0..300 {
            if self.holder.snapshot().generation >= generation {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("holder never reached generation {generation}");
    }

    /// Drops the store and waits for the watcher to finish.
    pub async fn stop(self) -> Arc<DirectoryContextHolder> {
        drop(self.store);
        self.watcher.await.expect("watcher task panicked");
        self.holder
    }
}
