//! Configuration-driven lifecycle of the directory context.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dl_ldap::config::keys;
use dl_ldap::{DirectoryStatus, DisabledReason, LdapError};

use crate::common::{ldap_properties, TestEnv};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn enable_search_and_disable() {
    let env = TestEnv::start(ldap_properties(false, "ldap://dir.example:389"))
        .await
        .unwrap();
    assert_eq!(
        env.holder.status(),
        DirectoryStatus::Disabled(DisabledReason::NotEnabled)
    );
    assert_eq!(env.directory.counters.opened.load(Ordering::SeqCst), 0);

    env.apply(ldap_properties(true, "ldap://dir.example:389")).await;
    assert_eq!(env.holder.status(), DirectoryStatus::Connected);

    let snapshot = env.holder.snapshot();
    let ctx = snapshot.connection().unwrap();
    let entries = ctx
        .search(
            &snapshot.keys.user_search_base(),
            "(uid=jdoe)",
            &["cn", "mail"],
            &snapshot.policy,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].get_attr(snapshot.keys.user_email_key().unwrap()),
        Some("jdoe@example.com")
    );
    assert_eq!(snapshot.policy.time_limit_ms, 3000);

    env.apply(ldap_properties(false, "ldap://dir.example:389")).await;
    assert_eq!(
        env.holder.status(),
        DirectoryStatus::Disabled(DisabledReason::NotEnabled)
    );
    assert_eq!(env.directory.counters.live(), 0);

    // The context handed out earlier is closed, not leaked.
    assert!(ctx.is_closed());
    assert!(matches!(
        ctx.search("ou=people", "(uid=jdoe)", &[], &snapshot.policy)
            .await,
        Err(LdapError::Closed)
    ));

    env.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_changes_keep_one_connection() {
    let env = TestEnv::start(ldap_properties(true, "ldap://dir.example:389"))
        .await
        .unwrap();

    for limit in ["1000", "2000", "4000", "8000"] {
        let properties =
            ldap_properties(true, "ldap://dir.example:389").with(keys::SEARCH_TIME_LIMIT, limit);
        env.apply(properties).await;
        assert_eq!(env.directory.counters.live(), 1);
    }

    assert_eq!(env.directory.counters.opened.load(Ordering::SeqCst), 5);
    assert_eq!(env.holder.search_policy().time_limit_ms, 8000);

    let holder = env.stop().await;
    tokio::task::spawn_blocking(move || holder.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_failure_then_recovery() {
    let env = TestEnv::start(ldap_properties(true, "ldap://dir.example:389"))
        .await
        .unwrap();
    let first = env.holder.connection().unwrap();

    env.directory.refuse.store(true, Ordering::SeqCst);
    env.apply(ldap_properties(true, "ldap://dir2.example:389")).await;
    assert_eq!(
        env.holder.status(),
        DirectoryStatus::Disabled(DisabledReason::ConnectionFailed)
    );
    assert!(env.holder.connection().is_none());
    assert!(first.is_closed());
    assert_eq!(env.directory.counters.live(), 0);

    // The policy still reflects the configuration that failed to connect.
    assert_eq!(env.holder.search_policy().time_limit_ms, 3000);

    env.directory.refuse.store(false, Ordering::SeqCst);
    env.apply(ldap_properties(true, "ldap://dir2.example:389")).await;
    assert_eq!(env.holder.status(), DirectoryStatus::Connected);
    assert_eq!(
        env.holder.connection().unwrap().provider_url(),
        "ldap://dir2.example:389"
    );

    env.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_update_keeps_previous_context() {
    let env = TestEnv::start(ldap_properties(true, "ldap://dir.example:389"))
        .await
        .unwrap();
    let before = env.holder.snapshot();

    env.store.update(
        ldap_properties(true, "ldap://dir.example:389").with(keys::SEARCH_TIME_LIMIT, "later"),
    );
    tokio::time::sleep(Duration::from_millis(200)).await;

    let after = env.holder.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(env.holder.status(), DirectoryStatus::Connected);
    assert_eq!(env.directory.counters.opened.load(Ordering::SeqCst), 1);

    env.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_server_disables_login() {
    let env = TestEnv::start(ldap_properties(true, "ldap://dir.example:389"))
        .await
        .unwrap();

    env.apply(ldap_properties(true, "   ")).await;
    assert_eq!(
        env.holder.status(),
        DirectoryStatus::Disabled(DisabledReason::ServerMissing)
    );
    assert_eq!(env.directory.counters.live(), 0);
    assert_eq!(env.holder.base_dn(), "dc=example,dc=com");
    assert_eq!(env.holder.user_name_key().as_deref(), Some("cn"));

    env.stop().await;
}
