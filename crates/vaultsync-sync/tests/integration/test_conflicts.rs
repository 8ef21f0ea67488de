//! Both sides edited since the last sync

use vaultsync_core::domain::{IssueKind, RunOutcome};
use vaultsync_sync::clock::Clock;
use vaultsync_sync::conflict::ConflictNamer;

use vaultsync_core::domain::StoreError;

use crate::common::{ms, p, Harness, LocalOp, RemoteOp, T0};

fn backup_name(h: &Harness, path: &str) -> String {
    ConflictNamer::generate(&p(path), h.clock.now())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn both_edited_keeps_local_copy_and_remote_wins_at_original_name() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my edit", T0 + 10);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    let backup = backup_name(&h, "plan.md");

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.conflicts, 1);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.uploaded, 0);
    assert!(report.is_clean());

    assert_eq!(h.local.content("plan.md").as_deref(), Some("their edit"));
    assert_eq!(h.local.content(&backup).as_deref(), Some("my edit"));
    assert_eq!(h.remote.content("plan.md").as_deref(), Some("their edit"));

    let tie = h.tie_point("plan.md").unwrap();
    assert_eq!(tie.remote_mtime, Some(ms(T0 + 20)));
    assert!(h.tie_point(&backup).is_none());
}

#[tokio::test]
async fn newer_local_edit_still_loses_the_original_name() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my later edit", T0 + 30);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    let backup = backup_name(&h, "plan.md");

    h.reconciler.run_sync().await.unwrap();

    assert_eq!(h.local.content("plan.md").as_deref(), Some("their edit"));
    assert_eq!(h.local.content(&backup).as_deref(), Some("my later edit"));
}

#[tokio::test]
async fn backup_is_uploaded_next_run_then_everything_settles() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my edit", T0 + 10);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    let backup = backup_name(&h, "plan.md");

    h.reconciler.run_sync().await.unwrap();
    let second = h.reconciler.run_sync().await.unwrap();
    let third = h.reconciler.run_sync().await.unwrap();

    assert_eq!(second.uploaded, 1);
    assert_eq!(second.conflicts, 0);
    assert_eq!(h.remote.content(&backup).as_deref(), Some("my edit"));
    assert_eq!(third.total_changes(), 0);
    assert_eq!(third.conflicts, 0);
}

#[tokio::test]
async fn taken_backup_name_gets_a_numbered_suffix() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my edit", T0 + 10);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    let first_choice = backup_name(&h, "plan.md");
    let second_choice = ConflictNamer::candidate(&p("plan.md"), h.clock.now(), 2)
        .unwrap()
        .to_string();
    h.local.put(&first_choice, "unrelated", T0 + 5);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.conflicts, 1);
    assert_eq!(h.local.content(&first_choice).as_deref(), Some("unrelated"));
    assert_eq!(h.local.content(&second_choice).as_deref(), Some("my edit"));
}

#[tokio::test]
async fn failed_backup_leaves_the_path_alone() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my edit", T0 + 10);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    let backup = backup_name(&h, "plan.md");
    h.local.fail(LocalOp::Write, &backup);
    let tie_before = h.tie_point("plan.md");

    let report = h.reconciler.run_sync().await.unwrap();

    assert!(report.has_issue(IssueKind::ConflictBackup));
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.downloaded, 0);
    assert_eq!(h.local.content("plan.md").as_deref(), Some("my edit"));
    assert_eq!(h.remote.content("plan.md").as_deref(), Some("their edit"));
    assert_eq!(h.tie_point("plan.md"), tie_before);

    h.local.clear_failures();
    let retry = h.reconciler.run_sync().await.unwrap();
    assert_eq!(retry.conflicts, 1);
    assert_eq!(h.local.content(&backup).as_deref(), Some("my edit"));
    assert_eq!(h.local.content("plan.md").as_deref(), Some("their edit"));
}

fn backups_of(h: &Harness, stem: &str) -> Vec<String> {
    let prefix = format!("{stem}_local_conflict_");
    h.local
        .paths()
        .into_iter()
        .filter(|path| path.starts_with(&prefix))
        .collect()
}

#[tokio::test]
async fn failed_conflict_download_writes_no_backup_until_it_succeeds() {
    let h = Harness::new();
    h.seed_synced("plan.md", "base", T0, T0);
    h.local.put("plan.md", "my edit", T0 + 10);
    h.remote.edit("plan.md", "their edit", T0 + 20);
    h.remote.fail(
        RemoteOp::Download,
        "plan.md",
        StoreError::Transient("connection reset".into()),
    );
    let tie_before = h.tie_point("plan.md");

    let first = h.reconciler.run_sync().await.unwrap();

    assert_eq!(first.conflicts, 0);
    assert_eq!(first.downloaded, 0);
    assert!(first.has_issue(IssueKind::TransientIo));
    assert!(backups_of(&h, "plan").is_empty());
    assert_eq!(h.local.content("plan.md").as_deref(), Some("my edit"));
    assert_eq!(h.tie_point("plan.md"), tie_before);

    h.remote.clear_failures();
    h.clock.set(ms(T0 + 4_000_000));
    let backup = backup_name(&h, "plan.md");
    let second = h.reconciler.run_sync().await.unwrap();

    assert_eq!(second.conflicts, 1);
    assert_eq!(backups_of(&h, "plan"), vec![backup.clone()]);
    assert_eq!(h.local.content(&backup).as_deref(), Some("my edit"));
    assert_eq!(h.local.content("plan.md").as_deref(), Some("their edit"));

    let third = h.reconciler.run_sync().await.unwrap();
    assert_eq!(third.conflicts, 0);
    assert_eq!(third.uploaded, 1);
    assert_eq!(backups_of(&h, "plan").len(), 1);
}

#[tokio::test]
async fn untracked_on_both_sides_with_newer_remote_is_a_conflict() {
    let h = Harness::new();
    h.local.put("a.md", "mine", T0);
    h.remote.put("a.md", "theirs", T0 + 5);
    let backup = backup_name(&h, "a.md");

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.conflicts, 1);
    assert_eq!(h.local.content("a.md").as_deref(), Some("theirs"));
    assert_eq!(h.local.content(&backup).as_deref(), Some("mine"));
}

#[tokio::test]
async fn untracked_on_both_sides_with_newer_local_overwrites_in_place() {
    let h = Harness::new();
    h.local.put("a.md", "mine", T0 + 5);
    let id = h.remote.put("a.md", "theirs", T0);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.conflicts, 0);
    assert_eq!(h.remote.paths(), vec!["a.md".to_string()]);
    assert_eq!(h.remote.id_of("a.md"), Some(id));
    assert_eq!(h.remote.content("a.md").as_deref(), Some("mine"));
}
