//! New files, updates, idempotence and the equal-timestamp rule

use vaultsync_core::domain::RunOutcome;

use crate::common::{ms, Harness, T0};

#[tokio::test]
async fn new_files_on_each_side_are_exchanged() {
    let h = Harness::new();
    h.local.put("mine.md", "from laptop", T0);
    h.remote.put("theirs.md", "from phone", T0);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.downloaded, 1);
    assert!(report.is_clean());

    assert_eq!(h.remote.content("mine.md").as_deref(), Some("from laptop"));
    assert_eq!(h.local.content("theirs.md").as_deref(), Some("from phone"));

    let up = h.tie_point("mine.md").unwrap();
    assert_eq!(up.local_mtime_epoch, Some(T0));
    assert_eq!(up.remote_mtime, Some(ms(h.remote.modified("mine.md").unwrap())));
    assert_eq!(Some(up.remote_id), h.remote.id_of("mine.md"));

    let down = h.tie_point("theirs.md").unwrap();
    assert_eq!(down.remote_mtime, Some(ms(T0)));
    assert_eq!(down.local_mtime_epoch, h.local.mtime("theirs.md"));
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let h = Harness::new();
    h.local.put("a.md", "a", T0);
    h.local.put("notes/b.md", "b", T0 + 1);
    h.remote.put("c.md", "c", T0 + 2);

    h.reconciler.run_sync().await.unwrap();
    let states_after_first = h.state.snapshot();
    let (uploads, downloads) = (h.remote.upload_count(), h.remote.download_count());

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.total_changes(), 0);
    assert_eq!(report.conflicts, 0);
    assert!(report.is_clean());
    assert_eq!(h.remote.upload_count(), uploads);
    assert_eq!(h.remote.download_count(), downloads);
    assert_eq!(h.state.snapshot(), states_after_first);
}

#[tokio::test]
async fn local_edit_is_uploaded_in_place() {
    let h = Harness::new();
    let id = h.seed_synced("a.md", "v1", T0, T0);
    h.local.put("a.md", "v2", T0 + 500);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.downloaded, 0);
    assert_eq!(h.remote.content("a.md").as_deref(), Some("v2"));
    assert_eq!(h.remote.id_of("a.md"), Some(id));
    assert_eq!(h.tie_point("a.md").unwrap().local_mtime_epoch, Some(T0 + 500));
}

#[tokio::test]
async fn remote_edit_is_downloaded() {
    let h = Harness::new();
    h.seed_synced("a.md", "v1", T0, T0);
    h.remote.edit("a.md", "v2", T0 + 500);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.uploaded, 0);
    assert_eq!(h.local.content("a.md").as_deref(), Some("v2"));
    let tie = h.tie_point("a.md").unwrap();
    assert_eq!(tie.remote_mtime, Some(ms(T0 + 500)));
    assert_eq!(tie.local_mtime_epoch, h.local.mtime("a.md"));
}

#[tokio::test]
async fn mixed_changes_converge_in_one_run() {
    let h = Harness::new();
    h.seed_synced("unchanged.md", "same", T0, T0);
    h.seed_synced("edited-here.md", "old", T0, T0);
    h.seed_synced("edited-there.md", "old", T0, T0);
    h.seed_synced("deleted-here.md", "bye", T0, T0);
    h.seed_synced("deleted-there.md", "bye", T0, T0);
    h.local.put("edited-here.md", "new here", T0 + 100);
    h.remote.edit("edited-there.md", "new there", T0 + 100);
    h.local.remove("deleted-here.md");
    h.remote.remove("deleted-there.md");
    h.local.put("created-here.md", "fresh", T0 + 200);
    h.remote.put("created-there.md", "fresh", T0 + 200);

    let report = h.reconciler.run_sync().await.unwrap();

    assert!(report.is_clean(), "errors: {:?}", report.errors);
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.downloaded, 2);
    assert_eq!(report.deleted_remote, 1);
    assert_eq!(report.deleted_local, 1);

    assert_eq!(h.local.paths(), h.remote.paths());
    for path in h.local.paths() {
        assert_eq!(h.local.content(&path), h.remote.content(&path), "{path}");
    }
    let tracked: Vec<String> = h.state.snapshot().iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(tracked, h.local.paths());
}

#[tokio::test]
async fn equal_timestamps_never_trigger_action() {
    let h = Harness::new();
    // an old tie-point and a recent one, both exactly matching
    h.seed_synced("old.md", "old", 1_000, 1_000);
    h.seed_synced("recent.md", "recent", T0 + 9_000, T0 + 9_000);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.total_changes(), 0);
    assert_eq!(report.conflicts, 0);
    assert_eq!(h.remote.upload_count(), 0);
    assert_eq!(h.remote.download_count(), 0);
}

#[tokio::test]
async fn remote_moved_to_exactly_local_time_is_left_alone() {
    let h = Harness::new();
    // the tie-point recorded a local time ahead of the remote one
    h.seed_synced("a.md", "same", T0 + 300, T0);
    h.local.put("a.md", "same", T0 + 200);
    h.remote.edit("a.md", "same", T0 + 200);

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.total_changes(), 0);
    assert_eq!(h.remote.download_count(), 0);
}

#[tokio::test]
async fn many_files_with_bounded_concurrency() {
    let h = Harness::with_concurrency(3);
    for i in 0..25 {
        h.local.put(&format!("bulk/{i:02}.md"), &format!("note {i}"), T0 + i);
    }

    let report = h.reconciler.run_sync().await.unwrap();

    assert_eq!(report.uploaded, 25);
    assert_eq!(h.state.snapshot().len(), 25);
    assert_eq!(h.remote.paths().len(), 25);
}
