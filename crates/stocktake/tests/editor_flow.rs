//! Integration tests for the reconciliation editor.
//!
//! Runs the editor against the in-memory backend in `common` and checks the
//! overlay, save, reload and close behaviour end to end.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{line, FakeBackend, SESSION_ID};
use itam_core::error::CoreError;
use itam_core::export::UTF8_BOM;
use itam_core::stocktake::{LinePatch, SessionStatus};
use itam_stocktake::editor::{send_all, ReconciliationEditor};
use itam_stocktake::error::StocktakeError;
use itam_stocktake::notice::NoticeLevel;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn loaded(backend: &Arc<FakeBackend>) -> ReconciliationEditor {
    let mut editor = ReconciliationEditor::new(backend.clone(), SESSION_ID);
    editor.load().await.expect("session should load");
    editor.take_notices();
    editor
}

fn two_lines() -> Arc<FakeBackend> {
    FakeBackend::with_session(vec![line(1, false), line(2, true)])
}

// ---------------------------------------------------------------------------
// Test: loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_populates_rows() {
    let backend = two_lines();
    let editor = loaded(&backend).await;

    assert_eq!(editor.rows().len(), 2);
    assert_eq!(editor.locations().len(), 2);
    assert_eq!(editor.dirty_count(), 0);
    assert!(!editor.is_read_only());
}

#[tokio::test]
async fn test_location_failure_is_a_warning() {
    let backend = two_lines();
    backend.lock().fail_locations = true;

    let mut editor = ReconciliationEditor::new(backend.clone(), SESSION_ID);
    editor.load().await.expect("lines still load");

    assert_eq!(editor.rows().len(), 2);
    assert!(editor.locations().is_empty());
    let notices = editor.take_notices();
    assert!(notices.iter().any(|n| n.level == NoticeLevel::Warning));
}

#[tokio::test]
async fn test_line_failure_blocks_load() {
    let backend = two_lines();
    backend.lock().fail_get_lines = true;

    let mut editor = ReconciliationEditor::new(backend.clone(), SESSION_ID);
    let result = editor.load().await;

    assert_matches!(result, Err(StocktakeError::Client(_)));
    assert!(editor.rows().is_empty());
    assert!(editor.is_read_only());
    let notices = editor.take_notices();
    assert!(notices.iter().any(|n| n.level == NoticeLevel::Error));
}

// ---------------------------------------------------------------------------
// Test: staging rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_marking_found_zeroes_missing_qty() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();

    let row = editor.row(1).unwrap();
    assert!(row.found);
    assert_eq!(row.missing_qty, Some(0));
    // Canonical line untouched until saved.
    assert!(!editor.canonical_lines()[0].found);

    let body = serde_json::to_value(editor.staged(1).unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({ "Found": 1, "MissingQty": 0 }));
}

#[tokio::test]
async fn test_marking_missing_clears_location() {
    let mut found = line(2, true);
    found.found_location_id = Some(1);
    let backend = FakeBackend::with_session(vec![found]);
    let mut editor = loaded(&backend).await;

    editor.set_found(2, false).unwrap();

    let row = editor.row(2).unwrap();
    assert!(!row.found);
    assert_eq!(row.found_location_id, None);
    assert_eq!(row.missing_qty, Some(1));
}

#[tokio::test]
async fn test_missing_qty_clamped_to_quantity() {
    let mut bulk = line(3, false);
    bulk.quantity = Some(3);
    let backend = FakeBackend::with_session(vec![bulk]);
    let mut editor = loaded(&backend).await;

    editor.set_missing_qty(3, 5).unwrap();

    assert_eq!(editor.staged(3).unwrap().missing_qty, Some(3));
}

#[tokio::test]
async fn test_location_on_missing_line_rejected() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    let result = editor.set_location(1, Some(2));

    assert_matches!(result, Err(StocktakeError::Core(CoreError::Validation(_))));
    assert_eq!(editor.dirty_count(), 0);
}

#[tokio::test]
async fn test_location_allowed_after_staging_found() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    editor.set_location(1, Some(2)).unwrap();

    let row = editor.row(1).unwrap();
    assert_eq!(row.found_location_id, Some(2));
    assert_eq!(editor.dirty_count(), 1);
}

#[tokio::test]
async fn test_unknown_line_not_found() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    let result = editor.set_remarks(99, "nope");

    assert_matches!(
        result,
        Err(StocktakeError::Core(CoreError::NotFound { id: 99, .. }))
    );
}

#[tokio::test]
async fn test_toggle_found_flips_state() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    assert!(editor.toggle_found(2).unwrap());
    assert!(!editor.row(2).unwrap().found);
    assert!(editor.toggle_found(2).unwrap());
    assert!(editor.row(2).unwrap().found);
    assert_eq!(editor.row(2).unwrap().missing_qty, Some(0));
}

// ---------------------------------------------------------------------------
// Test: single-row save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_save_without_edit_makes_no_call() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    let saved = editor.save_one(1).await.unwrap();

    assert!(!saved);
    assert_eq!(backend.patch_count(), 0);
    let notices = editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert_eq!(notices[0].line_id, Some(1));
}

#[tokio::test]
async fn test_save_one_commits_after_reload() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;
    let calls_before = backend.get_lines_calls();

    editor.set_found(1, true).unwrap();
    assert!(editor.save_one(1).await.unwrap());

    assert!(!editor.is_dirty(1));
    assert_eq!(backend.get_lines_calls(), calls_before + 1);
    assert_eq!(editor.row(1).unwrap(), backend.stored_line(1));

    let state = backend.lock();
    let patches = &state.patches;
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1, 1);
    assert_eq!(
        serde_json::to_value(&patches[0].2).unwrap(),
        serde_json::json!({ "Found": 1, "MissingQty": 0 })
    );
}

#[tokio::test]
async fn test_failed_save_keeps_edit() {
    let backend = two_lines();
    backend.lock().fail_patch_lines.insert(1);
    let mut editor = loaded(&backend).await;

    editor.set_remarks(1, "Under the desk").unwrap();
    let result = editor.save_one(1).await;

    assert_matches!(result, Err(StocktakeError::Client(_)));
    assert!(editor.is_dirty(1));
    assert!(!editor.is_saving(1));
    let notices = editor.take_notices();
    assert_eq!(notices[0].line_id, Some(1));
    assert_eq!(notices[0].message, "line is locked");
}

#[tokio::test]
async fn test_failed_reload_keeps_saved_edit_until_next_reload() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    backend.lock().fail_get_lines = true;
    assert!(editor.save_one(1).await.is_err());
    assert!(editor.is_dirty(1));

    backend.lock().fail_get_lines = false;
    editor.reload().await.unwrap();
    assert!(!editor.is_dirty(1));
    assert!(editor.row(1).unwrap().found);
}

#[tokio::test]
async fn test_restaged_edit_survives_pending_commit() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    backend.lock().fail_get_lines = true;
    assert!(editor.save_one(1).await.is_err());

    editor.set_remarks(1, "Re-checked").unwrap();
    backend.lock().fail_get_lines = false;
    editor.reload().await.unwrap();

    assert!(editor.is_dirty(1));
    assert_eq!(editor.row(1).unwrap().remarks.as_deref(), Some("Re-checked"));
    // CheckedAt moved because of our own save, not someone else's.
    let notices = editor.take_notices();
    assert!(notices.iter().all(|n| n.level != NoticeLevel::Warning));
}

#[tokio::test]
async fn test_foreign_change_after_own_save_still_warns() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    backend.lock().fail_get_lines = true;
    assert!(editor.save_one(1).await.is_err());
    editor.set_remarks(1, "Re-checked").unwrap();
    backend.lock().fail_get_lines = false;
    editor.reload().await.unwrap();
    editor.take_notices();

    backend.touch_line(1, "Moved by facilities");
    editor.reload().await.unwrap();

    let notices = editor.take_notices();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.line_id == Some(1)));
    assert_eq!(editor.row(1).unwrap().remarks.as_deref(), Some("Re-checked"));
}

// ---------------------------------------------------------------------------
// Test: editing while requests are in flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_other_line_editable_while_save_in_flight() {
    let backend = two_lines();
    let gate = backend.gate_patches();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    let save = editor.begin_save_one(1).unwrap().unwrap();
    let pending = tokio::spawn(save.send());

    assert!(editor.is_saving(1));
    editor.set_remarks(2, "Behind the rack").unwrap();
    assert!(editor.is_dirty(2));
    assert_eq!(editor.save_shortcut().await.unwrap(), None);
    assert!(!editor.can_close());
    assert_matches!(
        editor.begin_save_one(1),
        Err(StocktakeError::Core(CoreError::Conflict(_)))
    );

    gate.add_permits(1);
    let outcome = pending.await.unwrap();
    editor.finish_save_one(outcome).unwrap();
    editor.reload().await.unwrap();

    assert!(!editor.is_saving(1));
    assert!(!editor.is_dirty(1));
    assert!(editor.row(1).unwrap().found);
    assert_eq!(editor.dirty_ids(), vec![2]);
    assert_eq!(editor.row(2).unwrap().remarks.as_deref(), Some("Behind the rack"));
    assert_eq!(backend.patch_count(), 1);
    let notices = editor.take_notices();
    assert!(notices.iter().all(|n| n.level != NoticeLevel::Warning));
}

#[tokio::test]
async fn test_edit_made_during_save_stays_staged() {
    let backend = two_lines();
    let gate = backend.gate_patches();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    let save = editor.begin_save_one(1).unwrap().unwrap();
    let pending = tokio::spawn(save.send());
    editor.set_remarks(1, "Second look").unwrap();

    gate.add_permits(1);
    editor.finish_save_one(pending.await.unwrap()).unwrap();
    editor.reload().await.unwrap();

    assert!(editor.is_dirty(1));
    let row = editor.row(1).unwrap();
    assert!(row.found);
    assert_eq!(row.remarks.as_deref(), Some("Second look"));
    let notices = editor.take_notices();
    assert!(notices.iter().all(|n| n.level != NoticeLevel::Warning));
}

#[tokio::test]
async fn test_bulk_save_marks_editor_busy_until_settled() {
    let backend = FakeBackend::with_session(vec![line(1, false), line(2, false)]);
    let gate = backend.gate_patches();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    editor.set_found(2, true).unwrap();
    let saves = editor.begin_save_dirty(false).unwrap();
    assert_eq!(saves.len(), 2);
    let pending = tokio::spawn(send_all(saves));

    assert!(editor.is_busy());
    assert!(editor.is_saving(1) && editor.is_saving(2));
    assert_matches!(
        editor.begin_save_dirty(false),
        Err(StocktakeError::Core(CoreError::Conflict(_)))
    );
    assert_eq!(editor.save_shortcut().await.unwrap(), None);

    gate.add_permits(2);
    let report = editor.finish_save_dirty(pending.await.unwrap());
    assert!(!editor.is_busy());
    assert_eq!(report.succeeded, vec![1, 2]);

    editor.reload().await.unwrap();
    assert_eq!(editor.dirty_count(), 0);
}

#[tokio::test]
async fn test_staging_refused_while_closing() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    let request = editor.begin_close().unwrap();
    assert!(editor.is_busy());
    assert!(!editor.can_close());
    assert_matches!(
        editor.set_found(1, true),
        Err(StocktakeError::Core(CoreError::Conflict(_)))
    );

    editor.finish_close(request.send().await).unwrap();
    editor.reload().await.unwrap();

    assert!(!editor.is_busy());
    assert!(editor.is_read_only());
    assert_eq!(backend.lock().close_calls, 1);
}

// ---------------------------------------------------------------------------
// Test: bulk save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bulk_save_partial_failure() {
    let backend = FakeBackend::with_session(vec![line(1, false), line(2, false), line(3, false)]);
    backend.lock().fail_patch_lines.insert(2);
    let mut editor = loaded(&backend).await;
    let calls_before = backend.get_lines_calls();

    for id in [1, 2, 3] {
        editor.set_found(id, true).unwrap();
    }
    let report = editor.save_dirty(false).await.unwrap();

    assert_eq!(report.attempted, vec![1, 2, 3]);
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failed[0].0, 2);
    assert!(report.reloaded);
    assert_eq!(backend.get_lines_calls(), calls_before + 1);

    assert_eq!(editor.dirty_ids(), vec![2]);
    assert!(backend.stored_line(1).found);
    assert!(!backend.stored_line(2).found);

    let notices = editor.take_notices();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.message == "Saved 2 line(s), 1 failed"));
}

#[tokio::test]
async fn test_bulk_save_selected_only() {
    let backend = FakeBackend::with_session(vec![line(1, false), line(2, false), line(3, false)]);
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    editor.set_found(2, true).unwrap();
    editor.select([2, 3]);
    let report = editor.save_dirty(true).await.unwrap();

    assert_eq!(report.attempted, vec![2]);
    assert_eq!(editor.dirty_ids(), vec![1]);
}

#[tokio::test]
async fn test_bulk_save_with_nothing_dirty() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    let report = editor.save_dirty(false).await.unwrap();

    assert!(report.attempted.is_empty());
    assert_eq!(backend.patch_count(), 0);
}

#[tokio::test]
async fn test_save_shortcut_requires_dirty_lines() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    assert_eq!(editor.save_shortcut().await.unwrap(), None);

    editor.set_remarks(2, "ok").unwrap();
    let report = editor.save_shortcut().await.unwrap().unwrap();
    assert_eq!(report.succeeded, vec![2]);
    assert_eq!(editor.dirty_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: revert, filter and selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_revert_selected_only_touches_dirty() {
    let backend = FakeBackend::with_session(vec![line(3, false), line(4, false), line(5, false)]);
    let mut editor = loaded(&backend).await;

    editor.set_found(3, true).unwrap();
    editor.set_found(5, true).unwrap();
    editor.select([3, 4]);
    let reverted = editor.revert_selected();

    assert_eq!(reverted, vec![3]);
    assert!(!editor.is_dirty(3));
    assert!(!editor.is_dirty(4));
    assert!(editor.is_dirty(5));
    assert_eq!(backend.patch_count(), 0);
}

#[tokio::test]
async fn test_filter_limits_visible_and_selectable_rows() {
    let backend = FakeBackend::with_session(vec![line(1, false), line(12, false), line(2, true)]);
    let mut editor = loaded(&backend).await;

    editor.set_filter("laptop 1");
    let visible: Vec<_> = editor.visible_rows().iter().map(|r| r.id).collect();
    assert_eq!(visible, vec![1, 12]);

    editor.select([1, 2]);
    assert_eq!(editor.selection().iter().copied().collect::<Vec<_>>(), vec![1]);
}

#[tokio::test]
async fn test_filter_matches_staged_remarks() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_remarks(2, "Returned by contractor").unwrap();
    editor.set_filter("contractor");

    let visible = editor.visible_rows();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, 2);
}

// ---------------------------------------------------------------------------
// Test: concurrent edits on the server
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stale_edit_warns_and_keeps_edit() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    backend.touch_line(1, "Counted by night shift");
    editor.reload().await.unwrap();

    assert!(editor.is_dirty(1));
    let notices = editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert_eq!(notices[0].line_id, Some(1));

    // Rebased: a second reload does not warn again.
    editor.reload().await.unwrap();
    assert!(editor.take_notices().is_empty());
}

#[tokio::test]
async fn test_edit_for_removed_line_dropped() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    editor.select([1]);
    backend.remove_line(1);
    editor.reload().await.unwrap();

    assert_eq!(editor.dirty_count(), 0);
    assert!(editor.selection().is_empty());
    assert!(editor
        .take_notices()
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.line_id == Some(1)));
}

// ---------------------------------------------------------------------------
// Test: close
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_close_blocked_while_dirty() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_remarks(1, "x").unwrap();
    assert!(!editor.can_close());
    let result = editor.close().await;

    assert_matches!(result, Err(StocktakeError::Core(CoreError::Conflict(_))));
    assert_eq!(backend.lock().close_calls, 0);
}

#[tokio::test]
async fn test_close_makes_editor_read_only() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    assert!(editor.can_close());
    editor.close().await.unwrap();

    assert_eq!(editor.session().unwrap().status, SessionStatus::Closed);
    assert!(editor.is_read_only());
    assert!(!editor.can_close());
    assert!(!editor.toggle_found(1).unwrap());
    assert_matches!(
        editor.stage(1, LinePatch::found(true)),
        Err(StocktakeError::Core(CoreError::SessionClosed { session_id: SESSION_ID }))
    );
    assert_eq!(editor.save_shortcut().await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_close_keeps_session_open() {
    let backend = two_lines();
    backend.lock().fail_close = true;
    let mut editor = loaded(&backend).await;

    assert!(editor.close().await.is_err());
    assert!(!editor.is_read_only());
    assert!(editor.can_close());
}

// ---------------------------------------------------------------------------
// Test: export and progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_export_uses_working_view() {
    let backend = two_lines();
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    let bytes = editor.export_csv().unwrap();

    assert!(bytes.starts_with(UTF8_BOM));
    let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].contains("\"FOUND\""));
    assert_eq!(editor.export_filename(), "stocktake_session_7.csv");
}

#[tokio::test]
async fn test_progress_counts_working_view() {
    let backend = FakeBackend::with_session(vec![line(1, false), line(2, false), line(3, true)]);
    let mut editor = loaded(&backend).await;

    editor.set_found(1, true).unwrap();
    let progress = editor.progress();

    assert_eq!(progress.total, 3);
    assert_eq!(progress.found, 2);
    assert_eq!(progress.missing, 1);
    assert_eq!(progress.dirty, 1);
}
