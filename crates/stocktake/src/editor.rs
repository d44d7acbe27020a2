//! Reconciliation editor for one stocktake session.
//!
//! The editor holds the canonically fetched session and lines and stages
//! every operator edit in a [`PendingPatches`] overlay instead of persisting
//! it. What the operator sees is always the canonical line merged with its
//! staged patch. Writes happen only on explicit save, after which the whole
//! session is re-fetched and treated as the source of truth.
//!
//! Overlay entries for saved lines are cleared only once the follow-up
//! reload succeeds, so a failed save or failed reload never loses edits.
//!
//! # Saving without blocking the editor
//!
//! Every write is split in three: a synchronous `begin_*` step that marks
//! the rows as saving and hands out an owned request ([`LineSave`],
//! [`SessionClose`]), the network call itself, which does not borrow the
//! editor, and a synchronous `finish_*` step that applies the outcome. While
//! a request is in flight the editor stays fully usable: other rows can be
//! staged and [`ReconciliationEditor::is_saving`] /
//! [`ReconciliationEditor::is_busy`] report progress. [`save_one`],
//! [`save_dirty`] and [`close`] chain the three steps and reload.
//!
//! [`save_one`]: ReconciliationEditor::save_one
//! [`save_dirty`]: ReconciliationEditor::save_dirty
//! [`close`]: ReconciliationEditor::close

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use itam_client::backend::StocktakeBackend;
use itam_client::error::{ClientError, GENERIC_FAILURE_MESSAGE};
use itam_core::asset::Location;
use itam_core::error::CoreError;
use itam_core::export;
use itam_core::overlay::{merge, PendingPatches};
use itam_core::stocktake::{
    normalize_patch, LinePatch, SessionProgress, StocktakeLine, StocktakeSession,
};
use itam_core::types::{DbId, Timestamp};

use crate::error::StocktakeResult;
use crate::notice::{Notice, NoticeLevel, Notices};

// ---------------------------------------------------------------------------
// Save requests
// ---------------------------------------------------------------------------

/// One line PATCH prepared by the editor. Owns everything it needs, so it
/// can be sent (or spawned) while the editor keeps handling input.
pub struct LineSave {
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
    line_id: DbId,
    patch: LinePatch,
}

impl std::fmt::Debug for LineSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSave")
            .field("session_id", &self.session_id)
            .field("line_id", &self.line_id)
            .field("patch", &self.patch)
            .finish_non_exhaustive()
    }
}

impl LineSave {
    /// Line the PATCH targets.
    pub fn line_id(&self) -> DbId {
        self.line_id
    }

    /// The staged fields that will be sent.
    pub fn patch(&self) -> &LinePatch {
        &self.patch
    }

    /// Issue the PATCH.
    pub async fn send(self) -> SaveOutcome {
        let result = self
            .backend
            .patch_line(self.session_id, self.line_id, &self.patch)
            .await;
        SaveOutcome {
            line_id: self.line_id,
            patch: self.patch,
            result,
        }
    }
}

/// Result of a [`LineSave`], handed back to the editor's `finish_*` step.
#[derive(Debug)]
pub struct SaveOutcome {
    pub line_id: DbId,
    /// Patch that was sent; compared with the overlay to detect edits made
    /// while the request was in flight.
    patch: LinePatch,
    pub result: Result<(), ClientError>,
}

/// Send every prepared save concurrently. Each settles on its own; the
/// outcomes come back in input order.
pub async fn send_all(saves: Vec<LineSave>) -> Vec<SaveOutcome> {
    join_all(saves.into_iter().map(LineSave::send)).await
}

/// Close request prepared by [`ReconciliationEditor::begin_close`].
pub struct SessionClose {
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
}

impl SessionClose {
    /// Issue the close POST.
    pub async fn send(self) -> Result<(), ClientError> {
        self.backend.close_session(self.session_id).await
    }
}

/// Outcome of a bulk save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSaveReport {
    /// Lines a PATCH was issued for.
    pub attempted: Vec<DbId>,
    pub succeeded: Vec<DbId>,
    /// Failed lines with the message shown to the operator.
    pub failed: Vec<(DbId, String)>,
    /// Whether the follow-up reload succeeded.
    pub reloaded: bool,
}

impl BulkSaveReport {
    /// Number of lines saved.
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of lines whose PATCH failed.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// Editing state of one stocktake session: canonical data, staged edits,
/// selection, filter, in-flight saves and pending notices.
pub struct ReconciliationEditor {
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
    session: Option<StocktakeSession>,
    lines: Vec<StocktakeLine>,
    locations: Vec<Location>,
    /// Staged edits keyed by line id, anchored to the line's `CheckedAt`.
    overlay: PendingPatches<DbId, LinePatch, Option<Timestamp>>,
    /// Saved lines whose overlay entry is dropped on the next good reload.
    awaiting_commit: BTreeSet<DbId>,
    /// Lines saved by this editor while a newer edit stayed staged. Their
    /// `CheckedAt` moved because of our own write, so the next reload
    /// re-anchors them without a warning.
    own_writes: BTreeSet<DbId>,
    selection: BTreeSet<DbId>,
    filter: String,
    saving_rows: BTreeSet<DbId>,
    bulk_saving: bool,
    closing: bool,
    notices: Notices,
}

impl ReconciliationEditor {
    /// Editor for `session_id`; nothing is fetched until [`Self::load`].
    pub fn new(backend: Arc<dyn StocktakeBackend>, session_id: DbId) -> Self {
        Self {
            backend,
            session_id,
            session: None,
            lines: Vec::new(),
            locations: Vec::new(),
            overlay: PendingPatches::new(),
            awaiting_commit: BTreeSet::new(),
            own_writes: BTreeSet::new(),
            selection: BTreeSet::new(),
            filter: String::new(),
            saving_rows: BTreeSet::new(),
            bulk_saving: false,
            closing: false,
            notices: Notices::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetch the session header, lines and locations.
    ///
    /// A failed header or line fetch is blocking: an error notice is raised
    /// and the previous state is kept. A failed location fetch only warns.
    pub async fn reload(&mut self) -> StocktakeResult<()> {
        let backend = Arc::clone(&self.backend);
        let (session, lines, locations) = tokio::join!(
            backend.get_session(self.session_id),
            backend.get_lines(self.session_id),
            backend.list_locations(),
        );

        match locations {
            Ok(locations) => self.locations = locations,
            Err(e) => {
                tracing::warn!(session_id = self.session_id, error = %e, "Failed to load locations");
                self.notices.warning(format!(
                    "Could not load locations: {}",
                    e.user_message(GENERIC_FAILURE_MESSAGE)
                ));
            }
        }

        let (session, lines) = match (session, lines) {
            (Ok(session), Ok(lines)) => (session, lines),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(session_id = self.session_id, error = %e, "Failed to load stocktake session");
                self.notices.error(format!(
                    "Could not load session {}: {}",
                    self.session_id,
                    e.user_message(GENERIC_FAILURE_MESSAGE)
                ));
                return Err(e.into());
            }
        };

        self.session = Some(session);
        self.lines = lines;

        let committed = self
            .overlay
            .commit(std::mem::take(&mut self.awaiting_commit));
        self.reconcile_overlay();

        let existing: BTreeSet<DbId> = self.lines.iter().map(|l| l.id).collect();
        self.selection.retain(|id| existing.contains(id));

        tracing::info!(
            session_id = self.session_id,
            lines = self.lines.len(),
            committed,
            dirty = self.overlay.len(),
            "Stocktake session loaded",
        );
        Ok(())
    }

    /// Initial load; identical to [`Self::reload`].
    pub async fn load(&mut self) -> StocktakeResult<()> {
        self.reload().await
    }

    /// Warn about staged edits whose line changed on the server since they
    /// were staged, and drop edits for lines that no longer exist. Lines we
    /// wrote ourselves are re-anchored silently.
    fn reconcile_overlay(&mut self) {
        let own_writes = std::mem::take(&mut self.own_writes);
        let lines = &self.lines;
        let stale = self
            .overlay
            .stale_keys(|id| lines.iter().find(|l| l.id == *id).map(|l| l.checked_at));

        for id in stale {
            match self.lines.iter().find(|l| l.id == id) {
                Some(line) if own_writes.contains(&id) => {
                    tracing::debug!(session_id = self.session_id, line_id = id, "Re-anchoring edit after own save");
                    self.overlay.rebase(&id, line.checked_at);
                }
                Some(line) => {
                    tracing::warn!(
                        session_id = self.session_id,
                        line_id = id,
                        "Staged edit is based on an outdated line",
                    );
                    self.notices.push(
                        NoticeLevel::Warning,
                        "This line was updated by someone else after you edited it; saving will overwrite their change",
                        Some(id),
                    );
                    self.overlay.rebase(&id, line.checked_at);
                }
                None => {
                    tracing::warn!(session_id = self.session_id, line_id = id, "Dropping edit for removed line");
                    self.overlay.discard([id]);
                    self.notices.push(
                        NoticeLevel::Warning,
                        "Line no longer exists; its unsaved edit was dropped",
                        Some(id),
                    );
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Session being edited.
    pub fn session_id(&self) -> DbId {
        self.session_id
    }

    /// Session header, once loaded.
    pub fn session(&self) -> Option<&StocktakeSession> {
        self.session.as_ref()
    }

    /// Locations offered for the found-location picker.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Canonical lines as last fetched.
    pub fn canonical_lines(&self) -> &[StocktakeLine] {
        &self.lines
    }

    /// The editor is read-only until a session is loaded and once it is
    /// closed.
    pub fn is_read_only(&self) -> bool {
        self.session.as_ref().map_or(true, |s| !s.is_open())
    }

    /// Working view of every line: canonical merged with staged edits.
    pub fn rows(&self) -> Vec<StocktakeLine> {
        self.lines
            .iter()
            .map(|l| merge(l, self.overlay.get(&l.id)))
            .collect()
    }

    /// Working view narrowed by the text filter.
    pub fn visible_rows(&self) -> Vec<StocktakeLine> {
        self.rows()
            .into_iter()
            .filter(|row| row.matches_text(&self.filter))
            .collect()
    }

    /// Working view of one line.
    pub fn row(&self, line_id: DbId) -> Option<StocktakeLine> {
        self.lines
            .iter()
            .find(|l| l.id == line_id)
            .map(|l| merge(l, self.overlay.get(&l.id)))
    }

    /// Staged, unsaved fields of a line.
    pub fn staged(&self, line_id: DbId) -> Option<&LinePatch> {
        self.overlay.get(&line_id)
    }

    /// Whether the line has unsaved edits.
    pub fn is_dirty(&self, line_id: DbId) -> bool {
        self.overlay.contains(&line_id)
    }

    /// Number of lines with unsaved edits.
    pub fn dirty_count(&self) -> usize {
        self.overlay.len()
    }

    /// Ids of lines with unsaved edits, ascending.
    pub fn dirty_ids(&self) -> Vec<DbId> {
        self.overlay.dirty_keys()
    }

    /// Whether a PATCH for this line is in flight.
    pub fn is_saving(&self, line_id: DbId) -> bool {
        self.saving_rows.contains(&line_id)
    }

    /// Whether a bulk save or the close request is in flight.
    pub fn is_busy(&self) -> bool {
        self.bulk_saving || self.closing
    }

    /// Found / missing / dirty tally of the working view.
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::tally(self.rows().iter(), self.dirty_count())
    }

    // -----------------------------------------------------------------------
    // Filter and selection
    // -----------------------------------------------------------------------

    /// Case-insensitive text filter over name, code, serial and remarks.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Current text filter; empty shows every row.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Select rows. Only existing rows that pass the current filter are
    /// selectable; other ids are ignored.
    pub fn select<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = DbId>,
    {
        let visible: BTreeSet<DbId> = self.visible_rows().iter().map(|r| r.id).collect();
        self.selection
            .extend(ids.into_iter().filter(|id| visible.contains(id)));
    }

    /// Deselect every row.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Currently selected line ids.
    pub fn selection(&self) -> &BTreeSet<DbId> {
        &self.selection
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    fn ensure_editable(&self) -> Result<(), CoreError> {
        match &self.session {
            Some(session) => session.ensure_open()?,
            None => {
                return Err(CoreError::Conflict(format!(
                    "Session {} is not loaded",
                    self.session_id
                )))
            }
        }
        if self.closing {
            return Err(CoreError::Conflict(format!(
                "Session {} is being closed",
                self.session_id
            )));
        }
        Ok(())
    }

    /// Stage an edit for one line after applying the staging rules.
    pub fn stage(&mut self, line_id: DbId, patch: LinePatch) -> StocktakeResult<()> {
        self.ensure_editable()?;
        let canonical = self
            .lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or(CoreError::NotFound {
                entity: "StocktakeLine",
                id: line_id,
            })?;

        let current = merge(canonical, self.overlay.get(&line_id));
        let patch = normalize_patch(&current, patch)?;
        let base_version = canonical.checked_at;

        self.overlay.stage(line_id, patch, base_version);
        // A newer edit must survive the commit of an older save.
        if self.awaiting_commit.remove(&line_id) {
            self.own_writes.insert(line_id);
        }
        Ok(())
    }

    /// Stage FOUND or MISSING.
    pub fn set_found(&mut self, line_id: DbId, found: bool) -> StocktakeResult<()> {
        self.stage(line_id, LinePatch::found(found))
    }

    /// Stage the found location; `None` clears it.
    pub fn set_location(&mut self, line_id: DbId, location_id: Option<DbId>) -> StocktakeResult<()> {
        self.stage(line_id, LinePatch::location(location_id))
    }

    /// Stage a missing quantity, clamped to the line's bounds.
    pub fn set_missing_qty(&mut self, line_id: DbId, qty: i64) -> StocktakeResult<()> {
        self.stage(line_id, LinePatch::missing_qty(qty))
    }

    /// Stage free-text remarks for the line.
    pub fn set_remarks(&mut self, line_id: DbId, remarks: impl Into<String>) -> StocktakeResult<()> {
        self.stage(line_id, LinePatch::remarks(remarks))
    }

    /// Row double-click: flip FOUND/MISSING as a staged edit. Returns
    /// `false` without doing anything when the editor is read-only.
    pub fn toggle_found(&mut self, line_id: DbId) -> StocktakeResult<bool> {
        if self.is_read_only() {
            return Ok(false);
        }
        let found = self
            .row(line_id)
            .ok_or(CoreError::NotFound {
                entity: "StocktakeLine",
                id: line_id,
            })?
            .found;
        self.set_found(line_id, !found)?;
        Ok(true)
    }

    /// Drop staged edits of the selected rows. No network call.
    pub fn revert_selected(&mut self) -> Vec<DbId> {
        let reverted = self.overlay.discard(self.selection.iter().copied());
        for id in &reverted {
            self.awaiting_commit.remove(id);
            self.own_writes.remove(id);
        }
        if !reverted.is_empty() {
            tracing::info!(session_id = self.session_id, count = reverted.len(), "Reverted staged edits");
            self.notices
                .info(format!("Reverted {} unsaved edit(s)", reverted.len()));
        }
        reverted
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    fn prepare_save(&mut self, line_id: DbId, patch: LinePatch) -> LineSave {
        self.saving_rows.insert(line_id);
        LineSave {
            backend: Arc::clone(&self.backend),
            session_id: self.session_id,
            line_id,
            patch,
        }
    }

    /// Record a successful PATCH. The entry is committed on the next good
    /// reload unless it was edited again while the request was in flight.
    fn record_saved(&mut self, line_id: DbId, sent: &LinePatch) {
        match self.overlay.get(&line_id) {
            Some(staged) if staged == sent => {
                self.awaiting_commit.insert(line_id);
            }
            Some(_) => {
                self.own_writes.insert(line_id);
            }
            None => {}
        }
    }

    /// Prepare a single-line save and mark the row as saving.
    ///
    /// Returns `Ok(None)` with an informational notice, and no request, when
    /// nothing is staged for the line.
    pub fn begin_save_one(&mut self, line_id: DbId) -> StocktakeResult<Option<LineSave>> {
        let Some(patch) = self.overlay.get(&line_id).cloned() else {
            self.notices
                .push(NoticeLevel::Info, "No changes to save", Some(line_id));
            return Ok(None);
        };
        self.ensure_editable()?;
        if self.is_saving(line_id) {
            return Err(CoreError::Conflict(format!("Line {line_id} is already being saved")).into());
        }
        Ok(Some(self.prepare_save(line_id, patch)))
    }

    /// Apply the outcome of a single-line save. On failure the edit stays
    /// staged for retry and a row-scoped error notice is raised.
    ///
    /// Call [`Self::reload`] afterwards to pick up the canonical line.
    pub fn finish_save_one(&mut self, outcome: SaveOutcome) -> StocktakeResult<()> {
        let SaveOutcome {
            line_id,
            patch,
            result,
        } = outcome;
        self.saving_rows.remove(&line_id);

        if let Err(e) = result {
            tracing::error!(session_id = self.session_id, line_id, error = %e, "Failed to save line");
            self.notices
                .row_error(line_id, e.user_message(GENERIC_FAILURE_MESSAGE));
            return Err(e.into());
        }

        tracing::info!(session_id = self.session_id, line_id, "Line saved");
        self.notices
            .push(NoticeLevel::Success, "Saved", Some(line_id));
        self.record_saved(line_id, &patch);
        Ok(())
    }

    /// Save one line's staged edit and reload.
    ///
    /// Returns `Ok(false)` without any network call when nothing is staged.
    /// On failure the edit stays staged for retry.
    pub async fn save_one(&mut self, line_id: DbId) -> StocktakeResult<bool> {
        let Some(save) = self.begin_save_one(line_id)? else {
            return Ok(false);
        };
        let outcome = save.send().await;
        self.finish_save_one(outcome)?;
        self.reload().await?;
        Ok(true)
    }

    /// Prepare one PATCH per dirty line, or per dirty selected line, and
    /// mark the editor busy. Rows already being saved are skipped.
    ///
    /// An empty result means there was nothing to save; an informational
    /// notice is raised and the editor is not marked busy.
    pub fn begin_save_dirty(&mut self, selected_only: bool) -> StocktakeResult<Vec<LineSave>> {
        self.ensure_editable()?;
        if self.bulk_saving {
            return Err(CoreError::Conflict("A save is already in progress".to_string()).into());
        }

        let jobs: Vec<(DbId, LinePatch)> = self
            .overlay
            .iter()
            .filter(|(id, _)| !selected_only || self.selection.contains(*id))
            .filter(|(id, _)| !self.saving_rows.contains(*id))
            .map(|(id, patch)| (*id, patch.clone()))
            .collect();

        if jobs.is_empty() {
            self.notices.info("No changes to save");
            return Ok(Vec::new());
        }

        self.bulk_saving = true;
        Ok(jobs
            .into_iter()
            .map(|(line_id, patch)| self.prepare_save(line_id, patch))
            .collect())
    }

    /// Apply the outcomes of a bulk save: successes are kept even when
    /// others fail, nothing is retried or rolled back. One aggregate notice
    /// is raised. `reloaded` is left `false`; reload afterwards.
    pub fn finish_save_dirty(&mut self, outcomes: Vec<SaveOutcome>) -> BulkSaveReport {
        let mut report = BulkSaveReport::default();
        for SaveOutcome {
            line_id,
            patch,
            result,
        } in outcomes
        {
            self.saving_rows.remove(&line_id);
            report.attempted.push(line_id);
            match result {
                Ok(()) => {
                    self.record_saved(line_id, &patch);
                    report.succeeded.push(line_id);
                }
                Err(e) => {
                    tracing::warn!(session_id = self.session_id, line_id, error = %e, "Line failed in bulk save");
                    report
                        .failed
                        .push((line_id, e.user_message(GENERIC_FAILURE_MESSAGE)));
                }
            }
        }
        self.bulk_saving = false;

        tracing::info!(
            session_id = self.session_id,
            attempted = report.attempted.len(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Bulk save settled",
        );
        match (report.success_count(), report.failure_count()) {
            (0, 0) => {}
            (n, 0) => self.notices.success(format!("Saved {n} line(s)")),
            (0, k) => self.notices.error(format!("All {k} line(s) failed to save")),
            (n, k) => self
                .notices
                .warning(format!("Saved {n} line(s), {k} failed")),
        }
        report
    }

    /// Save every dirty line, or only the dirty lines among the selection,
    /// concurrently, then reload once.
    pub async fn save_dirty(&mut self, selected_only: bool) -> StocktakeResult<BulkSaveReport> {
        let saves = self.begin_save_dirty(selected_only)?;
        if saves.is_empty() {
            return Ok(BulkSaveReport::default());
        }
        let outcomes = send_all(saves).await;
        let mut report = self.finish_save_dirty(outcomes);
        report.reloaded = self.reload().await.is_ok();
        Ok(report)
    }

    /// Keyboard save shortcut. Does nothing unless the session is open,
    /// something is dirty and no save is running.
    pub async fn save_shortcut(&mut self) -> StocktakeResult<Option<BulkSaveReport>> {
        if self.is_read_only()
            || self.dirty_count() == 0
            || self.is_busy()
            || !self.saving_rows.is_empty()
        {
            return Ok(None);
        }
        self.save_dirty(false).await.map(Some)
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Close is offered only for an open session without unsaved edits and
    /// with no request in flight.
    pub fn can_close(&self) -> bool {
        !self.is_read_only()
            && self.dirty_count() == 0
            && !self.is_busy()
            && self.saving_rows.is_empty()
    }

    /// Prepare the close request. While it is in flight no edit can be
    /// staged.
    pub fn begin_close(&mut self) -> StocktakeResult<SessionClose> {
        self.ensure_editable()?;
        if self.dirty_count() > 0 {
            return Err(CoreError::Conflict(format!(
                "{} line(s) have unsaved edits; save or revert them before closing",
                self.dirty_count()
            ))
            .into());
        }
        if self.is_busy() || !self.saving_rows.is_empty() {
            return Err(CoreError::Conflict("A save is already in progress".to_string()).into());
        }

        self.closing = true;
        Ok(SessionClose {
            backend: Arc::clone(&self.backend),
            session_id: self.session_id,
        })
    }

    /// Apply the outcome of the close request. On failure the session stays
    /// open and an error notice is raised.
    pub fn finish_close(&mut self, result: Result<(), ClientError>) -> StocktakeResult<()> {
        self.closing = false;
        if let Err(e) = result {
            tracing::error!(session_id = self.session_id, error = %e, "Failed to close session");
            self.notices.error(format!(
                "Could not close session: {}",
                e.user_message(GENERIC_FAILURE_MESSAGE)
            ));
            return Err(e.into());
        }

        tracing::info!(session_id = self.session_id, "Stocktake session closed");
        self.notices
            .success(format!("Session {} closed", self.session_id));
        Ok(())
    }

    /// Close the session and reload. Irreversible; afterwards the editor is
    /// read-only.
    pub async fn close(&mut self) -> StocktakeResult<()> {
        let request = self.begin_close()?;
        let result = request.send().await;
        self.finish_close(result)?;
        self.reload().await
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// CSV of the working view, unsaved edits included.
    pub fn export_csv(&self) -> StocktakeResult<Vec<u8>> {
        Ok(export::lines_to_csv(self.rows().iter())?)
    }

    /// Suggested file name for [`Self::export_csv`].
    pub fn export_filename(&self) -> String {
        export::export_filename(self.session_id)
    }

    /// Take every pending notice, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}
