//! # Editor Session
//!
//! Single owner of the current [`EditState`] and its history.
//!
//! ```text
//!            apply / undo / redo / reset          (synchronous)
//!   caller ──────────────────────────────▶ ┌───────────────────┐
//!                                          │ Mutex<Inner>      │
//!   remove_background / erase / upscale    │  state, history,  │
//!   ──▶ permit ──▶ gateway ──▶ commit ───▶ │  strokes, original│
//!        (Busy if held)                    └───────────────────┘
//!                                                   │
//!                                       broadcast::Sender<EditorEvent>
//! ```
//!
//! Asynchronous operations hold a single-slot permit for their whole
//! duration; a second one started meanwhile fails with
//! [`EditorError::Busy`]. The inner lock is never held across an await.
//!
//! The history snapshot of an asynchronous operation is taken in the same
//! critical section that installs its result, so a failed operation leaves
//! no history entry behind. If the image was replaced while the operation
//! ran (undo, reset), the result is discarded with
//! [`EditorError::Superseded`].

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use retouch_ai::{AiService, AiToolGateway, RemovalPath, Sleeper};
use retouch_core::{
    compose, BrushSize, CoreError, EditAction, EditState, EffectDescriptor, EraserStroke,
    HistoryManager, ImageRef, StrokeCapture, StrokePoint, UpscaleLevel,
};
use retouch_renderer::RasterCompositor;
use tokio::sync::{broadcast, Semaphore, SemaphorePermit};

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::events::{self, AsyncOperation, EditorEvent};
use crate::export::{unix_millis, ExportArtifact};
use crate::source::{HttpSourceResolver, SourceResolver};

/// What [`EditorSession::remove_background`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundOutcome {
    /// The background was removed.
    Removed {
        /// Service or local fallback.
        path: RemovalPath,
        /// Service attempts made.
        attempts: u32,
    },
    /// The background had been removed; the pre-removal image is back.
    Restored,
}

struct Inner {
    original: EditState,
    state: EditState,
    history: HistoryManager,
    capture: StrokeCapture,
    display_size: Option<(f32, f32)>,
}

impl Inner {
    fn commit(&mut self, next: EditState) -> EditorEvent {
        self.history.snapshot(&self.state);
        self.state = next;
        self.history_event()
    }

    fn history_event(&self) -> EditorEvent {
        EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_len: self.history.undo_len(),
            redo_len: self.history.redo_len(),
        }
    }
}

/// One image being edited.
pub struct EditorSession {
    inner: Mutex<Inner>,
    permit: Semaphore,
    gateway: AiToolGateway,
    resolver: Arc<dyn SourceResolver>,
    compositor: RasterCompositor,
    events: broadcast::Sender<EditorEvent>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("gateway", &self.gateway)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Start a session on `source`, talking to `service` for background
    /// removal.
    #[must_use]
    pub fn new(source: ImageRef, service: Arc<dyn AiService>, config: &EditorConfig) -> Self {
        let gateway = AiToolGateway::new(service)
            .with_policy(config.retry.clone())
            .with_config(config.gateway.clone());

        let state = EditState::new(source);
        let mut capture = StrokeCapture::new();
        capture.set_brush_size(config.brush.default_size);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        tracing::debug!(image = %state.image(), "Editor session created");

        Self {
            inner: Mutex::new(Inner {
                original: state.clone(),
                state,
                history: HistoryManager::with_capacity(config.history.capacity),
                capture,
                display_size: None,
            }),
            permit: Semaphore::new(1),
            gateway,
            resolver: Arc::new(HttpSourceResolver::new()),
            compositor: RasterCompositor::default(),
            events,
        }
    }

    /// Replace how remote images are fetched.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the source of backoff and processing delays.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.gateway = self.gateway.with_sleeper(sleeper);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EditorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // State and history
    // ------------------------------------------------------------------

    /// The current edit state.
    #[must_use]
    pub fn state(&self) -> EditState {
        self.lock().state.clone()
    }

    /// The state the session started from.
    #[must_use]
    pub fn original(&self) -> EditState {
        self.lock().original.clone()
    }

    /// Filter chain and geometry for rendering the current state.
    #[must_use]
    pub fn effect_descriptor(&self) -> EffectDescriptor {
        compose(&self.lock().state)
    }

    /// Apply a user edit, recording the previous state for undo.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Core`] for out-of-range values; the state and
    /// history are unchanged.
    pub fn apply(&self, action: &EditAction) -> EditorResult<EditState> {
        let mut inner = self.lock();
        let next = inner.state.apply(action)?;
        let event = inner.commit(next.clone());
        drop(inner);

        tracing::debug!(?action, "Edit applied");
        self.emit(event);
        Ok(next)
    }

    /// Step back one edit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyHistory`] when there is nothing
    /// to undo.
    pub fn undo(&self) -> EditorResult<EditState> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.state = inner.history.undo(&inner.state)?;
        let (state, event) = (inner.state.clone(), inner.history_event());
        drop(guard);

        tracing::debug!("Undo");
        self.emit(event);
        Ok(state)
    }

    /// Re-apply the last undone edit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyRedo`] when there is nothing
    /// to redo.
    pub fn redo(&self) -> EditorResult<EditState> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.state = inner.history.redo(&inner.state)?;
        let (state, event) = (inner.state.clone(), inner.history_event());
        drop(guard);

        tracing::debug!("Redo");
        self.emit(event);
        Ok(state)
    }

    /// Go back to the original image with default settings. Clears both
    /// history stacks and turns the masking tool off. Not undoable.
    pub fn reset(&self) -> EditState {
        let mut inner = self.lock();
        inner.state = inner.original.clone();
        inner.history.reset();
        inner.capture.set_active(false);
        let (state, event) = (inner.state.clone(), inner.history_event());
        drop(inner);

        tracing::info!("Session reset");
        self.emit(EditorEvent::StateReset);
        self.emit(event);
        state
    }

    /// Whether [`EditorSession::undo`] would succeed.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.lock().history.can_undo()
    }

    /// Whether [`EditorSession::redo`] would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.lock().history.can_redo()
    }

    /// Undo snapshots, oldest first.
    #[must_use]
    pub fn undo_snapshots(&self) -> Vec<EditState> {
        self.lock().history.snapshots().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Masking tool
    // ------------------------------------------------------------------

    /// Turn the masking tool on or off.
    pub fn set_masking_active(&self, active: bool) {
        self.lock().capture.set_active(active);
    }

    /// Whether the masking tool is on.
    #[must_use]
    pub fn masking_active(&self) -> bool {
        self.lock().capture.is_active()
    }

    /// Set the brush diameter, clamped to 5..=100.
    pub fn set_brush_size(&self, diameter: u32) -> BrushSize {
        self.lock().capture.set_brush_size(diameter)
    }

    /// Current brush diameter.
    #[must_use]
    pub fn brush_size(&self) -> BrushSize {
        self.lock().capture.brush_size()
    }

    /// Size the image is displayed at; stroke coordinates are in this
    /// space. Without it strokes are taken as image pixels.
    pub fn set_display_size(&self, width: f32, height: f32) {
        self.lock().display_size = Some((width, height));
    }

    /// Pointer pressed at display coordinates `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] while an asynchronous operation runs,
    /// and [`EditorError::Core`] if the masking tool is off or a stroke is
    /// already in progress.
    pub fn pointer_down(&self, x: f32, y: f32) -> EditorResult<()> {
        if self.is_busy() {
            return Err(EditorError::Busy);
        }
        self.lock().capture.begin(StrokePoint::new(x, y))?;
        Ok(())
    }

    /// Pointer moved. Returns whether the point was recorded.
    pub fn pointer_move(&self, x: f32, y: f32) -> bool {
        self.lock().capture.extend(StrokePoint::new(x, y))
    }

    /// Pointer released: commit the stroke and erase under it.
    ///
    /// Returns `None` if no stroke was being drawn.
    ///
    /// # Errors
    ///
    /// As for [`EditorSession::erase_region`].
    pub async fn pointer_up(&self) -> EditorResult<Option<EditState>> {
        let stroke = {
            let mut inner = self.lock();
            inner.capture.end();
            inner.capture.take_committed()
        };
        match stroke {
            Some(stroke) => self.erase_region(&[stroke]).await.map(Some),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Asynchronous operations
    // ------------------------------------------------------------------

    /// Whether an asynchronous operation holds the permit.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }

    pub(crate) fn acquire(&self) -> EditorResult<SemaphorePermit<'_>> {
        self.permit.try_acquire().map_err(|_| {
            tracing::debug!("Operation rejected, another one is in progress");
            EditorError::Busy
        })
    }

    async fn tracked<T>(
        &self,
        operation: AsyncOperation,
        message: impl Into<String>,
        work: impl Future<Output = EditorResult<T>>,
    ) -> EditorResult<T> {
        self.emit(EditorEvent::started(operation, message));
        let result = work.await;
        if let Err(e) = &result {
            tracing::warn!(%operation, error = %e, "Operation failed");
        }
        self.emit(EditorEvent::ProcessingFinished {
            operation,
            success: result.is_ok(),
        });
        result
    }

    /// Install `f(current)` as the new state. With a `basis`, fails if the
    /// image has changed since the basis was read.
    fn commit_after(
        &self,
        basis: Option<&EditState>,
        f: impl FnOnce(&EditState) -> EditorResult<EditState>,
    ) -> EditorResult<EditState> {
        let mut inner = self.lock();
        if basis.is_some_and(|basis| basis.image() != inner.state.image()) {
            return Err(EditorError::Superseded);
        }
        let next = f(&inner.state)?;
        let event = inner.commit(next.clone());
        drop(inner);

        self.emit(event);
        Ok(next)
    }

    /// Remove the background, or restore it if it was already removed.
    ///
    /// Removal asks the AI service (retrying rate limits) and falls back to
    /// a local radial mask if the service does not deliver. Restore swaps
    /// the pre-removal image back without a service call. Both are
    /// undoable.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] if another operation is running and
    /// [`EditorError::Encoding`] if the source cannot be fetched or the
    /// fallback cannot decode it.
    #[tracing::instrument(name = "session.remove_background", skip(self))]
    pub async fn remove_background(&self) -> EditorResult<BackgroundOutcome> {
        let _permit = self.acquire()?;
        let basis = self.state();

        if basis.background_removed() {
            return self
                .tracked(
                    AsyncOperation::RemoveBackground,
                    events::RESTORING_BACKGROUND,
                    async {
                        self.commit_after(Some(&basis), |current| {
                            current
                                .with_background_restored()
                                .ok_or(EditorError::Superseded)
                        })?;
                        tracing::info!("Background restored");
                        self.emit(EditorEvent::BackgroundRestored);
                        Ok(BackgroundOutcome::Restored)
                    },
                )
                .await;
        }

        self.tracked(
            AsyncOperation::RemoveBackground,
            events::REMOVING_BACKGROUND,
            self.request_removal(basis),
        )
        .await
    }

    async fn request_removal(&self, basis: EditState) -> EditorResult<BackgroundOutcome> {
        let source = self.resolver.resolve(basis.image()).await?;
        let events = self.events.clone();
        let removal = self
            .gateway
            .remove_background(&source, move |notice| {
                let _ = events.send(EditorEvent::retry(notice));
            })
            .await?;

        let cutout = ImageRef::Resident(removal.image);
        self.commit_after(Some(&basis), |current| {
            Ok(current.with_background_removed(cutout))
        })?;

        let fallback_reason = match &removal.path {
            RemovalPath::Service => None,
            RemovalPath::Fallback { reason } => Some(reason.clone()),
        };
        tracing::info!(
            attempts = removal.attempts,
            fallback = fallback_reason.is_some(),
            "Background removed"
        );
        self.emit(EditorEvent::BackgroundRemoved { fallback_reason });

        Ok(BackgroundOutcome::Removed {
            path: removal.path,
            attempts: removal.attempts,
        })
    }

    /// Clone-stamp over `strokes` (display coordinates, see
    /// [`EditorSession::set_display_size`]). An empty slice changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Busy`] if another operation is running and
    /// [`EditorError::Encoding`] if the source cannot be fetched or decoded.
    #[tracing::instrument(name = "session.erase_region", skip(self, strokes), fields(strokes = strokes.len()))]
    pub async fn erase_region(&self, strokes: &[EraserStroke]) -> EditorResult<EditState> {
        if strokes.is_empty() {
            return Ok(self.state());
        }
        let _permit = self.acquire()?;
        let (basis, display_size) = {
            let inner = self.lock();
            (inner.state.clone(), inner.display_size)
        };

        self.tracked(AsyncOperation::EraseRegion, events::ERASING, async {
            let source = self.resolver.resolve(basis.image()).await?;
            let erased = self
                .gateway
                .erase_region(&source, strokes, display_size)
                .await?;
            self.commit_after(Some(&basis), |current| {
                Ok(current.with_image(ImageRef::Resident(erased)))
            })
        })
        .await
    }

    /// Record an upscale to `level` (2 or 4). Pixels are not resampled;
    /// the level labels the export.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUpscaleLevel`] for anything
    /// but 2 or 4, and [`EditorError::Busy`] if another operation is
    /// running.
    #[tracing::instrument(name = "session.upscale", skip(self))]
    pub async fn upscale(&self, level: u8) -> EditorResult<EditState> {
        let level = UpscaleLevel::try_from(level)?;
        if level == UpscaleLevel::X1 {
            return Err(CoreError::InvalidUpscaleLevel(level.factor()).into());
        }
        let _permit = self.acquire()?;

        self.tracked(AsyncOperation::Upscale, events::upscaling(level), async {
            let level = self.gateway.upscale(level).await?;
            self.commit_after(None, |current| Ok(current.with_upscale(level)))
        })
        .await
    }

    /// Render the current state into a PNG.
    ///
    /// Export reads a copy of the state and does not take the permit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Encoding`] if the source cannot be fetched or
    /// decoded, or the output cannot be encoded. The state is never changed.
    #[tracing::instrument(name = "session.export", skip(self))]
    pub async fn export(&self) -> EditorResult<ExportArtifact> {
        let state = self.state();
        let source = self.resolver.resolve(state.image()).await?;
        let raster = self
            .compositor
            .compose(source.bytes(), &compose(&state))
            .inspect_err(|e| tracing::error!(error = %e, "Could not generate image for export"))?;

        tracing::info!(
            width = raster.width,
            height = raster.height,
            bytes = raster.bytes.len(),
            "Export composed"
        );
        Ok(ExportArtifact::new(raster, unix_millis(), state.upscale()))
    }
}

#[cfg(test)]
mod tests {
    use retouch_ai::OfflineService;

    use super::*;

    fn session() -> EditorSession {
        EditorSession::new(
            ImageRef::Remote("https://example.com/a.png".to_string()),
            Arc::new(OfflineService),
            &EditorConfig::default(),
        )
    }

    #[test]
    fn test_apply_records_history() {
        let session = session();
        session.apply(&EditAction::SetBrightness(150)).unwrap();
        assert_eq!(session.state().brightness(), 150);
        assert!(session.can_undo());
        assert!(!session.can_redo());

        let undone = session.undo().unwrap();
        assert_eq!(undone.brightness(), 100);
        assert!(session.can_redo());
    }

    #[test]
    fn test_undo_snapshots_oldest_first() {
        let session = session();
        session.apply(&EditAction::SetBrightness(120)).unwrap();
        session.apply(&EditAction::SetBrightness(140)).unwrap();

        let brightness: Vec<u8> = session
            .undo_snapshots()
            .iter()
            .map(EditState::brightness)
            .collect();
        assert_eq!(brightness, vec![100, 120]);
    }

    #[test]
    fn test_rejected_action_changes_nothing() {
        let session = session();
        let err = session.apply(&EditAction::SetBlur(11)).unwrap_err();
        assert!(matches!(err, EditorError::Core(CoreError::OutOfRange { .. })));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_empty_history_errors() {
        let session = session();
        assert!(matches!(
            session.undo(),
            Err(EditorError::Core(CoreError::EmptyHistory))
        ));
        assert!(matches!(
            session.redo(),
            Err(EditorError::Core(CoreError::EmptyRedo))
        ));
    }

    #[test]
    fn test_reset_clears_history_and_masking() {
        let session = session();
        session.apply(&EditAction::RotateLeft).unwrap();
        session.apply(&EditAction::FlipVertical).unwrap();
        session.set_masking_active(true);

        let state = session.reset();
        assert_eq!(state, session.original());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert!(!session.masking_active());
    }

    #[test]
    fn test_pointer_requires_masking_tool() {
        let session = session();
        assert!(matches!(
            session.pointer_down(1.0, 1.0),
            Err(EditorError::Core(CoreError::ToolInactive))
        ));
        assert!(!session.pointer_move(2.0, 2.0));
    }

    #[test]
    fn test_brush_size_clamped_and_configured() {
        let config = EditorConfig {
            brush: crate::config::BrushConfig { default_size: 40 },
            ..EditorConfig::default()
        };
        let session = EditorSession::new(
            ImageRef::Remote("https://example.com/a.png".to_string()),
            Arc::new(OfflineService),
            &config,
        );
        assert_eq!(session.brush_size().diameter(), 40);
        assert_eq!(session.set_brush_size(500).diameter(), 100);
        assert_eq!(session.set_brush_size(1).diameter(), 5);
    }

    #[tokio::test]
    async fn test_invalid_upscale_level_rejected_before_permit() {
        let session = session();
        assert!(matches!(
            session.upscale(3).await,
            Err(EditorError::Core(CoreError::InvalidUpscaleLevel(3)))
        ));
        assert!(matches!(
            session.upscale(1).await,
            Err(EditorError::Core(CoreError::InvalidUpscaleLevel(1)))
        ));
        assert!(!session.is_busy());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_effect_descriptor_tracks_state() {
        let session = session();
        session.apply(&EditAction::RotateRight).unwrap();
        session.apply(&EditAction::FlipHorizontal).unwrap();
        let descriptor = session.effect_descriptor();
        assert_eq!(descriptor.geometry.rotation_degrees, 90);
        assert!(descriptor.geometry.flip_horizontal);
    }
}
