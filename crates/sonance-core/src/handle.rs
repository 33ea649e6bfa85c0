//! Native object identity and release discipline.
//!
//! Every wrapper in this crate holds a [`NativeHandle`]: the raw identity of a
//! native object plus an [`Ownership`] classification.
//!
//! - **Owned** handles come from factory calls (`System::create_sound`, ...).
//!   They carry a [`ReleaseToken`] holding the kind-specific release
//!   primitive. The token fires at most once.
//! - **Borrowed** handles come from queries that return an existing object
//!   (`Channel::current_sound`, `System::master_channel_group`, callback
//!   arguments). They never release anything.
//!
//! Explicit `close()` fires the token immediately and reports failures. An
//! owned handle dropped without `close()` hands its token to a [`Reclaimer`],
//! which fires it later on a background thread or when a [`ReclaimQueue`] is
//! drained. Because firing takes the action out of the token, close and
//! reclamation can race freely: the release primitive runs exactly once.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::{Reclaimer, System};
//!
//! let engine = Arc::new(MockEngine::new());
//! let (reclaimer, queue) = Reclaimer::manual();
//! let system = System::builder(engine.clone()).reclaimer(reclaimer).build()?;
//!
//! let sound = system.create_sound("kick.wav", Default::default())?;
//! drop(sound);
//! assert_eq!(engine.call_count("Sound_Release"), 0);
//! assert_eq!(queue.collect(), 1);
//! assert_eq!(engine.call_count("Sound_Release"), 1);
//! # Ok::<(), sonance_core::Error>(())
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;

use crossbeam::channel::{self, Receiver, SendError, Sender};
use parking_lot::Mutex;

use crate::error::EngineError;
use crate::native::{NativeApi, RawHandle};

/// The kinds of native object the bindings expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Root mixing context.
    System,
    /// Loaded or streamed audio data.
    Sound,
    /// A playing voice. Engine-managed.
    Channel,
    /// A submix bus.
    ChannelGroup,
    /// A DSP unit.
    Dsp,
    /// An edge in the DSP graph. Engine-managed.
    DspConnection,
    /// A sound-count limiting group.
    SoundGroup,
}

impl ObjectKind {
    /// Display name matching the native prefix.
    pub const fn name(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Sound => "Sound",
            Self::Channel => "Channel",
            Self::ChannelGroup => "ChannelGroup",
            Self::Dsp => "DSP",
            Self::DspConnection => "DSPConnection",
            Self::SoundGroup => "SoundGroup",
        }
    }

    /// `false` for kinds whose lifetime the engine manages alone.
    pub const fn is_releasable(self) -> bool {
        !matches!(self, Self::Channel | Self::DspConnection)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type ReleaseFn = Box<dyn FnOnce() -> Result<(), EngineError> + Send>;

/// Single-fire release action for one owned native object.
pub struct ReleaseToken {
    kind: ObjectKind,
    raw: RawHandle,
    action: Mutex<Option<ReleaseFn>>,
}

impl ReleaseToken {
    /// Wraps `action` so that it runs at most once.
    pub fn new(
        kind: ObjectKind,
        raw: RawHandle,
        action: impl FnOnce() -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        Self {
            kind,
            raw,
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Runs the release action if nobody has yet.
    ///
    /// Returns `Ok(true)` when this call performed the release, `Ok(false)`
    /// when it had already happened. The action runs outside the lock.
    pub fn fire(&self) -> Result<bool, EngineError> {
        let action = self.action.lock().take();
        match action {
            Some(release) => release().map(|()| true),
            None => Ok(false),
        }
    }

    /// `true` once the action has been taken.
    pub fn is_spent(&self) -> bool {
        self.action.lock().is_none()
    }

    /// Kind of the object this token releases.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Identity of the object this token releases.
    pub fn raw(&self) -> RawHandle {
        self.raw
    }
}

impl fmt::Debug for ReleaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseToken")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Whether a handle carries a release obligation.
#[derive(Debug, Clone)]
pub enum Ownership {
    /// Exclusive owner; the token releases the object.
    Owned(Arc<ReleaseToken>),
    /// Borrowed view of an object someone else owns.
    Borrowed,
}

// ── Reclamation ──

static GLOBAL_RECLAIMER: OnceLock<Reclaimer> = OnceLock::new();

/// Sends release tokens of dropped owned handles to a reclamation queue.
///
/// Cheap to clone. Enqueueing never blocks.
#[derive(Clone)]
pub struct Reclaimer {
    tx: Sender<Arc<ReleaseToken>>,
}

impl Reclaimer {
    /// Process-wide reclaimer drained by a background `sonance-reclaim`
    /// thread, spawned on first use.
    pub fn global() -> Self {
        GLOBAL_RECLAIMER.get_or_init(spawn_global).clone()
    }

    /// A reclaimer whose queue is drained only by [`ReclaimQueue::collect`].
    pub fn manual() -> (Self, ReclaimQueue) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, ReclaimQueue { rx })
    }

    /// Queues `token` for release. If the queue is gone the release runs on
    /// the calling thread.
    pub fn defer(&self, token: Arc<ReleaseToken>) {
        if token.is_spent() {
            return;
        }
        if let Err(SendError(token)) = self.tx.send(token) {
            tracing::warn!(
                kind = %token.kind(),
                handle = ?token.raw(),
                "reclamation queue closed, releasing inline"
            );
            reclaim(&token);
        }
    }
}

impl fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reclaimer")
            .field("pending", &self.tx.len())
            .finish()
    }
}

fn spawn_global() -> Reclaimer {
    let (tx, rx) = channel::unbounded::<Arc<ReleaseToken>>();
    let spawned = thread::Builder::new()
        .name("sonance-reclaim".to_string())
        .spawn(move || {
            tracing::info!("reclamation thread started");
            for token in rx.iter() {
                reclaim(&token);
            }
        });
    if let Err(e) = spawned {
        // The receiver was dropped with the closure, so `defer` falls back to
        // inline release.
        tracing::error!(error = %e, "failed to spawn reclamation thread");
    }
    Reclaimer { tx }
}

/// Fires one token, logging the outcome. Returns whether the release
/// primitive ran.
fn reclaim(token: &ReleaseToken) -> bool {
    match token.fire() {
        Ok(true) => {
            tracing::trace!(kind = %token.kind(), handle = ?token.raw(), "reclaimed");
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::error!(
                kind = %token.kind(),
                handle = ?token.raw(),
                error = %e,
                "deferred release failed"
            );
            true
        }
    }
}

/// Receiving side of a [`Reclaimer::manual`] pair.
#[derive(Debug)]
pub struct ReclaimQueue {
    rx: Receiver<Arc<ReleaseToken>>,
}

impl ReclaimQueue {
    /// Releases everything queued so far. Returns the number of release
    /// primitives that ran (tokens already fired by `close()` are skipped).
    pub fn collect(&self) -> usize {
        let released = self.rx.try_iter().filter(|token| reclaim(token)).count();
        if released > 0 {
            tracing::trace!(released, "reclamation queue drained");
        }
        released
    }

    /// Number of tokens waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

// ── Handles ──

/// State shared by every wrapper created from one system.
pub(crate) struct Context {
    pub(crate) api: Arc<dyn NativeApi>,
    pub(crate) reclaimer: Reclaimer,
}

impl Context {
    pub(crate) fn new(api: Arc<dyn NativeApi>, reclaimer: Reclaimer) -> Arc<Self> {
        Arc::new(Self { api, reclaimer })
    }
}

/// Raw identity plus ownership of one native object.
pub struct NativeHandle {
    raw: RawHandle,
    kind: ObjectKind,
    ownership: Ownership,
    ctx: Arc<Context>,
}

impl NativeHandle {
    /// Owned handle released by the kind's default primitive.
    pub(crate) fn owned(ctx: &Arc<Context>, raw: RawHandle, kind: ObjectKind) -> Self {
        let api = Arc::clone(&ctx.api);
        Self::owned_with(ctx, raw, kind, move || release_primitive(&*api, kind, raw))
    }

    /// Owned handle with a custom release action.
    pub(crate) fn owned_with(
        ctx: &Arc<Context>,
        raw: RawHandle,
        kind: ObjectKind,
        release: impl FnOnce() -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        // A null identity or an engine-managed kind has nothing to release.
        let ownership = if raw.is_null() || !kind.is_releasable() {
            Ownership::Borrowed
        } else {
            Ownership::Owned(Arc::new(ReleaseToken::new(kind, raw, release)))
        };
        tracing::debug!(kind = %kind, handle = ?raw, "created");
        Self {
            raw,
            kind,
            ownership,
            ctx: Arc::clone(ctx),
        }
    }

    /// Borrowed handle for an object returned by a query.
    pub(crate) fn borrowed(ctx: &Arc<Context>, raw: RawHandle, kind: ObjectKind) -> Self {
        Self {
            raw,
            kind,
            ownership: Ownership::Borrowed,
            ctx: Arc::clone(ctx),
        }
    }

    /// Raw identity.
    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Object kind.
    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// `true` if this handle will release the object.
    pub fn is_owned(&self) -> bool {
        matches!(self.ownership, Ownership::Owned(_))
    }

    /// Ownership classification.
    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    /// A borrowed handle to the same object.
    pub fn to_borrowed(&self) -> Self {
        Self::borrowed(&self.ctx, self.raw, self.kind)
    }

    #[inline]
    pub(crate) fn api(&self) -> &dyn NativeApi {
        &*self.ctx.api
    }

    #[inline]
    pub(crate) fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Fires the release token now. No-op for borrowed or already released
    /// handles.
    pub(crate) fn release(&self) -> Result<(), EngineError> {
        if let Ownership::Owned(token) = &self.ownership
            && token.fire()?
        {
            tracing::debug!(kind = %self.kind, handle = ?self.raw, "closed");
        }
        Ok(())
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if let Ownership::Owned(token) = &self.ownership
            && !token.is_spent()
        {
            self.ctx.reclaimer.defer(Arc::clone(token));
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .field("owned", &self.is_owned())
            .finish()
    }
}

impl PartialEq for NativeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.kind == other.kind
    }
}

impl Eq for NativeHandle {}

/// Declares a wrapper struct around one [`NativeHandle`].
macro_rules! native_object {
    ($(#[$meta:meta])* $name:ident, $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq)]
        pub struct $name {
            handle: $crate::handle::NativeHandle,
        }

        impl $name {
            pub(crate) fn from_handle(handle: $crate::handle::NativeHandle) -> Self {
                Self { handle }
            }

            #[allow(dead_code)]
            pub(crate) fn owned(
                ctx: &std::sync::Arc<$crate::handle::Context>,
                raw: $crate::native::RawHandle,
            ) -> Self {
                Self::from_handle($crate::handle::NativeHandle::owned(
                    ctx,
                    raw,
                    $crate::handle::ObjectKind::$kind,
                ))
            }

            #[allow(dead_code)]
            pub(crate) fn borrowed(
                ctx: &std::sync::Arc<$crate::handle::Context>,
                raw: $crate::native::RawHandle,
            ) -> Self {
                Self::from_handle($crate::handle::NativeHandle::borrowed(
                    ctx,
                    raw,
                    $crate::handle::ObjectKind::$kind,
                ))
            }

            /// Borrowed wrapper, or `None` when a query wrote the null handle.
            #[allow(dead_code)]
            pub(crate) fn borrowed_opt(
                ctx: &std::sync::Arc<$crate::handle::Context>,
                raw: $crate::native::RawHandle,
            ) -> Option<Self> {
                (!raw.is_null()).then(|| Self::borrowed(ctx, raw))
            }

            /// Raw native identity.
            #[inline]
            pub fn raw(&self) -> $crate::native::RawHandle {
                self.handle.raw()
            }

            /// The underlying handle.
            #[inline]
            pub fn handle(&self) -> &$crate::handle::NativeHandle {
                &self.handle
            }

            /// `true` if dropping or closing this wrapper releases the object.
            pub fn is_owned(&self) -> bool {
                self.handle.is_owned()
            }

            /// A borrowed wrapper for the same object.
            pub fn to_borrowed(&self) -> Self {
                Self::from_handle(self.handle.to_borrowed())
            }
        }
    };
}

pub(crate) use native_object;

fn release_primitive(
    api: &dyn NativeApi,
    kind: ObjectKind,
    raw: RawHandle,
) -> Result<(), EngineError> {
    match kind {
        ObjectKind::System => crate::system::release_system(api, raw),
        ObjectKind::Sound => api.sound_release(raw).check("Sound_Release"),
        ObjectKind::ChannelGroup => api.channel_group_release(raw).check("ChannelGroup_Release"),
        ObjectKind::Dsp => api.dsp_release(raw).check("DSP_Release"),
        ObjectKind::SoundGroup => api.sound_group_release(raw).check("SoundGroup_Release"),
        ObjectKind::Channel | ObjectKind::DspConnection => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_token(counter: &Arc<AtomicUsize>) -> Arc<ReleaseToken> {
        let counter = Arc::clone(counter);
        Arc::new(ReleaseToken::new(ObjectKind::Sound, RawHandle(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    #[test]
    fn token_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = counting_token(&calls);
        assert!(!token.is_spent());
        assert!(token.fire().unwrap());
        assert!(!token.fire().unwrap());
        assert!(token.is_spent());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn token_reports_failure_once() {
        let token = ReleaseToken::new(ObjectKind::Dsp, RawHandle(3), || {
            Status::ERR_DSP_INUSE.check("DSP_Release")
        });
        let err = token.fire().unwrap_err();
        assert_eq!(err.status(), Status::ERR_DSP_INUSE);
        assert!(!token.fire().unwrap());
    }

    #[test]
    fn concurrent_fire_runs_action_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = counting_token(&calls);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let token = Arc::clone(&token);
                thread::spawn(move || token.fire().unwrap())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&fired| fired)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_queue_skips_spent_tokens() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (reclaimer, queue) = Reclaimer::manual();

        let first = counting_token(&calls);
        let second = counting_token(&calls);
        reclaimer.defer(Arc::clone(&first));
        reclaimer.defer(Arc::clone(&second));
        assert_eq!(queue.pending(), 2);

        // Explicit release wins the race for `first`.
        assert!(first.fire().unwrap());
        assert_eq!(queue.collect(), 1);
        assert_eq!(queue.pending(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn defer_ignores_spent_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (reclaimer, queue) = Reclaimer::manual();
        let token = counting_token(&calls);
        token.fire().unwrap();
        reclaimer.defer(token);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn closed_queue_releases_inline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (reclaimer, queue) = Reclaimer::manual();
        drop(queue);
        reclaimer.defer(counting_token(&calls));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn global_reclaimer_drains_in_background() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = counting_token(&calls);
        Reclaimer::global().defer(Arc::clone(&token));
        for _ in 0..200 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(token.is_spent());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_managed_kinds_are_never_owned() {
        assert!(!ObjectKind::Channel.is_releasable());
        assert!(!ObjectKind::DspConnection.is_releasable());
        assert!(ObjectKind::Sound.is_releasable());
        assert_eq!(ObjectKind::Dsp.to_string(), "DSP");
    }
}
