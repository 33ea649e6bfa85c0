//! Channel and channel-group notifications.
//!
//! The engine delivers every channel-control event through one untyped entry
//! point ([`NativeCallback::invoke`]) carrying a control-type tag, an event
//! tag and two payload words. A [`CallbackAdapter`] turns that into calls on a
//! typed dispatcher:
//!
//! 1. the control-type tag must match the adapter's kind, otherwise
//!    [`Error::ControlTypeMismatch`];
//! 2. the event tag must be known ([`DecodingError::UnknownCallbackType`]) and
//!    delivered to this kind ([`DecodingError::UnexpectedCallback`]);
//! 3. the payload is decoded with the fixed shape for that event;
//! 4. the raw control is wrapped as a borrowed [`Channel`] or [`ChannelGroup`]
//!    and handed to the current dispatcher, if any.
//!
//! Validation happens before the dispatcher slot is read, so malformed events
//! fail even when no dispatcher is installed.
//!
//! A control-type code that names no kind at all (anything but 0 or 1) is a
//! [`DecodingError::UnknownControlType`], not a mismatch: the mismatch error
//! reports two real kinds, and an unknown code is a malformed record.
//!
//! Each dispatcher method returns the [`Status`] handed back to the engine;
//! the defaults return [`Status::OK`]. With no dispatcher installed the
//! adapter answers `OK`.
//!
//! The dispatcher can be replaced or removed at any time from any thread. The
//! slot is an [`ArcSwapOption`]: the mixer thread sees either the old or the
//! new dispatcher, never a torn one.
//!
//! Dispatchers run on the engine's mixer thread and must not block.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use sonance_core::mock::MockEngine;
//! use sonance_core::{Channel, ChannelCallback, ChannelControl, ChannelCallbacks, Status, System};
//!
//! struct CountEnds(Arc<AtomicUsize>);
//!
//! impl ChannelCallback for CountEnds {
//!     fn on_end(&self, _channel: &Channel) -> Status {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!         Status::OK
//!     }
//! }
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine.clone()).build()?;
//! let sound = system.create_sound("hat.wav", Default::default())?;
//! let channel = system.play_sound(&sound, None, false)?;
//!
//! let ends = Arc::new(AtomicUsize::new(0));
//! let adapter = ChannelCallbacks::new(&system);
//! adapter.install(CountEnds(ends.clone()));
//! channel.set_callback(Some(&adapter))?;
//!
//! engine.emit_end(channel.raw())?;
//! assert_eq!(ends.load(Ordering::Relaxed), 1);
//! # Ok::<(), sonance_core::Error>(())
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::channel::Channel;
use crate::channel_group::ChannelGroup;
use crate::error::{DecodingError, Error, Result};
use crate::handle::{Context, NativeHandle, ObjectKind};
use crate::native::{NativeCallback, RawHandle, RawPtr, read_f32};
use crate::status::Status;
use crate::system::System;

/// Which half of the channel-control family an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// A single playing voice.
    Channel,
    /// A submix bus.
    ChannelGroup,
}

impl ControlKind {
    /// Native control-type code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Channel => 0,
            Self::ChannelGroup => 1,
        }
    }

    /// Decodes a native control-type code.
    pub fn from_code(code: i32) -> std::result::Result<Self, DecodingError> {
        match code {
            0 => Ok(Self::Channel),
            1 => Ok(Self::ChannelGroup),
            other => Err(DecodingError::UnknownControlType(other)),
        }
    }

    /// Native function prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Channel => "Channel",
            Self::ChannelGroup => "ChannelGroup",
        }
    }

    /// Object kind of controls of this type.
    pub const fn object_kind(self) -> ObjectKind {
        match self {
            Self::Channel => ObjectKind::Channel,
            Self::ChannelGroup => ObjectKind::ChannelGroup,
        }
    }

    /// Full primitive name, e.g. `ChannelGroup_SetVolume`.
    pub(crate) fn primitive(self, op: &str) -> Cow<'static, str> {
        Cow::Owned(format!("{}_{op}", self.prefix()))
    }
}

/// Event tag of a channel-control notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackType {
    /// A channel finished playing.
    End,
    /// A channel became virtual or real.
    VirtualVoice,
    /// Playback crossed a sync point.
    SyncPoint,
    /// Geometry occlusion is being computed.
    Occlusion,
}

impl CallbackType {
    /// Native event code.
    pub const fn code(self) -> i32 {
        match self {
            Self::End => 0,
            Self::VirtualVoice => 1,
            Self::SyncPoint => 2,
            Self::Occlusion => 3,
        }
    }

    /// Decodes a native event code.
    pub fn from_code(code: i32) -> std::result::Result<Self, DecodingError> {
        match code {
            0 => Ok(Self::End),
            1 => Ok(Self::VirtualVoice),
            2 => Ok(Self::SyncPoint),
            3 => Ok(Self::Occlusion),
            other => Err(DecodingError::UnknownCallbackType(other)),
        }
    }
}

/// A decoded notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallbackEvent {
    /// Playback ended.
    End,
    /// Virtual-voice state changed.
    VirtualVoice {
        /// `true` when the channel went virtual.
        is_virtual: bool,
    },
    /// A sync point was reached.
    SyncPoint {
        /// Index of the sync point within the sound.
        index: i32,
    },
    /// Occlusion values for this control.
    Occlusion {
        /// Direct path occlusion.
        direct: f32,
        /// Reverb path occlusion.
        reverb: f32,
    },
}

impl CallbackEvent {
    /// The event tag.
    pub const fn callback_type(&self) -> CallbackType {
        match self {
            Self::End => CallbackType::End,
            Self::VirtualVoice { .. } => CallbackType::VirtualVoice,
            Self::SyncPoint { .. } => CallbackType::SyncPoint,
            Self::Occlusion { .. } => CallbackType::Occlusion,
        }
    }
}

/// Typed channel notifications. Every method defaults to doing nothing and
/// returning [`Status::OK`].
pub trait ChannelCallback: Send + Sync {
    /// The channel finished playing and has been returned to the pool.
    fn on_end(&self, _channel: &Channel) -> Status {
        Status::OK
    }
    /// The channel switched between virtual and real.
    fn on_virtual_voice(&self, _channel: &Channel, _is_virtual: bool) -> Status {
        Status::OK
    }
    /// Playback crossed sync point `index`.
    fn on_sync_point(&self, _channel: &Channel, _index: i32) -> Status {
        Status::OK
    }
    /// Occlusion values were computed.
    fn on_occlusion(&self, _channel: &Channel, _direct: f32, _reverb: f32) -> Status {
        Status::OK
    }
}

/// Typed channel-group notifications.
pub trait ChannelGroupCallback: Send + Sync {
    /// Occlusion values were computed.
    fn on_occlusion(&self, _group: &ChannelGroup, _direct: f32, _reverb: f32) -> Status {
        Status::OK
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for dyn super::ChannelCallback {}
    impl Sealed for dyn super::ChannelGroupCallback {}
}

/// Routes decoded events to one kind of typed dispatcher.
///
/// Implemented for `dyn ChannelCallback` and `dyn ChannelGroupCallback`.
pub trait Dispatcher: sealed::Sealed + Send + Sync {
    /// Control kind this dispatcher serves.
    const KIND: ControlKind;

    /// Whether events of `callback` are ever delivered to this kind.
    fn accepts(callback: CallbackType) -> bool;

    /// Calls the typed method matching `event`, returning its status.
    fn dispatch(&self, control: NativeHandle, event: CallbackEvent) -> Status;
}

impl Dispatcher for dyn ChannelCallback {
    const KIND: ControlKind = ControlKind::Channel;

    fn accepts(_callback: CallbackType) -> bool {
        true
    }

    fn dispatch(&self, control: NativeHandle, event: CallbackEvent) -> Status {
        let channel = Channel::from_handle(control);
        match event {
            CallbackEvent::End => self.on_end(&channel),
            CallbackEvent::VirtualVoice { is_virtual } => {
                self.on_virtual_voice(&channel, is_virtual)
            }
            CallbackEvent::SyncPoint { index } => self.on_sync_point(&channel, index),
            CallbackEvent::Occlusion { direct, reverb } => {
                self.on_occlusion(&channel, direct, reverb)
            }
        }
    }
}

impl Dispatcher for dyn ChannelGroupCallback {
    const KIND: ControlKind = ControlKind::ChannelGroup;

    fn accepts(callback: CallbackType) -> bool {
        callback == CallbackType::Occlusion
    }

    fn dispatch(&self, control: NativeHandle, event: CallbackEvent) -> Status {
        match event {
            CallbackEvent::Occlusion { direct, reverb } => {
                self.on_occlusion(&ChannelGroup::from_handle(control), direct, reverb)
            }
            // rejected by `accepts` before dispatch
            _ => Status::OK,
        }
    }
}

/// Adapter from the generic notification entry point to a replaceable typed
/// dispatcher.
///
/// One adapter can serve any number of controls of its kind.
pub struct CallbackAdapter<D: ?Sized> {
    ctx: Arc<Context>,
    slot: ArcSwapOption<Box<D>>,
}

/// Adapter for channel notifications.
pub type ChannelCallbacks = CallbackAdapter<dyn ChannelCallback>;

/// Adapter for channel-group notifications.
pub type ChannelGroupCallbacks = CallbackAdapter<dyn ChannelGroupCallback>;

impl<D: ?Sized + Dispatcher> CallbackAdapter<D> {
    /// Creates an adapter with no dispatcher for objects of `system`.
    pub fn new(system: &System) -> Arc<Self> {
        Arc::new(Self {
            ctx: Arc::clone(system.handle().ctx()),
            slot: ArcSwapOption::empty(),
        })
    }

    /// Kind of control this adapter accepts.
    pub fn kind(&self) -> ControlKind {
        D::KIND
    }

    /// Replaces the dispatcher; `None` silences the adapter.
    pub fn set_dispatcher(&self, dispatcher: Option<Box<D>>) {
        self.slot.store(dispatcher.map(Arc::new));
    }

    /// `true` while a dispatcher is installed.
    pub fn has_dispatcher(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Decodes one raw notification without dispatching it.
    pub fn decode(
        &self,
        control_type: i32,
        callback_type: i32,
        data1: RawPtr,
        data2: RawPtr,
    ) -> Result<CallbackEvent> {
        let actual = ControlKind::from_code(control_type)?;
        if actual != D::KIND {
            return Err(Error::ControlTypeMismatch {
                expected: D::KIND,
                actual,
            });
        }
        let callback = CallbackType::from_code(callback_type)?;
        if !D::accepts(callback) {
            return Err(DecodingError::UnexpectedCallback {
                kind: D::KIND,
                callback,
            }
            .into());
        }
        let event = match callback {
            CallbackType::End => CallbackEvent::End,
            CallbackType::VirtualVoice => CallbackEvent::VirtualVoice {
                is_virtual: !data1.is_null(),
            },
            // The sync-point index travels in the pointer word itself.
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            CallbackType::SyncPoint => CallbackEvent::SyncPoint {
                index: data1.0 as i32,
            },
            CallbackType::Occlusion => {
                let api = &*self.ctx.api;
                CallbackEvent::Occlusion {
                    direct: read_f32(api, data1, "direct occlusion")?,
                    reverb: read_f32(api, data2, "reverb occlusion")?,
                }
            }
        };
        Ok(event)
    }
}

impl CallbackAdapter<dyn ChannelCallback> {
    /// Installs `dispatcher`, replacing any previous one.
    pub fn install(&self, dispatcher: impl ChannelCallback + 'static) {
        self.set_dispatcher(Some(Box::new(dispatcher)));
    }
}

impl CallbackAdapter<dyn ChannelGroupCallback> {
    /// Installs `dispatcher`, replacing any previous one.
    pub fn install(&self, dispatcher: impl ChannelGroupCallback + 'static) {
        self.set_dispatcher(Some(Box::new(dispatcher)));
    }
}

impl<D: ?Sized + Dispatcher> NativeCallback for CallbackAdapter<D> {
    fn invoke(
        &self,
        control: RawHandle,
        control_type: i32,
        callback_type: i32,
        data1: RawPtr,
        data2: RawPtr,
    ) -> Result<Status> {
        let event = self.decode(control_type, callback_type, data1, data2)?;
        let Some(dispatcher) = self.slot.load_full() else {
            return Ok(Status::OK);
        };
        let handle = NativeHandle::borrowed(&self.ctx, control, D::KIND.object_kind());
        Ok(dispatcher.dispatch(handle, event))
    }
}

impl<D: ?Sized + Dispatcher> fmt::Debug for CallbackAdapter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAdapter")
            .field("kind", &D::KIND)
            .field("dispatcher", &self.has_dispatcher())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(RawHandle, CallbackEvent)>>);

    impl Recorder {
        fn record(&self, raw: RawHandle, event: CallbackEvent) -> Status {
            self.0.lock().push((raw, event));
            Status::OK
        }
    }

    impl ChannelCallback for Arc<Recorder> {
        fn on_end(&self, channel: &Channel) -> Status {
            self.record(channel.raw(), CallbackEvent::End)
        }
        fn on_virtual_voice(&self, channel: &Channel, is_virtual: bool) -> Status {
            self.record(channel.raw(), CallbackEvent::VirtualVoice { is_virtual })
        }
        fn on_sync_point(&self, channel: &Channel, index: i32) -> Status {
            self.record(channel.raw(), CallbackEvent::SyncPoint { index })
        }
        fn on_occlusion(&self, channel: &Channel, direct: f32, reverb: f32) -> Status {
            self.record(channel.raw(), CallbackEvent::Occlusion { direct, reverb })
        }
    }

    impl ChannelGroupCallback for Arc<Recorder> {
        fn on_occlusion(&self, group: &ChannelGroup, direct: f32, reverb: f32) -> Status {
            self.record(group.raw(), CallbackEvent::Occlusion { direct, reverb })
        }
    }

    /// Refuses sync points, accepts everything else.
    struct RefuseSyncPoints;

    impl ChannelCallback for RefuseSyncPoints {
        fn on_sync_point(&self, _channel: &Channel, _index: i32) -> Status {
            Status::ERR_NOTREADY
        }
    }

    fn setup() -> (Arc<MockEngine>, System) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        (engine, system)
    }

    #[test]
    fn tags_decode() {
        assert_eq!(ControlKind::from_code(1).unwrap(), ControlKind::ChannelGroup);
        assert!(ControlKind::from_code(2).is_err());
        assert_eq!(CallbackType::from_code(3).unwrap(), CallbackType::Occlusion);
        assert_eq!(
            CallbackType::from_code(4).unwrap_err(),
            DecodingError::UnknownCallbackType(4)
        );
        assert_eq!(
            ControlKind::ChannelGroup.primitive("SetVolume"),
            "ChannelGroup_SetVolume"
        );
    }

    #[test]
    fn channel_payloads_decode() {
        let (engine, system) = setup();
        let recorder = Arc::new(Recorder::default());
        let adapter = ChannelCallbacks::new(&system);
        adapter.install(Arc::clone(&recorder));

        let ch = RawHandle(42);
        adapter.invoke(ch, 0, 0, RawPtr::NULL, RawPtr::NULL).unwrap();
        adapter.invoke(ch, 0, 1, RawPtr(1), RawPtr::NULL).unwrap();
        adapter.invoke(ch, 0, 1, RawPtr::NULL, RawPtr::NULL).unwrap();
        adapter.invoke(ch, 0, 2, RawPtr(5), RawPtr::NULL).unwrap();
        let direct = engine.alloc_f32(&[0.5]);
        let reverb = engine.alloc_f32(&[0.25]);
        adapter.invoke(ch, 0, 3, direct, reverb).unwrap();

        let events: Vec<_> = recorder.0.lock().iter().map(|(_, e)| *e).collect();
        assert_eq!(
            events,
            vec![
                CallbackEvent::End,
                CallbackEvent::VirtualVoice { is_virtual: true },
                CallbackEvent::VirtualVoice { is_virtual: false },
                CallbackEvent::SyncPoint { index: 5 },
                CallbackEvent::Occlusion {
                    direct: 0.5,
                    reverb: 0.25
                },
            ]
        );
        assert!(recorder.0.lock().iter().all(|(raw, _)| *raw == ch));
    }

    #[test]
    fn control_mismatch_is_checked_before_dispatch() {
        let (_engine, system) = setup();
        let recorder = Arc::new(Recorder::default());
        let adapter = ChannelCallbacks::new(&system);
        adapter.install(Arc::clone(&recorder));

        let err = adapter
            .invoke(RawHandle(1), 1, 0, RawPtr::NULL, RawPtr::NULL)
            .unwrap_err();
        assert_eq!(
            err,
            Error::ControlTypeMismatch {
                expected: ControlKind::Channel,
                actual: ControlKind::ChannelGroup,
            }
        );
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn unknown_control_code_is_a_decoding_error() {
        let (_engine, system) = setup();
        let recorder = Arc::new(Recorder::default());
        let adapter = ChannelCallbacks::new(&system);
        adapter.install(Arc::clone(&recorder));
        for code in [5, -1] {
            let err = adapter
                .invoke(RawHandle(1), code, 0, RawPtr::NULL, RawPtr::NULL)
                .unwrap_err();
            assert_eq!(err, Error::Decoding(DecodingError::UnknownControlType(code)));
        }
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn dispatcher_status_is_forwarded() {
        let (_engine, system) = setup();
        let adapter = ChannelCallbacks::new(&system);
        assert_eq!(
            adapter.invoke(RawHandle(1), 0, 2, RawPtr(3), RawPtr::NULL),
            Ok(Status::OK)
        );
        adapter.install(RefuseSyncPoints);
        assert_eq!(
            adapter.invoke(RawHandle(1), 0, 2, RawPtr(3), RawPtr::NULL),
            Ok(Status::ERR_NOTREADY)
        );
        assert_eq!(
            adapter.invoke(RawHandle(1), 0, 0, RawPtr::NULL, RawPtr::NULL),
            Ok(Status::OK)
        );
    }

    #[test]
    fn unknown_event_fails_without_dispatcher() {
        let (_engine, system) = setup();
        let adapter = ChannelCallbacks::new(&system);
        assert!(!adapter.has_dispatcher());
        let err = adapter
            .invoke(RawHandle(1), 0, 9, RawPtr::NULL, RawPtr::NULL)
            .unwrap_err();
        assert_eq!(err, Error::Decoding(DecodingError::UnknownCallbackType(9)));
    }

    #[test]
    fn group_adapter_rejects_channel_only_events() {
        let (_engine, system) = setup();
        let adapter = ChannelGroupCallbacks::new(&system);
        for code in 0..3 {
            let err = adapter
                .invoke(RawHandle(1), 1, code, RawPtr(1), RawPtr::NULL)
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Decoding(DecodingError::UnexpectedCallback {
                    kind: ControlKind::ChannelGroup,
                    ..
                })
            ));
        }
    }

    #[test]
    fn group_occlusion_dispatches() {
        let (engine, system) = setup();
        let recorder = Arc::new(Recorder::default());
        let adapter = ChannelGroupCallbacks::new(&system);
        adapter.install(Arc::clone(&recorder));
        let direct = engine.alloc_f32(&[1.0]);
        let reverb = engine.alloc_f32(&[0.0]);
        adapter.invoke(RawHandle(9), 1, 3, direct, reverb).unwrap();
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[test]
    fn null_occlusion_payload_is_decoding_error() {
        let (engine, system) = setup();
        let adapter = ChannelCallbacks::new(&system);
        let direct = engine.alloc_f32(&[1.0]);
        let err = adapter
            .invoke(RawHandle(1), 0, 3, direct, RawPtr::NULL)
            .unwrap_err();
        assert_eq!(
            err,
            Error::Decoding(DecodingError::NullPayload {
                what: "reverb occlusion"
            })
        );
    }

    #[test]
    fn dispatcher_can_be_swapped_and_cleared() {
        let (_engine, system) = setup();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let adapter = ChannelCallbacks::new(&system);

        adapter.install(Arc::clone(&first));
        adapter.invoke(RawHandle(1), 0, 0, RawPtr::NULL, RawPtr::NULL).unwrap();
        adapter.install(Arc::clone(&second));
        adapter.invoke(RawHandle(1), 0, 0, RawPtr::NULL, RawPtr::NULL).unwrap();
        adapter.set_dispatcher(None);
        adapter.invoke(RawHandle(1), 0, 0, RawPtr::NULL, RawPtr::NULL).unwrap();

        assert_eq!(first.0.lock().len(), 1);
        assert_eq!(second.0.lock().len(), 1);
    }
}
