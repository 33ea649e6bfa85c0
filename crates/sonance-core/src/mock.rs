//! In-process engine for tests and headless tools.
//!
//! [`MockEngine`] implements [`NativeApi`] over a plain object table. It
//! keeps enough state for every wrapper operation to round-trip, and adds
//! the hooks tests need:
//!
//! - per-primitive call counters ([`call_count`](MockEngine::call_count));
//! - one-shot status injection ([`fail_next`](MockEngine::fail_next));
//! - engine-side reclamation ([`invalidate`](MockEngine::invalidate),
//!   [`steal`](MockEngine::steal), [`emit_end`](MockEngine::emit_end));
//! - callback emission with real payload pointers into a private heap;
//! - spectrum and parameter-descriptor injection for DSP units.
//!
//! Handles are never reused, so a released identity stays stale forever and
//! reports [`Status::ERR_INVALID_HANDLE`].
//!
//! ```rust
//! use std::sync::Arc;
//! use sonance_core::mock::MockEngine;
//! use sonance_core::{ChannelControl, Status, System};
//!
//! let engine = Arc::new(MockEngine::new());
//! let system = System::builder(engine.clone()).build()?;
//! let sound = system.create_sound("loop.wav", Default::default())?;
//! let channel = system.play_sound(&sound, None, false)?;
//!
//! engine.fail_next("Channel_SetVolume", Status::ERR_INVALID_FLOAT);
//! assert!(channel.set_volume(f32::NAN).is_err());
//! assert_eq!(engine.call_count("Channel_SetVolume"), 1);
//!
//! engine.steal(channel.raw());
//! assert!(!channel.is_valid()?);
//! # Ok::<(), sonance_core::Error>(())
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::callback::{CallbackType, ControlKind};
use crate::channel_control::{DSP_INDEX_FADER, DSP_INDEX_HEAD, DSP_INDEX_TAIL};
use crate::effects::{self, CrossoverSlope, EqFilter};
use crate::error::{self, EngineError};
use crate::fft;
use crate::flags::{
    DspConnectionType, DspType, InitFlags, Mode, SpeakerMode, TagDataType, TagType, TimeUnit,
};
use crate::native::{HEADER_VERSION, NativeApi, NativeCallback, RawHandle, RawPtr};
use crate::param::{ParameterDescriptor, ParameterKind, RawParameterDesc};
use crate::spectrum::{MAX_CHANNELS, MeteringInfo, SPECTRUM_RECORD_LEN};
use crate::status::Status;
use crate::tag::RawTag;

/// First handle value handed out.
const HANDLE_BASE: usize = 0x100;
/// First heap address handed out. Low addresses are never mapped.
const HEAP_BASE: usize = 0x1000_0000;
/// Build number reported by `System_GetVersion`.
const MOCK_BUILD: u32 = 150;
/// Length of every mock sound, in milliseconds.
const SOUND_LENGTH_MS: u32 = 1000;

/// Deterministic in-process [`NativeApi`].
pub struct MockEngine {
    state: Mutex<State>,
}

// ── Object table ──

#[derive(Clone, Default)]
struct MatrixState {
    out: i32,
    inp: i32,
    data: Vec<f32>,
}

struct ControlState {
    paused: bool,
    volume: f32,
    volume_ramp: bool,
    pitch: f32,
    mute: bool,
    mode: Mode,
    pan: f32,
    levels_in: Vec<f32>,
    levels_out: [f32; 8],
    matrix: Option<MatrixState>,
    fader: RawHandle,
    dsps: Vec<RawHandle>,
    delay: (u64, u64, bool),
    fade_points: BTreeMap<u64, f32>,
    callback: Option<Arc<dyn NativeCallback>>,
}

impl ControlState {
    fn new(fader: RawHandle, mode: Mode) -> Self {
        Self {
            paused: false,
            volume: 1.0,
            volume_ramp: true,
            pitch: 1.0,
            mute: false,
            mode,
            pan: 0.0,
            levels_in: Vec::new(),
            levels_out: [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            matrix: None,
            fader,
            dsps: vec![fader],
            delay: (0, 0, false),
            fade_points: BTreeMap::new(),
            callback: None,
        }
    }
}

struct SystemState {
    initialized: bool,
    init: Option<(i32, InitFlags)>,
    software_channels: i32,
    sample_rate: i32,
    speaker_mode: i32,
    raw_speakers: i32,
    dsp_buffer: (u32, i32),
    stream_buffer: (u32, TimeUnit),
    network_timeout: i32,
    proxy: String,
    master_group: RawHandle,
    master_sound_group: RawHandle,
    next_channel_index: i32,
    dsp_locked: bool,
    clock: u64,
}

struct SoundState {
    system: RawHandle,
    name: String,
    mode: Mode,
    loop_count: i32,
    loop_points: (u32, u32),
    defaults: (f32, i32),
    sound_group: RawHandle,
    tags: Vec<MockTag>,
}

struct MockTag {
    tag_type: i32,
    data_type: i32,
    name: String,
    bytes: Vec<u8>,
    updated: bool,
}

struct ChannelState {
    system: RawHandle,
    control: ControlState,
    sound: RawHandle,
    group: RawHandle,
    frequency: f32,
    priority: i32,
    position: u32,
    loop_count: i32,
    loop_points: (u32, u32),
    index: i32,
}

struct GroupState {
    system: RawHandle,
    name: String,
    control: ControlState,
    parent: RawHandle,
    connection: RawHandle,
    children: Vec<RawHandle>,
}

struct DspState {
    system: RawHandle,
    dsp_type: i32,
    inputs: Vec<(RawHandle, RawHandle)>,
    outputs: Vec<(RawHandle, RawHandle)>,
    descriptors: BTreeMap<i32, RawParameterDesc>,
    floats: HashMap<i32, f32>,
    ints: HashMap<i32, i32>,
    bools: HashMap<i32, bool>,
    data: HashMap<i32, Vec<u8>>,
    spectrum: Vec<Vec<f32>>,
    active: bool,
    bypass: bool,
    wet_dry: (f32, f32, f32),
    metering: (bool, bool),
    channel_format: (u32, i32, i32),
}

impl DspState {
    fn new(system: RawHandle, dsp_type: i32) -> Self {
        let mut dsp = Self {
            system,
            dsp_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            descriptors: BTreeMap::new(),
            floats: HashMap::new(),
            ints: HashMap::new(),
            bools: HashMap::new(),
            data: HashMap::new(),
            spectrum: Vec::new(),
            active: false,
            bypass: false,
            wet_dry: (1.0, 1.0, 0.0),
            metering: (false, false),
            channel_format: (0, 2, SpeakerMode::Stereo.code()),
        };
        match DspType::from_code(dsp_type) {
            Ok(DspType::Fft) => dsp.install_parameters(fft_parameters()),
            Ok(DspType::MultibandEq) => dsp.install_parameters(multiband_eq_parameters()),
            Ok(DspType::ThreeEq) => dsp.install_parameters(three_eq_parameters()),
            Ok(DspType::Compressor) => dsp.install_parameters(compressor_parameters()),
            Ok(DspType::Chorus) => dsp.install_parameters(chorus_parameters()),
            _ => {}
        }
        dsp
    }

    /// Registers descriptors and seeds each value with its default.
    fn install_parameters(&mut self, parameters: Vec<(i32, RawParameterDesc)>) {
        for (index, raw) in parameters {
            match ParameterDescriptor::decode(&raw).map(|d| d.kind) {
                Ok(ParameterKind::Float { default, .. }) => {
                    self.floats.insert(index, default);
                }
                Ok(ParameterKind::Int { default, .. }) => {
                    self.ints.insert(index, default);
                }
                Ok(ParameterKind::Bool { default }) => {
                    self.bools.insert(index, default);
                }
                Ok(ParameterKind::Data { .. }) | Err(_) => {}
            }
            self.descriptors.insert(index, raw);
        }
    }

    fn is_fft(&self) -> bool {
        self.dsp_type == DspType::Fft.code()
    }

    fn check_index(&self, index: i32) -> Result<(), Status> {
        if index < 0 || (!self.descriptors.is_empty() && !self.descriptors.contains_key(&index)) {
            return Err(Status::ERR_INVALID_PARAM);
        }
        Ok(())
    }
}

// ── Built-in parameter tables ──

fn fft_parameters() -> Vec<(i32, RawParameterDesc)> {
    use fft::param;

    let record_len = i32::try_from(SPECTRUM_RECORD_LEN).unwrap_or(i32::MAX);
    vec![
        (param::WINDOW_SIZE, RawParameterDesc::int("Window Size", "", "Transform length", 128, 16384, 2048)),
        (param::WINDOW, RawParameterDesc::int("Window", "", "Window shape", 0, 5, 2)),
        (param::BAND_START_FREQ, RawParameterDesc::float("Band Start", "Hz", "Lower band edge", 0.0, 96_000.0, 0.0)),
        (param::BAND_STOP_FREQ, RawParameterDesc::float("Band Stop", "Hz", "Upper band edge", 0.0, 96_000.0, 22_000.0)),
        (param::SPECTRUM_DATA, RawParameterDesc::data("Spectrum", "", "Magnitude spectrum", record_len, RawPtr::NULL)),
        (param::RMS, RawParameterDesc::float("RMS", "", "Block RMS", 0.0, 10.0, 0.0)),
        (param::SPECTRAL_CENTROID, RawParameterDesc::float("Centroid", "Hz", "Spectral centroid", 0.0, 96_000.0, 0.0)),
        (param::IMMEDIATE_MODE, RawParameterDesc::bool("Immediate", "", "Analyse every block", false)),
        (param::DOWNMIX, RawParameterDesc::int("Downmix", "", "Downmix before analysis", 0, 1, 0)),
        (param::CHANNEL, RawParameterDesc::int("Channel", "", "Analysed channel", -1, 31, -1)),
    ]
}

fn multiband_eq_parameters() -> Vec<(i32, RawParameterDesc)> {
    use effects::multiband_eq::param;

    let bands = [
        ("A", param::A_FILTER, EqFilter::Lowpass12Db),
        ("B", param::B_FILTER, EqFilter::Disabled),
        ("C", param::C_FILTER, EqFilter::Disabled),
        ("D", param::D_FILTER, EqFilter::Disabled),
        ("E", param::E_FILTER, EqFilter::Disabled),
    ];
    let mut parameters = Vec::with_capacity(bands.len() * 4);
    for (band, first, filter) in bands {
        parameters.extend([
            (first, RawParameterDesc::int(&format!("{band} Filter"), "", "Filter type", 0, 14, filter.code())),
            (first + 1, RawParameterDesc::float(&format!("{band} Frequency"), "Hz", "Frequency", 20.0, 22_000.0, 8000.0)),
            (first + 2, RawParameterDesc::float(&format!("{band} Q"), "", "Quality factor", 0.1, 10.0, 0.707)),
            (first + 3, RawParameterDesc::float(&format!("{band} Gain"), "dB", "Gain", -30.0, 30.0, 0.0)),
        ]);
    }
    parameters
}

fn three_eq_parameters() -> Vec<(i32, RawParameterDesc)> {
    use effects::three_eq::param;

    vec![
        (param::LOW_GAIN, RawParameterDesc::float("Low Gain", "dB", "Low band gain", -80.0, 10.0, 0.0)),
        (param::MID_GAIN, RawParameterDesc::float("Mid Gain", "dB", "Mid band gain", -80.0, 10.0, 0.0)),
        (param::HIGH_GAIN, RawParameterDesc::float("High Gain", "dB", "High band gain", -80.0, 10.0, 0.0)),
        (param::LOW_CROSSOVER, RawParameterDesc::float("Low Crossover", "Hz", "Low/mid split", 10.0, 22_000.0, 400.0)),
        (param::HIGH_CROSSOVER, RawParameterDesc::float("High Crossover", "Hz", "Mid/high split", 10.0, 22_000.0, 4000.0)),
        (param::CROSSOVER_SLOPE, RawParameterDesc::int("Slope", "", "Crossover slope", 0, 2, CrossoverSlope::Db24.code())),
    ]
}

fn compressor_parameters() -> Vec<(i32, RawParameterDesc)> {
    use effects::compressor::param;

    vec![
        (param::THRESHOLD, RawParameterDesc::float("Threshold", "dB", "Threshold", -60.0, 0.0, 0.0)),
        (param::RATIO, RawParameterDesc::float("Ratio", "", "Compression ratio", 1.0, 50.0, 2.5)),
        (param::ATTACK, RawParameterDesc::float("Attack", "ms", "Attack time", 0.1, 500.0, 20.0)),
        (param::RELEASE, RawParameterDesc::float("Release", "ms", "Release time", 10.0, 5000.0, 100.0)),
        (param::GAIN_MAKEUP, RawParameterDesc::float("Make Up Gain", "dB", "Makeup gain", -30.0, 30.0, 0.0)),
        (param::USE_SIDECHAIN, RawParameterDesc::data("Use Sidechain", "", "Side-chain settings", 4, RawPtr::NULL)),
        (param::LINKED, RawParameterDesc::bool("Linked", "", "Link channel detection", true)),
    ]
}

fn chorus_parameters() -> Vec<(i32, RawParameterDesc)> {
    use effects::chorus::param;

    vec![
        (param::MIX, RawParameterDesc::float("Mix", "%", "Wet/dry mix", 0.0, 100.0, 50.0)),
        (param::RATE, RawParameterDesc::float("Rate", "Hz", "Modulation rate", 0.0, 20.0, 0.8)),
        (param::DEPTH, RawParameterDesc::float("Depth", "ms", "Modulation depth", 0.0, 100.0, 3.0)),
    ]
}

struct ConnectionState {
    system: RawHandle,
    input: RawHandle,
    output: RawHandle,
    connection_type: i32,
    mix: f32,
    matrix: Option<MatrixState>,
}

struct SoundGroupState {
    system: RawHandle,
    name: String,
    max_audible: i32,
    behavior: i32,
    mute_fade_speed: f32,
    volume: f32,
}

enum Object {
    System(SystemState),
    Sound(SoundState),
    Channel(ChannelState),
    ChannelGroup(GroupState),
    Dsp(DspState),
    Connection(ConnectionState),
    SoundGroup(SoundGroupState),
}

impl Object {
    fn owner(&self) -> Option<RawHandle> {
        match self {
            Self::System(_) => None,
            Self::Sound(o) => Some(o.system),
            Self::Channel(o) => Some(o.system),
            Self::ChannelGroup(o) => Some(o.system),
            Self::Dsp(o) => Some(o.system),
            Self::Connection(o) => Some(o.system),
            Self::SoundGroup(o) => Some(o.system),
        }
    }
}

macro_rules! accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty);)+) => {
        $(
            fn $get(&self, raw: RawHandle) -> Result<&$ty, Status> {
                match self.lookup(raw)? {
                    Object::$variant(o) => Ok(o),
                    _ => Err(Status::ERR_INVALID_HANDLE),
                }
            }

            fn $get_mut(&mut self, raw: RawHandle) -> Result<&mut $ty, Status> {
                match self.lookup_mut(raw)? {
                    Object::$variant(o) => Ok(o),
                    _ => Err(Status::ERR_INVALID_HANDLE),
                }
            }
        )+
    };
}

#[derive(Default)]
struct State {
    next_handle: usize,
    next_addr: usize,
    objects: BTreeMap<RawHandle, Object>,
    stolen: HashSet<RawHandle>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, Status>,
    heap: BTreeMap<usize, Vec<u8>>,
}

impl State {
    accessors! {
        system, system_mut => System(SystemState);
        sound, sound_mut => Sound(SoundState);
        channel, channel_mut => Channel(ChannelState);
        group, group_mut => ChannelGroup(GroupState);
        dsp, dsp_mut => Dsp(DspState);
        connection, connection_mut => Connection(ConnectionState);
        sound_group, sound_group_mut => SoundGroup(SoundGroupState);
    }

    fn lookup(&self, raw: RawHandle) -> Result<&Object, Status> {
        if self.stolen.contains(&raw) {
            return Err(Status::ERR_CHANNEL_STOLEN);
        }
        self.objects.get(&raw).ok_or(Status::ERR_INVALID_HANDLE)
    }

    fn lookup_mut(&mut self, raw: RawHandle) -> Result<&mut Object, Status> {
        if self.stolen.contains(&raw) {
            return Err(Status::ERR_CHANNEL_STOLEN);
        }
        self.objects.get_mut(&raw).ok_or(Status::ERR_INVALID_HANDLE)
    }

    fn control(&self, kind: ControlKind, raw: RawHandle) -> Result<&ControlState, Status> {
        match (kind, self.lookup(raw)?) {
            (ControlKind::Channel, Object::Channel(c)) => Ok(&c.control),
            (ControlKind::ChannelGroup, Object::ChannelGroup(g)) => Ok(&g.control),
            _ => Err(Status::ERR_INVALID_HANDLE),
        }
    }

    fn control_mut(&mut self, kind: ControlKind, raw: RawHandle) -> Result<&mut ControlState, Status> {
        match (kind, self.lookup_mut(raw)?) {
            (ControlKind::Channel, Object::Channel(c)) => Ok(&mut c.control),
            (ControlKind::ChannelGroup, Object::ChannelGroup(g)) => Ok(&mut g.control),
            _ => Err(Status::ERR_INVALID_HANDLE),
        }
    }

    fn control_system(&self, kind: ControlKind, raw: RawHandle) -> Result<RawHandle, Status> {
        match (kind, self.lookup(raw)?) {
            (ControlKind::Channel, Object::Channel(c)) => Ok(c.system),
            (ControlKind::ChannelGroup, Object::ChannelGroup(g)) => Ok(g.system),
            _ => Err(Status::ERR_INVALID_HANDLE),
        }
    }

    fn insert(&mut self, object: Object) -> RawHandle {
        if self.next_handle == 0 {
            self.next_handle = HANDLE_BASE;
        }
        let raw = RawHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(raw, object);
        raw
    }

    // ── Heap ──

    fn alloc(&mut self, bytes: &[u8]) -> RawPtr {
        if self.next_addr == 0 {
            self.next_addr = HEAP_BASE;
        }
        let addr = self.next_addr;
        self.next_addr += bytes.len().max(1).next_multiple_of(16);
        self.heap.insert(addr, bytes.to_vec());
        RawPtr(addr)
    }

    fn read(&self, ptr: RawPtr, out: &mut [u8]) -> bool {
        let Some((&base, block)) = self.heap.range(..=ptr.0).next_back() else {
            return false;
        };
        let start = ptr.0 - base;
        let Some(end) = start.checked_add(out.len()) else {
            return false;
        };
        match block.get(start..end) {
            Some(src) => {
                out.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    fn alloc_spectrum<C: AsRef<[f32]>>(&mut self, channels: &[C]) -> RawPtr {
        let length = channels.first().map_or(0, |c| c.as_ref().len());
        let mut record = vec![0u8; SPECTRUM_RECORD_LEN];
        record[0..4].copy_from_slice(&len_i32(length).to_ne_bytes());
        record[4..8].copy_from_slice(&len_i32(channels.len()).to_ne_bytes());
        let word = mem::size_of::<usize>();
        for (index, channel) in channels.iter().take(MAX_CHANNELS).enumerate() {
            let ptr = self.alloc(&f32_bytes(channel.as_ref()));
            let at = 8 + index * word;
            record[at..at + word].copy_from_slice(&ptr.0.to_ne_bytes());
        }
        self.alloc(&record)
    }

    // ── Graph helpers ──

    fn new_fader(&mut self, system: RawHandle) -> RawHandle {
        self.insert(Object::Dsp(DspState::new(system, DspType::Fader.code())))
    }

    fn new_group(&mut self, system: RawHandle, name: &str, parent: RawHandle) -> RawHandle {
        let fader = self.new_fader(system);
        let group = self.insert(Object::ChannelGroup(GroupState {
            system,
            name: name.to_owned(),
            control: ControlState::new(fader, Mode::DEFAULT),
            parent: RawHandle::NULL,
            connection: RawHandle::NULL,
            children: Vec::new(),
        }));
        if !parent.is_null() {
            self.attach_group(group, parent);
        }
        group
    }

    /// Moves `child` under `parent`, replacing its connection.
    fn attach_group(&mut self, child: RawHandle, parent: RawHandle) -> RawHandle {
        let (system, old_parent, old_connection, child_fader) = match self.group(child) {
            Ok(g) => (g.system, g.parent, g.connection, g.control.fader),
            Err(_) => return RawHandle::NULL,
        };
        if let Ok(old) = self.group_mut(old_parent) {
            old.children.retain(|&c| c != child);
        }
        self.objects.remove(&old_connection);

        let parent_fader = self.group(parent).map_or(RawHandle::NULL, |p| p.control.fader);
        let connection = self.insert(Object::Connection(ConnectionState {
            system,
            input: child_fader,
            output: parent_fader,
            connection_type: DspConnectionType::Standard.code(),
            mix: 1.0,
            matrix: None,
        }));
        if let Ok(p) = self.group_mut(parent) {
            p.children.push(child);
        }
        if let Ok(g) = self.group_mut(child) {
            g.parent = parent;
            g.connection = connection;
        }
        connection
    }

    fn channels_where(&self, mut keep: impl FnMut(&ChannelState) -> bool) -> Vec<RawHandle> {
        self.objects
            .iter()
            .filter_map(|(&raw, object)| match object {
                Object::Channel(c) if keep(c) => Some(raw),
                _ => None,
            })
            .collect()
    }

    fn group_tree(&self, root: RawHandle) -> Vec<RawHandle> {
        let mut tree = vec![root];
        let mut next = 0;
        while next < tree.len() {
            if let Ok(g) = self.group(tree[next]) {
                tree.extend(g.children.iter().copied());
            }
            next += 1;
        }
        tree
    }

    fn end_channel(&mut self, raw: RawHandle) {
        if let Some(Object::Channel(c)) = self.objects.remove(&raw) {
            self.objects.remove(&c.control.fader);
        }
    }

    fn remove_connection(&mut self, connection: RawHandle) {
        if let Some(Object::Connection(c)) = self.objects.remove(&connection) {
            if let Ok(output) = self.dsp_mut(c.output) {
                output.inputs.retain(|&(_, h)| h != connection);
            }
            if let Ok(input) = self.dsp_mut(c.input) {
                input.outputs.retain(|&(_, h)| h != connection);
            }
        }
    }

    fn dsp_in_use(&self, dsp: RawHandle) -> bool {
        self.objects.values().any(|object| match object {
            Object::Channel(c) => c.control.dsps.contains(&dsp),
            Object::ChannelGroup(g) => g.control.dsps.contains(&dsp),
            _ => false,
        })
    }

    fn release_group(&mut self, raw: RawHandle) -> Result<(), Status> {
        let (system, parent, connection, fader, children) = {
            let g = self.group(raw)?;
            (g.system, g.parent, g.connection, g.control.fader, g.children.clone())
        };
        let master = self.system(system)?.master_group;
        if raw == master {
            return Err(Status::ERR_INVALID_PARAM);
        }
        for channel in self.channels_where(|c| c.group == raw) {
            if let Ok(c) = self.channel_mut(channel) {
                c.group = master;
            }
        }
        for child in children {
            self.attach_group(child, master);
        }
        if let Ok(p) = self.group_mut(parent) {
            p.children.retain(|&c| c != raw);
        }
        self.objects.remove(&connection);
        self.objects.remove(&fader);
        self.objects.remove(&raw);
        Ok(())
    }

    fn play(
        &mut self,
        system: RawHandle,
        sound: RawHandle,
        group: RawHandle,
        paused: bool,
    ) -> Result<RawHandle, Status> {
        let master = self.system(system)?.master_group;
        let group = if group.is_null() { master } else { group };
        self.group(group)?;
        let (mode, loop_count, loop_points, (frequency, priority)) = if sound.is_null() {
            (Mode::DEFAULT, 0, (0, 0), (48_000.0, 128))
        } else {
            let s = self.sound(sound)?;
            (s.mode, s.loop_count, s.loop_points, s.defaults)
        };
        let index = {
            let sys = self.system_mut(system)?;
            let index = sys.next_channel_index;
            sys.next_channel_index += 1;
            index
        };
        let fader = self.new_fader(system);
        let mut control = ControlState::new(fader, mode);
        control.paused = paused;
        Ok(self.insert(Object::Channel(ChannelState {
            system,
            control,
            sound,
            group,
            frequency,
            priority,
            position: 0,
            loop_count,
            loop_points,
            index,
        })))
    }

    fn set_spectrum(&mut self, dsp: RawHandle, channels: &[&[f32]]) {
        let sample_rate = self
            .dsp(dsp)
            .and_then(|d| self.system(d.system))
            .map_or(48_000, |s| s.sample_rate);
        let Ok(state) = self.dsp_mut(dsp) else {
            tracing::warn!(handle = ?dsp, "set_spectrum on unknown DSP");
            return;
        };
        state.spectrum = channels.iter().map(|c| c.to_vec()).collect();
        let (rms, centroid) = spectrum_stats(channels, sample_rate);
        state.floats.insert(fft::param::RMS, rms);
        state.floats.insert(fft::param::SPECTRAL_CENTROID, centroid);
    }
}

#[allow(clippy::cast_precision_loss)]
fn spectrum_stats(channels: &[&[f32]], sample_rate: i32) -> (f32, f32) {
    let bins: Vec<f32> = channels.iter().flat_map(|c| c.iter().copied()).collect();
    if bins.is_empty() {
        return (0.0, 0.0);
    }
    let rms = (bins.iter().map(|m| m * m).sum::<f32>() / bins.len() as f32).sqrt();
    let Some(first) = channels.first() else {
        return (rms, 0.0);
    };
    let hz_per_bin = sample_rate as f32 / 2.0 / first.len().max(1) as f32;
    let total: f32 = first.iter().sum();
    let centroid = if total > 0.0 {
        first
            .iter()
            .enumerate()
            .map(|(i, m)| i as f32 * hz_per_bin * m)
            .sum::<f32>()
            / total
    } else {
        0.0
    };
    (rms, centroid)
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn to_usize(value: i32) -> Option<usize> {
    usize::try_from(value).ok()
}

fn read_stored_matrix(
    stored: Option<&MatrixState>,
    buf: Option<&mut [f32]>,
    out: &mut i32,
    inp: &mut i32,
    hop: i32,
) -> Result<(), Status> {
    let Some(matrix) = stored else {
        *out = 0;
        *inp = 0;
        return Ok(());
    };
    *out = matrix.out;
    *inp = matrix.inp;
    if let Some(buf) = buf {
        let hop = if hop == 0 { matrix.inp } else { hop };
        let (rows, cols, hop) = match (to_usize(matrix.out), to_usize(matrix.inp), to_usize(hop)) {
            (Some(r), Some(c), Some(h)) if h >= c => (r, c, h),
            _ => return Err(Status::ERR_INVALID_PARAM),
        };
        if rows > 0 && buf.len() < (rows - 1) * hop + cols {
            return Err(Status::ERR_INVALID_PARAM);
        }
        for row in 0..rows {
            buf[row * hop..row * hop + cols]
                .copy_from_slice(&matrix.data[row * cols..(row + 1) * cols]);
        }
    }
    Ok(())
}

fn pack_matrix(matrix: &[f32], out: i32, inp: i32, hop: i32) -> Result<MatrixState, Status> {
    let hop = if hop == 0 { inp } else { hop };
    let (rows, cols, hop) = match (to_usize(out), to_usize(inp), to_usize(hop)) {
        (Some(r), Some(c), Some(h)) if r > 0 && c > 0 && h >= c => (r, c, h),
        _ => return Err(Status::ERR_INVALID_PARAM),
    };
    if matrix.len() < (rows - 1) * hop + cols {
        return Err(Status::ERR_INVALID_PARAM);
    }
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        data.extend_from_slice(&matrix[row * hop..row * hop + cols]);
    }
    Ok(MatrixState { out, inp, data })
}

fn sound_length(unit: TimeUnit) -> u32 {
    let frames = SOUND_LENGTH_MS * 48;
    if unit == TimeUnit::PCM {
        frames
    } else if unit == TimeUnit::PCM_BYTES || unit == TimeUnit::RAW_BYTES {
        frames * 4
    } else {
        SOUND_LENGTH_MS
    }
}

fn chain_slot(dsps: &[RawHandle], fader: RawHandle, index: i32) -> Result<usize, Status> {
    match index {
        DSP_INDEX_HEAD => Ok(0),
        DSP_INDEX_FADER => Ok(dsps.iter().position(|&d| d == fader).unwrap_or(0)),
        DSP_INDEX_TAIL => Ok(dsps.len()),
        _ => to_usize(index)
            .filter(|&i| i <= dsps.len())
            .ok_or(Status::ERR_INVALID_PARAM),
    }
}

fn chain_get(dsps: &[RawHandle], fader: RawHandle, index: i32) -> Result<RawHandle, Status> {
    let found = match index {
        DSP_INDEX_HEAD => dsps.first().copied(),
        DSP_INDEX_FADER => Some(fader),
        DSP_INDEX_TAIL => dsps.last().copied(),
        _ => to_usize(index).and_then(|i| dsps.get(i).copied()),
    };
    found.ok_or(Status::ERR_INVALID_PARAM)
}

fn status_of(result: Result<(), Status>) -> Status {
    match result {
        Ok(()) => Status::OK,
        Err(status) => status,
    }
}

impl MockEngine {
    /// An engine with no objects.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Counts the call, consumes an injected failure if one is pending, and
    /// otherwise runs `op` on the object table.
    fn call(&self, primitive: &str, op: impl FnOnce(&mut State) -> Result<(), Status>) -> Status {
        let mut state = self.state.lock();
        *state.calls.entry(primitive.to_owned()).or_default() += 1;
        if let Some(status) = state.failures.remove(primitive) {
            tracing::trace!(primitive, status = %status.name(), "injected failure");
            return status;
        }
        status_of(op(&mut state))
    }

    fn control_call(
        &self,
        kind: ControlKind,
        op: &str,
        body: impl FnOnce(&mut State) -> Result<(), Status>,
    ) -> Status {
        self.call(&kind.primitive(op), body)
    }

    // ── Test hooks ──

    /// How many times `primitive` (e.g. `"Sound_Release"`) has been called,
    /// including calls that failed.
    pub fn call_count(&self, primitive: &str) -> usize {
        self.state.lock().calls.get(primitive).copied().unwrap_or(0)
    }

    /// Makes the next call of `primitive` return `status` without effect.
    pub fn fail_next(&self, primitive: &str, status: Status) {
        self.state.lock().failures.insert(primitive.to_owned(), status);
    }

    /// Arguments `System_Init` received for `system`.
    pub fn init_args(&self, system: RawHandle) -> Option<(i32, InitFlags)> {
        self.state.lock().system(system).ok().and_then(|s| s.init)
    }

    /// Number of live engine objects of every kind, including the master
    /// groups and built-in fader units.
    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Reclaims `raw` engine-side, as if the engine had freed it.
    pub fn invalidate(&self, raw: RawHandle) {
        let mut state = self.state.lock();
        if matches!(state.objects.get(&raw), Some(Object::Channel(_))) {
            state.end_channel(raw);
        } else {
            state.objects.remove(&raw);
        }
    }

    /// Gives a channel's voice to another sound. Later calls on `channel`
    /// report [`Status::ERR_CHANNEL_STOLEN`].
    pub fn steal(&self, channel: RawHandle) {
        let mut state = self.state.lock();
        state.end_channel(channel);
        state.stolen.insert(channel);
    }

    /// Copies `values` into engine memory.
    pub fn alloc_f32(&self, values: &[f32]) -> RawPtr {
        self.state.lock().alloc(&f32_bytes(values))
    }

    /// Copies `bytes` into engine memory.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> RawPtr {
        self.state.lock().alloc(bytes)
    }

    /// Appends a metadata tag to `sound`, flagged as updated.
    pub fn add_tag(
        &self,
        sound: RawHandle,
        tag_type: TagType,
        name: &str,
        data_type: TagDataType,
        bytes: &[u8],
    ) {
        self.add_raw_tag(sound, tag_type.code(), name, data_type.code(), bytes);
    }

    /// Like [`add_tag`](Self::add_tag) with unchecked type codes.
    pub fn add_raw_tag(
        &self,
        sound: RawHandle,
        tag_type: i32,
        name: &str,
        data_type: i32,
        bytes: &[u8],
    ) {
        if let Ok(state) = self.state.lock().sound_mut(sound) {
            state.tags.push(MockTag {
                tag_type,
                data_type,
                name: name.to_owned(),
                bytes: bytes.to_vec(),
                updated: true,
            });
        }
    }

    /// Builds a native spectrum record for `channels` in engine memory.
    pub fn alloc_spectrum(&self, channels: &[&[f32]]) -> RawPtr {
        self.state.lock().alloc_spectrum(channels)
    }

    /// Sets the spectrum an FFT unit reports, updating its RMS and centroid.
    pub fn set_spectrum(&self, dsp: RawHandle, channels: &[&[f32]]) {
        self.state.lock().set_spectrum(dsp, channels);
    }

    /// Replaces the descriptor a unit reports for parameter `index`.
    pub fn set_parameter_descriptor(&self, dsp: RawHandle, index: i32, desc: RawParameterDesc) {
        if let Ok(state) = self.state.lock().dsp_mut(dsp) {
            state.descriptors.insert(index, desc);
        }
    }

    // ── Callback emission ──

    fn callback_of(
        &self,
        kind: ControlKind,
        control: RawHandle,
        what: &'static str,
    ) -> Result<Option<Arc<dyn NativeCallback>>, EngineError> {
        let state = self.state.lock();
        state
            .control(kind, control)
            .map(|c| c.callback.clone())
            .map_err(|status| EngineError::new(what, status))
    }

    fn emit(
        &self,
        kind: ControlKind,
        control: RawHandle,
        callback: CallbackType,
        data: (RawPtr, RawPtr),
        what: &'static str,
    ) -> error::Result<()> {
        if let Some(callback_fn) = self.callback_of(kind, control, what)? {
            callback_fn.invoke(control, kind.code(), callback.code(), data.0, data.1)?;
        }
        Ok(())
    }

    /// Ends playback of `channel`: fires its END callback, then reclaims it.
    pub fn emit_end(&self, channel: RawHandle) -> error::Result<()> {
        self.emit(
            ControlKind::Channel,
            channel,
            CallbackType::End,
            (RawPtr::NULL, RawPtr::NULL),
            "Channel_End",
        )?;
        self.state.lock().end_channel(channel);
        Ok(())
    }

    /// Fires a virtual-voice notification on `channel`.
    pub fn emit_virtual_voice(&self, channel: RawHandle, is_virtual: bool) -> error::Result<()> {
        let flag = RawPtr(usize::from(is_virtual));
        self.emit(
            ControlKind::Channel,
            channel,
            CallbackType::VirtualVoice,
            (flag, RawPtr::NULL),
            "Channel_VirtualVoice",
        )
    }

    /// Fires a sync-point notification on `channel`.
    pub fn emit_sync_point(&self, channel: RawHandle, index: i32) -> error::Result<()> {
        let word = RawPtr(usize::try_from(index).unwrap_or_default());
        self.emit(
            ControlKind::Channel,
            channel,
            CallbackType::SyncPoint,
            (word, RawPtr::NULL),
            "Channel_SyncPoint",
        )
    }

    /// Fires an occlusion notification on a channel or channel group. The
    /// values travel as pointers into engine memory.
    pub fn emit_occlusion(&self, control: RawHandle, direct: f32, reverb: f32) -> error::Result<()> {
        let (kind, data) = {
            let mut state = self.state.lock();
            let kind = match state.lookup(control) {
                Ok(Object::Channel(_)) => ControlKind::Channel,
                Ok(Object::ChannelGroup(_)) => ControlKind::ChannelGroup,
                Ok(_) => return Err(EngineError::new("Occlusion", Status::ERR_INVALID_HANDLE).into()),
                Err(status) => return Err(EngineError::new("Occlusion", status).into()),
            };
            let direct = state.alloc(&direct.to_ne_bytes());
            let reverb = state.alloc(&reverb.to_ne_bytes());
            (kind, (direct, reverb))
        };
        self.emit(kind, control, CallbackType::Occlusion, data, "Occlusion")
    }

    /// Delivers arbitrary tags and payload words to whatever callback is
    /// installed on `control`. Returns `OK` when none is installed.
    pub fn emit_raw(
        &self,
        control: RawHandle,
        control_type: i32,
        callback_type: i32,
        data1: RawPtr,
        data2: RawPtr,
    ) -> error::Result<Status> {
        let callback = {
            let state = self.state.lock();
            state
                .control(ControlKind::Channel, control)
                .or_else(|_| state.control(ControlKind::ChannelGroup, control))
                .map(|c| c.callback.clone())
                .map_err(|status| EngineError::new("Callback", status))?
        };
        match callback {
            Some(callback) => callback.invoke(control, control_type, callback_type, data1, data2),
            None => Ok(Status::OK),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockEngine")
            .field("objects", &state.objects.len())
            .field("heap_blocks", &state.heap.len())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::too_many_lines)]
impl NativeApi for MockEngine {
    fn read_memory(&self, ptr: RawPtr, out: &mut [u8]) -> bool {
        self.state.lock().read(ptr, out)
    }

    // ── System lifecycle ──

    fn system_create(&self, system: &mut RawHandle, header_version: u32) -> Status {
        self.call("System_Create", |s| {
            if header_version >> 8 != HEADER_VERSION >> 8 {
                return Err(Status::ERR_HEADER_MISMATCH);
            }
            let raw = s.insert(Object::System(SystemState {
                initialized: false,
                init: None,
                software_channels: 64,
                sample_rate: 48_000,
                speaker_mode: SpeakerMode::Stereo.code(),
                raw_speakers: 0,
                dsp_buffer: (1024, 4),
                stream_buffer: (16_384, TimeUnit::RAW_BYTES),
                network_timeout: 5000,
                proxy: String::new(),
                master_group: RawHandle::NULL,
                master_sound_group: RawHandle::NULL,
                next_channel_index: 0,
                dsp_locked: false,
                clock: 0,
            }));
            let master_group = s.new_group(raw, "Master", RawHandle::NULL);
            let master_sound_group = s.insert(Object::SoundGroup(SoundGroupState {
                system: raw,
                name: "Master".to_owned(),
                max_audible: -1,
                behavior: 0,
                mute_fade_speed: 0.0,
                volume: 1.0,
            }));
            let state = s.system_mut(raw)?;
            state.master_group = master_group;
            state.master_sound_group = master_sound_group;
            *system = raw;
            Ok(())
        })
    }

    fn system_init(&self, system: RawHandle, max_channels: i32, flags: InitFlags) -> Status {
        self.call("System_Init", |s| {
            let state = s.system_mut(system)?;
            if state.initialized {
                return Err(Status::ERR_INITIALIZED);
            }
            if max_channels <= 0 {
                return Err(Status::ERR_INVALID_PARAM);
            }
            state.initialized = true;
            state.init = Some((max_channels, flags));
            Ok(())
        })
    }

    fn system_close(&self, system: RawHandle) -> Status {
        self.call("System_Close", |s| {
            s.system(system)?;
            s.objects.retain(|_, object| object.owner() != Some(system));
            let state = s.system_mut(system)?;
            state.initialized = false;
            state.master_group = RawHandle::NULL;
            state.master_sound_group = RawHandle::NULL;
            Ok(())
        })
    }

    fn system_release(&self, system: RawHandle) -> Status {
        self.call("System_Release", |s| {
            s.system(system)?;
            s.objects.retain(|_, object| object.owner() != Some(system));
            s.objects.remove(&system);
            Ok(())
        })
    }

    fn system_update(&self, system: RawHandle) -> Status {
        self.call("System_Update", |s| {
            let state = s.system_mut(system)?;
            state.clock += u64::from(state.dsp_buffer.0);
            Ok(())
        })
    }

    fn system_mixer_suspend(&self, system: RawHandle) -> Status {
        self.call("System_MixerSuspend", |s| s.system(system).map(|_| ()))
    }

    fn system_mixer_resume(&self, system: RawHandle) -> Status {
        self.call("System_MixerResume", |s| s.system(system).map(|_| ()))
    }

    // ── System configuration ──

    fn system_get_software_channels(&self, system: RawHandle, channels: &mut i32) -> Status {
        self.call("System_GetSoftwareChannels", |s| {
            *channels = s.system(system)?.software_channels;
            Ok(())
        })
    }

    fn system_set_software_channels(&self, system: RawHandle, channels: i32) -> Status {
        self.call("System_SetSoftwareChannels", |s| {
            if !(0..=4095).contains(&channels) {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.system_mut(system)?.software_channels = channels;
            Ok(())
        })
    }

    fn system_get_software_format(
        &self,
        system: RawHandle,
        sample_rate: &mut i32,
        speaker_mode: &mut i32,
        raw_speakers: &mut i32,
    ) -> Status {
        self.call("System_GetSoftwareFormat", |s| {
            let state = s.system(system)?;
            *sample_rate = state.sample_rate;
            *speaker_mode = state.speaker_mode;
            *raw_speakers = state.raw_speakers;
            Ok(())
        })
    }

    fn system_set_software_format(
        &self,
        system: RawHandle,
        sample_rate: i32,
        speaker_mode: i32,
        raw_speakers: i32,
    ) -> Status {
        self.call("System_SetSoftwareFormat", |s| {
            if !(8000..=192_000).contains(&sample_rate) || SpeakerMode::from_code(speaker_mode).is_none() {
                return Err(Status::ERR_INVALID_PARAM);
            }
            let state = s.system_mut(system)?;
            state.sample_rate = sample_rate;
            state.speaker_mode = speaker_mode;
            state.raw_speakers = raw_speakers;
            Ok(())
        })
    }

    fn system_get_dsp_buffer_size(&self, system: RawHandle, length: &mut u32, count: &mut i32) -> Status {
        self.call("System_GetDSPBufferSize", |s| {
            (*length, *count) = s.system(system)?.dsp_buffer;
            Ok(())
        })
    }

    fn system_set_dsp_buffer_size(&self, system: RawHandle, length: u32, count: i32) -> Status {
        self.call("System_SetDSPBufferSize", |s| {
            if length == 0 || count < 2 {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.system_mut(system)?.dsp_buffer = (length, count);
            Ok(())
        })
    }

    fn system_get_stream_buffer_size(&self, system: RawHandle, size: &mut u32, unit: &mut TimeUnit) -> Status {
        self.call("System_GetStreamBufferSize", |s| {
            (*size, *unit) = s.system(system)?.stream_buffer;
            Ok(())
        })
    }

    fn system_set_stream_buffer_size(&self, system: RawHandle, size: u32, unit: TimeUnit) -> Status {
        self.call("System_SetStreamBufferSize", |s| {
            if size == 0 {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.system_mut(system)?.stream_buffer = (size, unit);
            Ok(())
        })
    }

    fn system_get_network_timeout(&self, system: RawHandle, timeout_ms: &mut i32) -> Status {
        self.call("System_GetNetworkTimeout", |s| {
            *timeout_ms = s.system(system)?.network_timeout;
            Ok(())
        })
    }

    fn system_set_network_timeout(&self, system: RawHandle, timeout_ms: i32) -> Status {
        self.call("System_SetNetworkTimeout", |s| {
            s.system_mut(system)?.network_timeout = timeout_ms;
            Ok(())
        })
    }

    fn system_get_network_proxy(&self, system: RawHandle, proxy: &mut String) -> Status {
        self.call("System_GetNetworkProxy", |s| {
            proxy.clone_from(&s.system(system)?.proxy);
            Ok(())
        })
    }

    fn system_set_network_proxy(&self, system: RawHandle, proxy: &str) -> Status {
        self.call("System_SetNetworkProxy", |s| {
            proxy.clone_into(&mut s.system_mut(system)?.proxy);
            Ok(())
        })
    }

    // ── System information ──

    fn system_get_version(&self, system: RawHandle, version: &mut u32, build: &mut u32) -> Status {
        self.call("System_GetVersion", |s| {
            s.system(system)?;
            *version = HEADER_VERSION | 0x05;
            *build = MOCK_BUILD;
            Ok(())
        })
    }

    fn system_get_channels_playing(
        &self,
        system: RawHandle,
        channels: &mut i32,
        real_channels: &mut i32,
    ) -> Status {
        self.call("System_GetChannelsPlaying", |s| {
            s.system(system)?;
            let playing = s.channels_where(|c| c.system == system).len();
            *channels = len_i32(playing);
            *real_channels = len_i32(playing);
            Ok(())
        })
    }

    // ── System object creation ──

    fn system_create_sound(&self, system: RawHandle, name: &str, mode: Mode, sound: &mut RawHandle) -> Status {
        self.call("System_CreateSound", |s| {
            let master = s.system(system)?.master_sound_group;
            if name.is_empty() {
                return Err(Status::ERR_FILE_NOTFOUND);
            }
            *sound = s.insert(Object::Sound(SoundState {
                system,
                name: name.to_owned(),
                mode,
                loop_count: -1,
                loop_points: (0, sound_length(TimeUnit::PCM) - 1),
                defaults: (48_000.0, 128),
                sound_group: master,
                tags: Vec::new(),
            }));
            Ok(())
        })
    }

    fn system_create_stream(&self, system: RawHandle, name: &str, mode: Mode, sound: &mut RawHandle) -> Status {
        self.call("System_CreateStream", |s| {
            let master = s.system(system)?.master_sound_group;
            if name.is_empty() {
                return Err(Status::ERR_FILE_NOTFOUND);
            }
            *sound = s.insert(Object::Sound(SoundState {
                system,
                name: name.to_owned(),
                mode: mode | Mode::CREATE_STREAM,
                loop_count: -1,
                loop_points: (0, sound_length(TimeUnit::PCM) - 1),
                defaults: (48_000.0, 128),
                sound_group: master,
                tags: Vec::new(),
            }));
            Ok(())
        })
    }

    fn system_create_dsp_by_type(&self, system: RawHandle, dsp_type: i32, dsp: &mut RawHandle) -> Status {
        self.call("System_CreateDSPByType", |s| {
            s.system(system)?;
            if DspType::from_code(dsp_type).is_err() {
                return Err(Status::ERR_DSP_TYPE);
            }
            *dsp = s.insert(Object::Dsp(DspState::new(system, dsp_type)));
            Ok(())
        })
    }

    fn system_create_channel_group(&self, system: RawHandle, name: &str, group: &mut RawHandle) -> Status {
        self.call("System_CreateChannelGroup", |s| {
            let master = s.system(system)?.master_group;
            *group = s.new_group(system, name, master);
            Ok(())
        })
    }

    fn system_create_sound_group(&self, system: RawHandle, name: &str, group: &mut RawHandle) -> Status {
        self.call("System_CreateSoundGroup", |s| {
            s.system(system)?;
            *group = s.insert(Object::SoundGroup(SoundGroupState {
                system,
                name: name.to_owned(),
                max_audible: -1,
                behavior: 0,
                mute_fade_speed: 0.0,
                volume: 1.0,
            }));
            Ok(())
        })
    }

    fn system_play_sound(
        &self,
        system: RawHandle,
        sound: RawHandle,
        group: RawHandle,
        paused: bool,
        channel: &mut RawHandle,
    ) -> Status {
        self.call("System_PlaySound", |s| {
            s.sound(sound)?;
            *channel = s.play(system, sound, group, paused)?;
            Ok(())
        })
    }

    fn system_play_dsp(
        &self,
        system: RawHandle,
        dsp: RawHandle,
        group: RawHandle,
        paused: bool,
        channel: &mut RawHandle,
    ) -> Status {
        self.call("System_PlayDSP", |s| {
            s.dsp(dsp)?;
            let raw = s.play(system, RawHandle::NULL, group, paused)?;
            if let Ok(c) = s.channel_mut(raw) {
                c.control.dsps.push(dsp);
            }
            *channel = raw;
            Ok(())
        })
    }

    fn system_get_channel(&self, system: RawHandle, id: i32, channel: &mut RawHandle) -> Status {
        self.call("System_GetChannel", |s| {
            s.system(system)?;
            *channel = s
                .channels_where(|c| c.system == system && c.index == id)
                .first()
                .copied()
                .ok_or(Status::ERR_INVALID_PARAM)?;
            Ok(())
        })
    }

    fn system_get_master_channel_group(&self, system: RawHandle, group: &mut RawHandle) -> Status {
        self.call("System_GetMasterChannelGroup", |s| {
            *group = s.system(system)?.master_group;
            Ok(())
        })
    }

    fn system_get_master_sound_group(&self, system: RawHandle, group: &mut RawHandle) -> Status {
        self.call("System_GetMasterSoundGroup", |s| {
            *group = s.system(system)?.master_sound_group;
            Ok(())
        })
    }

    fn system_lock_dsp(&self, system: RawHandle) -> Status {
        self.call("System_LockDSP", |s| {
            let state = s.system_mut(system)?;
            if state.dsp_locked {
                return Err(Status::ERR_ALREADY_LOCKED);
            }
            state.dsp_locked = true;
            Ok(())
        })
    }

    fn system_unlock_dsp(&self, system: RawHandle) -> Status {
        self.call("System_UnlockDSP", |s| {
            let state = s.system_mut(system)?;
            if !state.dsp_locked {
                return Err(Status::ERR_NOT_LOCKED);
            }
            state.dsp_locked = false;
            Ok(())
        })
    }

    // ── Sound ──

    fn sound_release(&self, sound: RawHandle) -> Status {
        self.call("Sound_Release", |s| {
            s.sound(sound)?;
            for channel in s.channels_where(|c| c.sound == sound) {
                s.end_channel(channel);
            }
            s.objects.remove(&sound);
            Ok(())
        })
    }

    fn sound_get_system(&self, sound: RawHandle, system: &mut RawHandle) -> Status {
        self.call("Sound_GetSystemObject", |s| {
            *system = s.sound(sound)?.system;
            Ok(())
        })
    }

    fn sound_get_name(&self, sound: RawHandle, name: &mut String) -> Status {
        self.call("Sound_GetName", |s| {
            name.clone_from(&s.sound(sound)?.name);
            Ok(())
        })
    }

    fn sound_get_length(&self, sound: RawHandle, length: &mut u32, unit: TimeUnit) -> Status {
        self.call("Sound_GetLength", |s| {
            s.sound(sound)?;
            *length = sound_length(unit);
            Ok(())
        })
    }

    fn sound_get_format(
        &self,
        sound: RawHandle,
        sound_type: &mut i32,
        format: &mut i32,
        channels: &mut i32,
        bits: &mut i32,
    ) -> Status {
        self.call("Sound_GetFormat", |s| {
            s.sound(sound)?;
            (*sound_type, *format, *channels, *bits) = (0, 2, 2, 16);
            Ok(())
        })
    }

    fn sound_get_mode(&self, sound: RawHandle, mode: &mut Mode) -> Status {
        self.call("Sound_GetMode", |s| {
            *mode = s.sound(sound)?.mode;
            Ok(())
        })
    }

    fn sound_set_mode(&self, sound: RawHandle, mode: Mode) -> Status {
        self.call("Sound_SetMode", |s| {
            s.sound_mut(sound)?.mode = mode;
            Ok(())
        })
    }

    fn sound_get_loop_count(&self, sound: RawHandle, count: &mut i32) -> Status {
        self.call("Sound_GetLoopCount", |s| {
            *count = s.sound(sound)?.loop_count;
            Ok(())
        })
    }

    fn sound_set_loop_count(&self, sound: RawHandle, count: i32) -> Status {
        self.call("Sound_SetLoopCount", |s| {
            s.sound_mut(sound)?.loop_count = count;
            Ok(())
        })
    }

    fn sound_get_loop_points(
        &self,
        sound: RawHandle,
        start: &mut u32,
        _start_unit: TimeUnit,
        end: &mut u32,
        _end_unit: TimeUnit,
    ) -> Status {
        self.call("Sound_GetLoopPoints", |s| {
            (*start, *end) = s.sound(sound)?.loop_points;
            Ok(())
        })
    }

    fn sound_set_loop_points(
        &self,
        sound: RawHandle,
        start: u32,
        _start_unit: TimeUnit,
        end: u32,
        _end_unit: TimeUnit,
    ) -> Status {
        self.call("Sound_SetLoopPoints", |s| {
            if start > end {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.sound_mut(sound)?.loop_points = (start, end);
            Ok(())
        })
    }

    fn sound_get_defaults(&self, sound: RawHandle, frequency: &mut f32, priority: &mut i32) -> Status {
        self.call("Sound_GetDefaults", |s| {
            (*frequency, *priority) = s.sound(sound)?.defaults;
            Ok(())
        })
    }

    fn sound_set_defaults(&self, sound: RawHandle, frequency: f32, priority: i32) -> Status {
        self.call("Sound_SetDefaults", |s| {
            if !(0..=256).contains(&priority) {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.sound_mut(sound)?.defaults = (frequency, priority);
            Ok(())
        })
    }

    fn sound_get_num_sub_sounds(&self, sound: RawHandle, count: &mut i32) -> Status {
        self.call("Sound_GetNumSubSounds", |s| {
            s.sound(sound)?;
            *count = 0;
            Ok(())
        })
    }

    fn sound_get_sub_sound(&self, sound: RawHandle, _index: i32, _sub: &mut RawHandle) -> Status {
        self.call("Sound_GetSubSound", |s| {
            s.sound(sound)?;
            Err(Status::ERR_INVALID_PARAM)
        })
    }

    fn sound_get_sub_sound_parent(&self, sound: RawHandle, parent: &mut RawHandle) -> Status {
        self.call("Sound_GetSubSoundParent", |s| {
            s.sound(sound)?;
            *parent = RawHandle::NULL;
            Ok(())
        })
    }

    fn sound_get_sound_group(&self, sound: RawHandle, group: &mut RawHandle) -> Status {
        self.call("Sound_GetSoundGroup", |s| {
            *group = s.sound(sound)?.sound_group;
            Ok(())
        })
    }

    fn sound_set_sound_group(&self, sound: RawHandle, group: RawHandle) -> Status {
        self.call("Sound_SetSoundGroup", |s| {
            s.sound_group(group)?;
            s.sound_mut(sound)?.sound_group = group;
            Ok(())
        })
    }

    fn sound_get_num_tags(&self, sound: RawHandle, stored: &mut i32, updated: &mut i32)
    -> Status {
        self.call("Sound_GetNumTags", |s| {
            let tags = &s.sound(sound)?.tags;
            *stored = tags.len() as i32;
            *updated = tags.iter().filter(|t| t.updated).count() as i32;
            Ok(())
        })
    }

    fn sound_get_tag(
        &self,
        sound: RawHandle,
        name: Option<&str>,
        index: i32,
        tag: &mut RawTag,
    ) -> Status {
        self.call("Sound_GetTag", |s| {
            let index = usize::try_from(index).map_err(|_| Status::ERR_INVALID_PARAM)?;
            let found = s
                .sound_mut(sound)?
                .tags
                .iter_mut()
                .filter(|t| name.is_none_or(|n| t.name == n))
                .nth(index)
                .ok_or(Status::ERR_TAGNOTFOUND)?;
            *tag = RawTag {
                tag_type: found.tag_type,
                data_type: found.data_type,
                name: found.name.clone(),
                data: RawPtr::NULL,
                data_len: found.bytes.len() as u32,
                updated: found.updated,
            };
            found.updated = false;
            let bytes = found.bytes.clone();
            if !bytes.is_empty() {
                tag.data = s.alloc(&bytes);
            }
            Ok(())
        })
    }

    // ── ChannelControl ──

    fn control_is_playing(&self, kind: ControlKind, control: RawHandle, playing: &mut bool) -> Status {
        self.control_call(
            kind,
            "IsPlaying",
            |s| {
                s.control(kind, control)?;
                *playing = match kind {
                    ControlKind::Channel => true,
                    ControlKind::ChannelGroup => {
                        let tree = s.group_tree(control);
                        !s.channels_where(|c| tree.contains(&c.group)).is_empty()
                    }
                };
                Ok(())
            },
        )
    }

    fn control_stop(&self, kind: ControlKind, control: RawHandle) -> Status {
        self.control_call(
            kind,
            "Stop",
            |s| {
                s.control(kind, control)?;
                match kind {
                    ControlKind::Channel => s.end_channel(control),
                    ControlKind::ChannelGroup => {
                        let tree = s.group_tree(control);
                        for channel in s.channels_where(|c| tree.contains(&c.group)) {
                            s.end_channel(channel);
                        }
                    }
                }
                Ok(())
            },
        )
    }

    fn control_get_paused(&self, kind: ControlKind, control: RawHandle, paused: &mut bool) -> Status {
        self.control_call(
            kind,
            "GetPaused",
            |s| {
                *paused = s.control(kind, control)?.paused;
                Ok(())
            },
        )
    }

    fn control_set_paused(&self, kind: ControlKind, control: RawHandle, paused: bool) -> Status {
        self.control_call(
            kind,
            "SetPaused",
            move |s| {
                s.control_mut(kind, control)?.paused = paused;
                Ok(())
            },
        )
    }

    fn control_get_volume(&self, kind: ControlKind, control: RawHandle, volume: &mut f32) -> Status {
        self.control_call(
            kind,
            "GetVolume",
            |s| {
                *volume = s.control(kind, control)?.volume;
                Ok(())
            },
        )
    }

    fn control_set_volume(&self, kind: ControlKind, control: RawHandle, volume: f32) -> Status {
        self.control_call(
            kind,
            "SetVolume",
            move |s| {
                if !volume.is_finite() {
                    return Err(Status::ERR_INVALID_FLOAT);
                }
                s.control_mut(kind, control)?.volume = volume;
                Ok(())
            },
        )
    }

    fn control_get_volume_ramp(&self, kind: ControlKind, control: RawHandle, ramp: &mut bool) -> Status {
        self.control_call(
            kind,
            "GetVolumeRamp",
            |s| {
                *ramp = s.control(kind, control)?.volume_ramp;
                Ok(())
            },
        )
    }

    fn control_set_volume_ramp(&self, kind: ControlKind, control: RawHandle, ramp: bool) -> Status {
        self.control_call(
            kind,
            "SetVolumeRamp",
            move |s| {
                s.control_mut(kind, control)?.volume_ramp = ramp;
                Ok(())
            },
        )
    }

    fn control_get_pitch(&self, kind: ControlKind, control: RawHandle, pitch: &mut f32) -> Status {
        self.control_call(
            kind,
            "GetPitch",
            |s| {
                *pitch = s.control(kind, control)?.pitch;
                Ok(())
            },
        )
    }

    fn control_set_pitch(&self, kind: ControlKind, control: RawHandle, pitch: f32) -> Status {
        self.control_call(
            kind,
            "SetPitch",
            move |s| {
                if !pitch.is_finite() || pitch < 0.0 {
                    return Err(Status::ERR_INVALID_PARAM);
                }
                s.control_mut(kind, control)?.pitch = pitch;
                Ok(())
            },
        )
    }

    fn control_get_mute(&self, kind: ControlKind, control: RawHandle, mute: &mut bool) -> Status {
        self.control_call(
            kind,
            "GetMute",
            |s| {
                *mute = s.control(kind, control)?.mute;
                Ok(())
            },
        )
    }

    fn control_set_mute(&self, kind: ControlKind, control: RawHandle, mute: bool) -> Status {
        self.control_call(
            kind,
            "SetMute",
            move |s| {
                s.control_mut(kind, control)?.mute = mute;
                Ok(())
            },
        )
    }

    fn control_get_mode(&self, kind: ControlKind, control: RawHandle, mode: &mut Mode) -> Status {
        self.control_call(
            kind,
            "GetMode",
            |s| {
                *mode = s.control(kind, control)?.mode;
                Ok(())
            },
        )
    }

    fn control_set_mode(&self, kind: ControlKind, control: RawHandle, mode: Mode) -> Status {
        self.control_call(
            kind,
            "SetMode",
            move |s| {
                s.control_mut(kind, control)?.mode = mode;
                Ok(())
            },
        )
    }

    fn control_get_audibility(&self, kind: ControlKind, control: RawHandle, audibility: &mut f32) -> Status {
        self.control_call(
            kind,
            "GetAudibility",
            |s| {
                let c = s.control(kind, control)?;
                *audibility = if c.mute || c.paused { 0.0 } else { c.volume };
                Ok(())
            },
        )
    }

    fn control_set_pan(&self, kind: ControlKind, control: RawHandle, pan: f32) -> Status {
        self.control_call(
            kind,
            "SetPan",
            move |s| {
                s.control_mut(kind, control)?.pan = pan.clamp(-1.0, 1.0);
                Ok(())
            },
        )
    }

    fn control_set_mix_levels_input(&self, kind: ControlKind, control: RawHandle, levels: &[f32]) -> Status {
        self.control_call(
            kind,
            "SetMixLevelsInput",
            |s| {
                levels.clone_into(&mut s.control_mut(kind, control)?.levels_in);
                Ok(())
            },
        )
    }

    fn control_set_mix_levels_output(&self, kind: ControlKind, control: RawHandle, levels: [f32; 8]) -> Status {
        self.control_call(
            kind,
            "SetMixLevelsOutput",
            move |s| {
                s.control_mut(kind, control)?.levels_out = levels;
                Ok(())
            },
        )
    }

    fn control_get_mix_matrix(
        &self,
        kind: ControlKind,
        control: RawHandle,
        matrix: Option<&mut [f32]>,
        out_channels: &mut i32,
        in_channels: &mut i32,
        in_hop: i32,
    ) -> Status {
        self.control_call(
            kind,
            "GetMixMatrix",
            move |s| {
                let stored = s.control(kind, control)?.matrix.as_ref();
                read_stored_matrix(stored, matrix, out_channels, in_channels, in_hop)
            },
        )
    }

    fn control_set_mix_matrix(
        &self,
        kind: ControlKind,
        control: RawHandle,
        matrix: &[f32],
        out_channels: i32,
        in_channels: i32,
        in_hop: i32,
    ) -> Status {
        self.control_call(
            kind,
            "SetMixMatrix",
            move |s| {
                let packed = pack_matrix(matrix, out_channels, in_channels, in_hop)?;
                s.control_mut(kind, control)?.matrix = Some(packed);
                Ok(())
            },
        )
    }

    fn control_add_dsp(&self, kind: ControlKind, control: RawHandle, index: i32, dsp: RawHandle) -> Status {
        self.control_call(
            kind,
            "AddDSP",
            move |s| {
                s.dsp(dsp)?;
                let c = s.control_mut(kind, control)?;
                c.dsps.retain(|&d| d != dsp);
                let slot = chain_slot(&c.dsps, c.fader, index)?;
                c.dsps.insert(slot, dsp);
                Ok(())
            },
        )
    }

    fn control_remove_dsp(&self, kind: ControlKind, control: RawHandle, dsp: RawHandle) -> Status {
        self.control_call(
            kind,
            "RemoveDSP",
            move |s| {
                let c = s.control_mut(kind, control)?;
                if dsp == c.fader {
                    return Err(Status::ERR_DSP_RESERVED);
                }
                let position = c.dsps.iter().position(|&d| d == dsp).ok_or(Status::ERR_DSP_NOTFOUND)?;
                c.dsps.remove(position);
                Ok(())
            },
        )
    }

    fn control_get_num_dsps(&self, kind: ControlKind, control: RawHandle, count: &mut i32) -> Status {
        self.control_call(
            kind,
            "GetNumDSPs",
            |s| {
                *count = len_i32(s.control(kind, control)?.dsps.len());
                Ok(())
            },
        )
    }

    fn control_get_dsp(&self, kind: ControlKind, control: RawHandle, index: i32, dsp: &mut RawHandle) -> Status {
        self.control_call(
            kind,
            "GetDSP",
            move |s| {
                let c = s.control(kind, control)?;
                *dsp = chain_get(&c.dsps, c.fader, index)?;
                Ok(())
            },
        )
    }

    fn control_set_dsp_index(&self, kind: ControlKind, control: RawHandle, dsp: RawHandle, index: i32) -> Status {
        self.control_call(
            kind,
            "SetDSPIndex",
            move |s| {
                let c = s.control_mut(kind, control)?;
                let position = c.dsps.iter().position(|&d| d == dsp).ok_or(Status::ERR_DSP_NOTFOUND)?;
                c.dsps.remove(position);
                let slot = chain_slot(&c.dsps, c.fader, index)?;
                c.dsps.insert(slot, dsp);
                Ok(())
            },
        )
    }

    fn control_get_dsp_index(&self, kind: ControlKind, control: RawHandle, dsp: RawHandle, index: &mut i32) -> Status {
        self.control_call(
            kind,
            "GetDSPIndex",
            move |s| {
                let c = s.control(kind, control)?;
                let position = c.dsps.iter().position(|&d| d == dsp).ok_or(Status::ERR_DSP_NOTFOUND)?;
                *index = len_i32(position);
                Ok(())
            },
        )
    }

    fn control_get_dsp_clock(
        &self,
        kind: ControlKind,
        control: RawHandle,
        clock: &mut u64,
        parent_clock: &mut u64,
    ) -> Status {
        self.control_call(
            kind,
            "GetDSPClock",
            |s| {
                let system = s.control_system(kind, control)?;
                let now = s.system(system)?.clock;
                *clock = now;
                *parent_clock = now;
                Ok(())
            },
        )
    }

    fn control_set_delay(
        &self,
        kind: ControlKind,
        control: RawHandle,
        start: u64,
        end: u64,
        stop_channels: bool,
    ) -> Status {
        self.control_call(
            kind,
            "SetDelay",
            move |s| {
                if end != 0 && end < start {
                    return Err(Status::ERR_INVALID_PARAM);
                }
                s.control_mut(kind, control)?.delay = (start, end, stop_channels);
                Ok(())
            },
        )
    }

    fn control_get_delay(
        &self,
        kind: ControlKind,
        control: RawHandle,
        start: &mut u64,
        end: &mut u64,
        stop_channels: &mut bool,
    ) -> Status {
        self.control_call(
            kind,
            "GetDelay",
            |s| {
                (*start, *end, *stop_channels) = s.control(kind, control)?.delay;
                Ok(())
            },
        )
    }

    fn control_add_fade_point(&self, kind: ControlKind, control: RawHandle, clock: u64, volume: f32) -> Status {
        self.control_call(
            kind,
            "AddFadePoint",
            move |s| {
                s.control_mut(kind, control)?.fade_points.insert(clock, volume);
                Ok(())
            },
        )
    }

    fn control_set_fade_point_ramp(&self, kind: ControlKind, control: RawHandle, clock: u64, volume: f32) -> Status {
        self.control_call(
            kind,
            "SetFadePointRamp",
            move |s| {
                let system = s.control_system(kind, control)?;
                let now = s.system(system)?.clock;
                let c = s.control_mut(kind, control)?;
                let current = c.volume;
                c.fade_points.retain(|&at, _| at < now || at > clock);
                c.fade_points.insert(now, current);
                c.fade_points.insert(clock, volume);
                Ok(())
            },
        )
    }

    fn control_remove_fade_points(&self, kind: ControlKind, control: RawHandle, start: u64, end: u64) -> Status {
        self.control_call(
            kind,
            "RemoveFadePoints",
            move |s| {
                s.control_mut(kind, control)?
                    .fade_points
                    .retain(|&at, _| at < start || at > end);
                Ok(())
            },
        )
    }

    fn control_get_fade_points(
        &self,
        kind: ControlKind,
        control: RawHandle,
        count: &mut u32,
        clocks: Option<&mut [u64]>,
        volumes: Option<&mut [f32]>,
    ) -> Status {
        self.control_call(
            kind,
            "GetFadePoints",
            move |s| {
                let points = &s.control(kind, control)?.fade_points;
                let total = u32::try_from(points.len()).unwrap_or(u32::MAX);
                if clocks.is_none() && volumes.is_none() {
                    *count = total;
                    return Ok(());
                }
                let limit = (*count).min(total) as usize;
                let mut clocks = clocks;
                let mut volumes = volumes;
                for (i, (&at, &volume)) in points.iter().take(limit).enumerate() {
                    if let Some(slot) = clocks.as_deref_mut().and_then(|c| c.get_mut(i)) {
                        *slot = at;
                    }
                    if let Some(slot) = volumes.as_deref_mut().and_then(|v| v.get_mut(i)) {
                        *slot = volume;
                    }
                }
                *count = u32::try_from(limit).unwrap_or(u32::MAX);
                Ok(())
            },
        )
    }

    fn control_set_callback(
        &self,
        kind: ControlKind,
        control: RawHandle,
        callback: Option<Arc<dyn NativeCallback>>,
    ) -> Status {
        self.control_call(
            kind,
            "SetCallback",
            move |s| {
                s.control_mut(kind, control)?.callback = callback;
                Ok(())
            },
        )
    }

    fn control_get_system(&self, kind: ControlKind, control: RawHandle, system: &mut RawHandle) -> Status {
        self.control_call(
            kind,
            "GetSystemObject",
            |s| {
                *system = s.control_system(kind, control)?;
                Ok(())
            },
        )
    }

    // ── Channel ──

    fn channel_get_frequency(&self, channel: RawHandle, frequency: &mut f32) -> Status {
        self.call("Channel_GetFrequency", |s| {
            *frequency = s.channel(channel)?.frequency;
            Ok(())
        })
    }

    fn channel_set_frequency(&self, channel: RawHandle, frequency: f32) -> Status {
        self.call("Channel_SetFrequency", |s| {
            s.channel_mut(channel)?.frequency = frequency;
            Ok(())
        })
    }

    fn channel_get_priority(&self, channel: RawHandle, priority: &mut i32) -> Status {
        self.call("Channel_GetPriority", |s| {
            *priority = s.channel(channel)?.priority;
            Ok(())
        })
    }

    fn channel_set_priority(&self, channel: RawHandle, priority: i32) -> Status {
        self.call("Channel_SetPriority", |s| {
            if !(0..=256).contains(&priority) {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.channel_mut(channel)?.priority = priority;
            Ok(())
        })
    }

    fn channel_get_position(&self, channel: RawHandle, position: &mut u32, _unit: TimeUnit) -> Status {
        self.call("Channel_GetPosition", |s| {
            *position = s.channel(channel)?.position;
            Ok(())
        })
    }

    fn channel_set_position(&self, channel: RawHandle, position: u32, _unit: TimeUnit) -> Status {
        self.call("Channel_SetPosition", |s| {
            s.channel_mut(channel)?.position = position;
            Ok(())
        })
    }

    fn channel_get_channel_group(&self, channel: RawHandle, group: &mut RawHandle) -> Status {
        self.call("Channel_GetChannelGroup", |s| {
            *group = s.channel(channel)?.group;
            Ok(())
        })
    }

    fn channel_set_channel_group(&self, channel: RawHandle, group: RawHandle) -> Status {
        self.call("Channel_SetChannelGroup", |s| {
            s.group(group)?;
            s.channel_mut(channel)?.group = group;
            Ok(())
        })
    }

    fn channel_get_loop_count(&self, channel: RawHandle, count: &mut i32) -> Status {
        self.call("Channel_GetLoopCount", |s| {
            *count = s.channel(channel)?.loop_count;
            Ok(())
        })
    }

    fn channel_set_loop_count(&self, channel: RawHandle, count: i32) -> Status {
        self.call("Channel_SetLoopCount", |s| {
            s.channel_mut(channel)?.loop_count = count;
            Ok(())
        })
    }

    fn channel_get_loop_points(
        &self,
        channel: RawHandle,
        start: &mut u32,
        _start_unit: TimeUnit,
        end: &mut u32,
        _end_unit: TimeUnit,
    ) -> Status {
        self.call("Channel_GetLoopPoints", |s| {
            (*start, *end) = s.channel(channel)?.loop_points;
            Ok(())
        })
    }

    fn channel_set_loop_points(
        &self,
        channel: RawHandle,
        start: u32,
        _start_unit: TimeUnit,
        end: u32,
        _end_unit: TimeUnit,
    ) -> Status {
        self.call("Channel_SetLoopPoints", |s| {
            if start > end {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.channel_mut(channel)?.loop_points = (start, end);
            Ok(())
        })
    }

    fn channel_is_virtual(&self, channel: RawHandle, is_virtual: &mut bool) -> Status {
        self.call("Channel_IsVirtual", |s| {
            s.channel(channel)?;
            *is_virtual = false;
            Ok(())
        })
    }

    fn channel_get_current_sound(&self, channel: RawHandle, sound: &mut RawHandle) -> Status {
        self.call("Channel_GetCurrentSound", |s| {
            *sound = s.channel(channel)?.sound;
            Ok(())
        })
    }

    fn channel_get_index(&self, channel: RawHandle, index: &mut i32) -> Status {
        self.call("Channel_GetIndex", |s| {
            *index = s.channel(channel)?.index;
            Ok(())
        })
    }

    // ── ChannelGroup ──

    fn channel_group_release(&self, group: RawHandle) -> Status {
        self.call("ChannelGroup_Release", |s| s.release_group(group))
    }

    fn channel_group_add_group(
        &self,
        group: RawHandle,
        child: RawHandle,
        _propagate_dsp_clock: bool,
        connection: &mut RawHandle,
    ) -> Status {
        self.call("ChannelGroup_AddGroup", |s| {
            s.group(group)?;
            s.group(child)?;
            if s.group_tree(child).contains(&group) {
                return Err(Status::ERR_INVALID_PARAM);
            }
            *connection = s.attach_group(child, group);
            Ok(())
        })
    }

    fn channel_group_get_num_groups(&self, group: RawHandle, count: &mut i32) -> Status {
        self.call("ChannelGroup_GetNumGroups", |s| {
            *count = len_i32(s.group(group)?.children.len());
            Ok(())
        })
    }

    fn channel_group_get_group(&self, group: RawHandle, index: i32, child: &mut RawHandle) -> Status {
        self.call("ChannelGroup_GetGroup", |s| {
            let g = s.group(group)?;
            *child = to_usize(index)
                .and_then(|i| g.children.get(i).copied())
                .ok_or(Status::ERR_INVALID_PARAM)?;
            Ok(())
        })
    }

    fn channel_group_get_parent_group(&self, group: RawHandle, parent: &mut RawHandle) -> Status {
        self.call("ChannelGroup_GetParentGroup", |s| {
            *parent = s.group(group)?.parent;
            Ok(())
        })
    }

    fn channel_group_get_num_channels(&self, group: RawHandle, count: &mut i32) -> Status {
        self.call("ChannelGroup_GetNumChannels", |s| {
            s.group(group)?;
            *count = len_i32(s.channels_where(|c| c.group == group).len());
            Ok(())
        })
    }

    fn channel_group_get_channel(&self, group: RawHandle, index: i32, channel: &mut RawHandle) -> Status {
        self.call("ChannelGroup_GetChannel", |s| {
            s.group(group)?;
            let channels = s.channels_where(|c| c.group == group);
            *channel = to_usize(index)
                .and_then(|i| channels.get(i).copied())
                .unwrap_or(RawHandle::NULL);
            Ok(())
        })
    }

    fn channel_group_get_name(&self, group: RawHandle, name: &mut String) -> Status {
        self.call("ChannelGroup_GetName", |s| {
            name.clone_from(&s.group(group)?.name);
            Ok(())
        })
    }

    // ── DSP ──

    fn dsp_release(&self, dsp: RawHandle) -> Status {
        self.call("DSP_Release", |s| {
            s.dsp(dsp)?;
            if s.dsp_in_use(dsp) {
                return Err(Status::ERR_DSP_INUSE);
            }
            let state = s.dsp(dsp)?;
            let connections: Vec<RawHandle> = state
                .inputs
                .iter()
                .chain(&state.outputs)
                .map(|&(_, connection)| connection)
                .collect();
            for connection in connections {
                s.remove_connection(connection);
            }
            s.objects.remove(&dsp);
            Ok(())
        })
    }

    fn dsp_get_system(&self, dsp: RawHandle, system: &mut RawHandle) -> Status {
        self.call("DSP_GetSystemObject", |s| {
            *system = s.dsp(dsp)?.system;
            Ok(())
        })
    }

    fn dsp_add_input(&self, dsp: RawHandle, input: RawHandle, connection_type: i32, connection: &mut RawHandle) -> Status {
        self.call("DSP_AddInput", |s| {
            let system = s.dsp(dsp)?.system;
            s.dsp(input)?;
            if dsp == input || DspConnectionType::from_code(connection_type).is_err() {
                return Err(Status::ERR_DSP_CONNECTION);
            }
            let raw = s.insert(Object::Connection(ConnectionState {
                system,
                input,
                output: dsp,
                connection_type,
                mix: 1.0,
                matrix: None,
            }));
            s.dsp_mut(dsp)?.inputs.push((input, raw));
            s.dsp_mut(input)?.outputs.push((dsp, raw));
            *connection = raw;
            Ok(())
        })
    }

    fn dsp_get_input(&self, dsp: RawHandle, index: i32, input: &mut RawHandle, connection: &mut RawHandle) -> Status {
        self.call("DSP_GetInput", |s| {
            let d = s.dsp(dsp)?;
            (*input, *connection) = to_usize(index)
                .and_then(|i| d.inputs.get(i).copied())
                .ok_or(Status::ERR_INVALID_PARAM)?;
            Ok(())
        })
    }

    fn dsp_get_output(&self, dsp: RawHandle, index: i32, output: &mut RawHandle, connection: &mut RawHandle) -> Status {
        self.call("DSP_GetOutput", |s| {
            let d = s.dsp(dsp)?;
            (*output, *connection) = to_usize(index)
                .and_then(|i| d.outputs.get(i).copied())
                .ok_or(Status::ERR_INVALID_PARAM)?;
            Ok(())
        })
    }

    fn dsp_get_num_inputs(&self, dsp: RawHandle, count: &mut i32) -> Status {
        self.call("DSP_GetNumInputs", |s| {
            *count = len_i32(s.dsp(dsp)?.inputs.len());
            Ok(())
        })
    }

    fn dsp_get_num_outputs(&self, dsp: RawHandle, count: &mut i32) -> Status {
        self.call("DSP_GetNumOutputs", |s| {
            *count = len_i32(s.dsp(dsp)?.outputs.len());
            Ok(())
        })
    }

    fn dsp_disconnect_all(&self, dsp: RawHandle, inputs: bool, outputs: bool) -> Status {
        self.call("DSP_DisconnectAll", |s| {
            let d = s.dsp(dsp)?;
            let mut connections = Vec::new();
            if inputs {
                connections.extend(d.inputs.iter().map(|&(_, c)| c));
            }
            if outputs {
                connections.extend(d.outputs.iter().map(|&(_, c)| c));
            }
            for connection in connections {
                s.remove_connection(connection);
            }
            Ok(())
        })
    }

    fn dsp_disconnect_from(&self, dsp: RawHandle, target: RawHandle, connection: RawHandle) -> Status {
        self.call("DSP_DisconnectFrom", |s| {
            let d = s.dsp(dsp)?;
            let connections: Vec<RawHandle> = d
                .inputs
                .iter()
                .chain(&d.outputs)
                .filter(|&&(peer, c)| {
                    (target.is_null() || peer == target) && (connection.is_null() || c == connection)
                })
                .map(|&(_, c)| c)
                .collect();
            for c in connections {
                s.remove_connection(c);
            }
            Ok(())
        })
    }

    fn dsp_get_num_parameters(&self, dsp: RawHandle, count: &mut i32) -> Status {
        self.call("DSP_GetNumParameters", |s| {
            *count = len_i32(s.dsp(dsp)?.descriptors.len());
            Ok(())
        })
    }

    fn dsp_get_parameter_info(&self, dsp: RawHandle, index: i32, desc: &mut RawParameterDesc) -> Status {
        self.call("DSP_GetParameterInfo", |s| {
            desc.clone_from(
                s.dsp(dsp)?
                    .descriptors
                    .get(&index)
                    .ok_or(Status::ERR_INVALID_PARAM)?,
            );
            Ok(())
        })
    }

    fn dsp_set_parameter_float(&self, dsp: RawHandle, index: i32, value: f32) -> Status {
        self.call("DSP_SetParameterFloat", |s| {
            let d = s.dsp_mut(dsp)?;
            d.check_index(index)?;
            d.floats.insert(index, value);
            Ok(())
        })
    }

    fn dsp_get_parameter_float(&self, dsp: RawHandle, index: i32, value: &mut f32) -> Status {
        self.call("DSP_GetParameterFloat", |s| {
            let d = s.dsp(dsp)?;
            d.check_index(index)?;
            *value = d.floats.get(&index).copied().unwrap_or_default();
            Ok(())
        })
    }

    fn dsp_set_parameter_int(&self, dsp: RawHandle, index: i32, value: i32) -> Status {
        self.call("DSP_SetParameterInt", |s| {
            let d = s.dsp_mut(dsp)?;
            d.check_index(index)?;
            d.ints.insert(index, value);
            Ok(())
        })
    }

    fn dsp_get_parameter_int(&self, dsp: RawHandle, index: i32, value: &mut i32) -> Status {
        self.call("DSP_GetParameterInt", |s| {
            let d = s.dsp(dsp)?;
            d.check_index(index)?;
            *value = d.ints.get(&index).copied().unwrap_or_default();
            Ok(())
        })
    }

    fn dsp_set_parameter_bool(&self, dsp: RawHandle, index: i32, value: bool) -> Status {
        self.call("DSP_SetParameterBool", |s| {
            let d = s.dsp_mut(dsp)?;
            d.check_index(index)?;
            d.bools.insert(index, value);
            Ok(())
        })
    }

    fn dsp_get_parameter_bool(&self, dsp: RawHandle, index: i32, value: &mut bool) -> Status {
        self.call("DSP_GetParameterBool", |s| {
            let d = s.dsp(dsp)?;
            d.check_index(index)?;
            *value = d.bools.get(&index).copied().unwrap_or_default();
            Ok(())
        })
    }

    fn dsp_set_parameter_data(&self, dsp: RawHandle, index: i32, data: &[u8]) -> Status {
        self.call("DSP_SetParameterData", |s| {
            let d = s.dsp_mut(dsp)?;
            d.check_index(index)?;
            if d.is_fft() && index == fft::param::SPECTRUM_DATA {
                return Err(Status::ERR_INVALID_PARAM);
            }
            d.data.insert(index, data.to_vec());
            Ok(())
        })
    }

    fn dsp_get_parameter_data(&self, dsp: RawHandle, index: i32, data: &mut RawPtr, length: &mut u32) -> Status {
        self.call("DSP_GetParameterData", |s| {
            let d = s.dsp(dsp)?;
            d.check_index(index)?;
            if d.is_fft() && index == fft::param::SPECTRUM_DATA {
                let spectrum = d.spectrum.clone();
                *data = s.alloc_spectrum(&spectrum);
                *length = u32::try_from(SPECTRUM_RECORD_LEN).unwrap_or(u32::MAX);
                return Ok(());
            }
            match d.data.get(&index).filter(|bytes| !bytes.is_empty()).cloned() {
                Some(bytes) => {
                    *length = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
                    *data = s.alloc(&bytes);
                }
                None => {
                    *length = 0;
                    *data = RawPtr::NULL;
                }
            }
            Ok(())
        })
    }

    fn dsp_get_active(&self, dsp: RawHandle, active: &mut bool) -> Status {
        self.call("DSP_GetActive", |s| {
            *active = s.dsp(dsp)?.active;
            Ok(())
        })
    }

    fn dsp_set_active(&self, dsp: RawHandle, active: bool) -> Status {
        self.call("DSP_SetActive", |s| {
            s.dsp_mut(dsp)?.active = active;
            Ok(())
        })
    }

    fn dsp_get_bypass(&self, dsp: RawHandle, bypass: &mut bool) -> Status {
        self.call("DSP_GetBypass", |s| {
            *bypass = s.dsp(dsp)?.bypass;
            Ok(())
        })
    }

    fn dsp_set_bypass(&self, dsp: RawHandle, bypass: bool) -> Status {
        self.call("DSP_SetBypass", |s| {
            s.dsp_mut(dsp)?.bypass = bypass;
            Ok(())
        })
    }

    fn dsp_get_wet_dry_mix(&self, dsp: RawHandle, prewet: &mut f32, postwet: &mut f32, dry: &mut f32) -> Status {
        self.call("DSP_GetWetDryMix", |s| {
            (*prewet, *postwet, *dry) = s.dsp(dsp)?.wet_dry;
            Ok(())
        })
    }

    fn dsp_set_wet_dry_mix(&self, dsp: RawHandle, prewet: f32, postwet: f32, dry: f32) -> Status {
        self.call("DSP_SetWetDryMix", |s| {
            s.dsp_mut(dsp)?.wet_dry = (prewet, postwet, dry);
            Ok(())
        })
    }

    fn dsp_get_idle(&self, dsp: RawHandle, idle: &mut bool) -> Status {
        self.call("DSP_GetIdle", |s| {
            *idle = s.dsp(dsp)?.inputs.is_empty();
            Ok(())
        })
    }

    fn dsp_reset(&self, dsp: RawHandle) -> Status {
        self.call("DSP_Reset", |s| {
            s.dsp_mut(dsp)?.spectrum.clear();
            Ok(())
        })
    }

    fn dsp_get_type(&self, dsp: RawHandle, dsp_type: &mut i32) -> Status {
        self.call("DSP_GetType", |s| {
            *dsp_type = s.dsp(dsp)?.dsp_type;
            Ok(())
        })
    }

    fn dsp_get_metering_enabled(&self, dsp: RawHandle, input: &mut bool, output: &mut bool) -> Status {
        self.call("DSP_GetMeteringEnabled", |s| {
            (*input, *output) = s.dsp(dsp)?.metering;
            Ok(())
        })
    }

    fn dsp_set_metering_enabled(&self, dsp: RawHandle, input: bool, output: bool) -> Status {
        self.call("DSP_SetMeteringEnabled", |s| {
            s.dsp_mut(dsp)?.metering = (input, output);
            Ok(())
        })
    }

    fn dsp_get_metering_info(
        &self,
        dsp: RawHandle,
        input: Option<&mut MeteringInfo>,
        output: Option<&mut MeteringInfo>,
    ) -> Status {
        self.call("DSP_GetMeteringInfo", |s| {
            let d = s.dsp(dsp)?;
            let channels = i16::try_from(d.channel_format.1).unwrap_or(0);
            let fill = |enabled: bool, info: &mut MeteringInfo| {
                *info = MeteringInfo {
                    num_samples: if enabled { 1024 } else { 0 },
                    num_channels: if enabled { channels } else { 0 },
                    ..MeteringInfo::default()
                };
            };
            if let Some(info) = input {
                fill(d.metering.0, info);
            }
            if let Some(info) = output {
                fill(d.metering.1, info);
            }
            Ok(())
        })
    }

    fn dsp_get_channel_format(
        &self,
        dsp: RawHandle,
        channel_mask: &mut u32,
        num_channels: &mut i32,
        speaker_mode: &mut i32,
    ) -> Status {
        self.call("DSP_GetChannelFormat", |s| {
            (*channel_mask, *num_channels, *speaker_mode) = s.dsp(dsp)?.channel_format;
            Ok(())
        })
    }

    fn dsp_set_channel_format(&self, dsp: RawHandle, channel_mask: u32, num_channels: i32, speaker_mode: i32) -> Status {
        self.call("DSP_SetChannelFormat", |s| {
            let channels = usize::try_from(num_channels).map_err(|_| Status::ERR_INVALID_PARAM)?;
            if channels > MAX_CHANNELS || SpeakerMode::from_code(speaker_mode).is_none() {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.dsp_mut(dsp)?.channel_format = (channel_mask, num_channels, speaker_mode);
            Ok(())
        })
    }

    // ── DSPConnection ──

    fn connection_get_mix(&self, connection: RawHandle, volume: &mut f32) -> Status {
        self.call("DSPConnection_GetMix", |s| {
            *volume = s.connection(connection)?.mix;
            Ok(())
        })
    }

    fn connection_set_mix(&self, connection: RawHandle, volume: f32) -> Status {
        self.call("DSPConnection_SetMix", |s| {
            s.connection_mut(connection)?.mix = volume;
            Ok(())
        })
    }

    fn connection_get_mix_matrix(
        &self,
        connection: RawHandle,
        matrix: Option<&mut [f32]>,
        out_channels: &mut i32,
        in_channels: &mut i32,
        in_hop: i32,
    ) -> Status {
        self.call("DSPConnection_GetMixMatrix", |s| {
            let stored = s.connection(connection)?.matrix.as_ref();
            read_stored_matrix(stored, matrix, out_channels, in_channels, in_hop)
        })
    }

    fn connection_set_mix_matrix(
        &self,
        connection: RawHandle,
        matrix: &[f32],
        out_channels: i32,
        in_channels: i32,
        in_hop: i32,
    ) -> Status {
        self.call("DSPConnection_SetMixMatrix", |s| {
            let packed = pack_matrix(matrix, out_channels, in_channels, in_hop)?;
            s.connection_mut(connection)?.matrix = Some(packed);
            Ok(())
        })
    }

    fn connection_get_input(&self, connection: RawHandle, dsp: &mut RawHandle) -> Status {
        self.call("DSPConnection_GetInput", |s| {
            *dsp = s.connection(connection)?.input;
            Ok(())
        })
    }

    fn connection_get_output(&self, connection: RawHandle, dsp: &mut RawHandle) -> Status {
        self.call("DSPConnection_GetOutput", |s| {
            *dsp = s.connection(connection)?.output;
            Ok(())
        })
    }

    fn connection_get_type(&self, connection: RawHandle, connection_type: &mut i32) -> Status {
        self.call("DSPConnection_GetType", |s| {
            *connection_type = s.connection(connection)?.connection_type;
            Ok(())
        })
    }

    // ── SoundGroup ──

    fn sound_group_release(&self, group: RawHandle) -> Status {
        self.call("SoundGroup_Release", |s| {
            let system = s.sound_group(group)?.system;
            let master = s.system(system)?.master_sound_group;
            if group == master {
                return Err(Status::ERR_INVALID_PARAM);
            }
            for object in s.objects.values_mut() {
                if let Object::Sound(sound) = object
                    && sound.sound_group == group
                {
                    sound.sound_group = master;
                }
            }
            s.objects.remove(&group);
            Ok(())
        })
    }

    fn sound_group_get_max_audible(&self, group: RawHandle, max: &mut i32) -> Status {
        self.call("SoundGroup_GetMaxAudible", |s| {
            *max = s.sound_group(group)?.max_audible;
            Ok(())
        })
    }

    fn sound_group_set_max_audible(&self, group: RawHandle, max: i32) -> Status {
        self.call("SoundGroup_SetMaxAudible", |s| {
            s.sound_group_mut(group)?.max_audible = max;
            Ok(())
        })
    }

    fn sound_group_get_max_audible_behavior(&self, group: RawHandle, behavior: &mut i32) -> Status {
        self.call("SoundGroup_GetMaxAudibleBehavior", |s| {
            *behavior = s.sound_group(group)?.behavior;
            Ok(())
        })
    }

    fn sound_group_set_max_audible_behavior(&self, group: RawHandle, behavior: i32) -> Status {
        self.call("SoundGroup_SetMaxAudibleBehavior", |s| {
            if !(0..=2).contains(&behavior) {
                return Err(Status::ERR_INVALID_PARAM);
            }
            s.sound_group_mut(group)?.behavior = behavior;
            Ok(())
        })
    }

    fn sound_group_get_mute_fade_speed(&self, group: RawHandle, speed: &mut f32) -> Status {
        self.call("SoundGroup_GetMuteFadeSpeed", |s| {
            *speed = s.sound_group(group)?.mute_fade_speed;
            Ok(())
        })
    }

    fn sound_group_set_mute_fade_speed(&self, group: RawHandle, speed: f32) -> Status {
        self.call("SoundGroup_SetMuteFadeSpeed", |s| {
            s.sound_group_mut(group)?.mute_fade_speed = speed;
            Ok(())
        })
    }

    fn sound_group_get_volume(&self, group: RawHandle, volume: &mut f32) -> Status {
        self.call("SoundGroup_GetVolume", |s| {
            *volume = s.sound_group(group)?.volume;
            Ok(())
        })
    }

    fn sound_group_set_volume(&self, group: RawHandle, volume: f32) -> Status {
        self.call("SoundGroup_SetVolume", |s| {
            s.sound_group_mut(group)?.volume = volume;
            Ok(())
        })
    }

    fn sound_group_get_num_sounds(&self, group: RawHandle, count: &mut i32) -> Status {
        self.call("SoundGroup_GetNumSounds", |s| {
            s.sound_group(group)?;
            let sounds = s
                .objects
                .values()
                .filter(|o| matches!(o, Object::Sound(sound) if sound.sound_group == group))
                .count();
            *count = len_i32(sounds);
            Ok(())
        })
    }

    fn sound_group_get_sound(&self, group: RawHandle, index: i32, sound: &mut RawHandle) -> Status {
        self.call("SoundGroup_GetSound", |s| {
            s.sound_group(group)?;
            *sound = s
                .objects
                .iter()
                .filter(|(_, o)| matches!(o, Object::Sound(sound) if sound.sound_group == group))
                .map(|(&raw, _)| raw)
                .nth(to_usize(index).ok_or(Status::ERR_INVALID_PARAM)?)
                .ok_or(Status::ERR_INVALID_PARAM)?;
            Ok(())
        })
    }

    fn sound_group_get_num_playing(&self, group: RawHandle, count: &mut i32) -> Status {
        self.call("SoundGroup_GetNumPlaying", |s| {
            s.sound_group(group)?;
            let playing = s.channels_where(|c| {
                matches!(s.objects.get(&c.sound), Some(Object::Sound(sound)) if sound.sound_group == group)
            });
            *count = len_i32(playing.len());
            Ok(())
        })
    }

    fn sound_group_stop(&self, group: RawHandle) -> Status {
        self.call("SoundGroup_Stop", |s| {
            s.sound_group(group)?;
            let playing = s.channels_where(|c| {
                matches!(s.objects.get(&c.sound), Some(Object::Sound(sound)) if sound.sound_group == group)
            });
            for channel in playing {
                s.end_channel(channel);
            }
            Ok(())
        })
    }

    fn sound_group_get_name(&self, group: RawHandle, name: &mut String) -> Status {
        self.call("SoundGroup_GetName", |s| {
            name.clone_from(&s.sound_group(group)?.name);
            Ok(())
        })
    }
}
