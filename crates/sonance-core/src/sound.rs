//! Loaded and streamed audio data.

use crate::error::Result;
use crate::flags::{LoopPoints, Mode, SoundFormat, TimeUnit};
use crate::handle::native_object;
use crate::native::{RawHandle, check_c_str};
use crate::sound_group::SoundGroup;
use crate::status::Status;
use crate::system::System;
use crate::tag::{RawTag, Tag, TagCount};

native_object!(
    /// Audio data that channels play.
    ///
    /// Owned when created through [`System::create_sound`] or
    /// [`System::create_stream`]; sub-sounds and query results are borrowed.
    Sound, Sound
);

/// Default frequency and priority applied to new channels of a sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundDefaults {
    /// Playback frequency in Hz.
    pub frequency: f32,
    /// Voice priority, 0 (most important) to 256.
    pub priority: i32,
}

impl Sound {
    /// Releases the sound. Channels playing it are stopped.
    pub fn close(self) -> Result<()> {
        self.handle.release()?;
        Ok(())
    }

    /// `false` once the sound has been released.
    pub fn is_valid(&self) -> Result<bool> {
        let mut mode = Mode::DEFAULT;
        Ok(self
            .handle
            .api()
            .sound_get_mode(self.raw(), &mut mode)
            .liveness(|| "Sound_GetMode".into())?)
    }

    /// Name or path the sound was opened with.
    pub fn name(&self) -> Result<String> {
        let mut name = String::new();
        self.handle
            .api()
            .sound_get_name(self.raw(), &mut name)
            .check("Sound_GetName")?;
        Ok(name)
    }

    /// Length in `unit`.
    pub fn length(&self, unit: TimeUnit) -> Result<u32> {
        let mut length = 0;
        self.handle
            .api()
            .sound_get_length(self.raw(), &mut length, unit)
            .check("Sound_GetLength")?;
        Ok(length)
    }

    /// Container and sample format.
    pub fn format(&self) -> Result<SoundFormat> {
        let (mut sound_type, mut format, mut channels, mut bits) = (0, 0, 0, 0);
        self.handle
            .api()
            .sound_get_format(self.raw(), &mut sound_type, &mut format, &mut channels, &mut bits)
            .check("Sound_GetFormat")?;
        Ok(SoundFormat {
            sound_type,
            format,
            channels,
            bits,
        })
    }

    /// Mode flags.
    pub fn mode(&self) -> Result<Mode> {
        let mut mode = Mode::DEFAULT;
        self.handle
            .api()
            .sound_get_mode(self.raw(), &mut mode)
            .check("Sound_GetMode")?;
        Ok(mode)
    }

    /// Changes mode flags for channels started afterwards.
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.handle
            .api()
            .sound_set_mode(self.raw(), mode)
            .check("Sound_SetMode")?;
        Ok(())
    }

    /// Loop count; -1 loops forever.
    pub fn loop_count(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .sound_get_loop_count(self.raw(), &mut count)
            .check("Sound_GetLoopCount")?;
        Ok(count)
    }

    /// Sets the loop count for channels started afterwards.
    pub fn set_loop_count(&self, count: i32) -> Result<()> {
        self.handle
            .api()
            .sound_set_loop_count(self.raw(), count)
            .check("Sound_SetLoopCount")?;
        Ok(())
    }

    /// Loop region with each endpoint in the requested unit.
    pub fn loop_points(&self, start_unit: TimeUnit, end_unit: TimeUnit) -> Result<LoopPoints> {
        let (mut start, mut end) = (0, 0);
        self.handle
            .api()
            .sound_get_loop_points(self.raw(), &mut start, start_unit, &mut end, end_unit)
            .check("Sound_GetLoopPoints")?;
        Ok(LoopPoints {
            start,
            start_unit,
            end,
            end_unit,
        })
    }

    /// Sets the loop region.
    pub fn set_loop_points(&self, points: LoopPoints) -> Result<()> {
        self.handle
            .api()
            .sound_set_loop_points(
                self.raw(),
                points.start,
                points.start_unit,
                points.end,
                points.end_unit,
            )
            .check("Sound_SetLoopPoints")?;
        Ok(())
    }

    /// Frequency and priority new channels start with.
    pub fn defaults(&self) -> Result<SoundDefaults> {
        let (mut frequency, mut priority) = (0.0, 0);
        self.handle
            .api()
            .sound_get_defaults(self.raw(), &mut frequency, &mut priority)
            .check("Sound_GetDefaults")?;
        Ok(SoundDefaults {
            frequency,
            priority,
        })
    }

    /// Changes the defaults for channels started afterwards.
    pub fn set_defaults(&self, defaults: SoundDefaults) -> Result<()> {
        self.handle
            .api()
            .sound_set_defaults(self.raw(), defaults.frequency, defaults.priority)
            .check("Sound_SetDefaults")?;
        Ok(())
    }

    /// Number of sub-sounds (e.g. entries of a sound bank).
    pub fn num_sub_sounds(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .sound_get_num_sub_sounds(self.raw(), &mut count)
            .check("Sound_GetNumSubSounds")?;
        Ok(count)
    }

    /// Sub-sound at `index`. Owned by this sound.
    pub fn sub_sound(&self, index: i32) -> Result<Sound> {
        let mut sub = RawHandle::NULL;
        self.handle
            .api()
            .sound_get_sub_sound(self.raw(), index, &mut sub)
            .check("Sound_GetSubSound")?;
        Ok(Sound::borrowed(self.handle.ctx(), sub))
    }

    /// The containing sound, if this is a sub-sound.
    pub fn sub_sound_parent(&self) -> Result<Option<Sound>> {
        let mut parent = RawHandle::NULL;
        self.handle
            .api()
            .sound_get_sub_sound_parent(self.raw(), &mut parent)
            .check("Sound_GetSubSoundParent")?;
        Ok(Sound::borrowed_opt(self.handle.ctx(), parent))
    }

    /// Group this sound counts against.
    pub fn sound_group(&self) -> Result<SoundGroup> {
        let mut group = RawHandle::NULL;
        self.handle
            .api()
            .sound_get_sound_group(self.raw(), &mut group)
            .check("Sound_GetSoundGroup")?;
        Ok(SoundGroup::borrowed(self.handle.ctx(), group))
    }

    /// Moves the sound into `group`.
    pub fn set_sound_group(&self, group: &SoundGroup) -> Result<()> {
        self.handle
            .api()
            .sound_set_sound_group(self.raw(), group.raw())
            .check("Sound_SetSoundGroup")?;
        Ok(())
    }

    /// How many metadata tags the sound holds, and how many changed since
    /// they were last read.
    pub fn num_tags(&self) -> Result<TagCount> {
        let mut count = TagCount::default();
        self.handle
            .api()
            .sound_get_num_tags(self.raw(), &mut count.stored, &mut count.updated)
            .check("Sound_GetNumTags")?;
        Ok(count)
    }

    /// The `index`th tag named `name`, or the `index`th tag overall when
    /// `name` is `None`. Reading a tag clears its updated flag.
    pub fn tag(&self, name: Option<&str>, index: i32) -> Result<Tag> {
        if let Some(name) = name {
            check_c_str(name)?;
        }
        let mut raw = RawTag::default();
        let api = self.handle.api();
        api.sound_get_tag(self.raw(), name, index, &mut raw)
            .check("Sound_GetTag")?;
        Ok(Tag::decode(api, &raw)?)
    }

    /// Like [`tag`](Self::tag), with a missing tag reported as `None`.
    pub fn find_tag(&self, name: &str, index: i32) -> Result<Option<Tag>> {
        match self.tag(Some(name), index) {
            Err(err) if err.status() == Some(Status::ERR_TAGNOTFOUND) => Ok(None),
            other => other.map(Some),
        }
    }

    /// The owning system (borrowed).
    pub fn system(&self) -> Result<System> {
        let mut system = RawHandle::NULL;
        self.handle
            .api()
            .sound_get_system(self.raw(), &mut system)
            .check("Sound_GetSystemObject")?;
        Ok(System::borrowed(self.handle.ctx(), system))
    }
}
