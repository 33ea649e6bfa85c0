//! Groups that cap how many sounds of a kind play at once.

use crate::error::Result;
use crate::handle::native_object;
use crate::native::RawHandle;
use crate::sound::Sound;

native_object!(
    /// A named set of sounds sharing an audibility limit and volume.
    SoundGroup, SoundGroup
);

/// What happens when a sound group is over its audible limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxAudibleBehavior {
    /// New sounds fail to play.
    #[default]
    Fail,
    /// New sounds start silent and take over when a slot frees.
    Mute,
    /// The quietest sound is stolen.
    StealLowest,
}

impl MaxAudibleBehavior {
    /// Native code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Fail => 0,
            Self::Mute => 1,
            Self::StealLowest => 2,
        }
    }

    /// Decodes a native code.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Fail,
            1 => Self::Mute,
            2 => Self::StealLowest,
            _ => return None,
        })
    }
}

impl SoundGroup {
    /// Releases the group; its sounds move to the master group.
    pub fn close(self) -> Result<()> {
        self.handle.release()?;
        Ok(())
    }

    /// `false` once the group has been released.
    pub fn is_valid(&self) -> Result<bool> {
        let mut max = 0;
        Ok(self
            .handle
            .api()
            .sound_group_get_max_audible(self.raw(), &mut max)
            .liveness(|| "SoundGroup_GetMaxAudible".into())?)
    }

    /// Audible limit; -1 for unlimited.
    pub fn max_audible(&self) -> Result<i32> {
        let mut max = 0;
        self.handle
            .api()
            .sound_group_get_max_audible(self.raw(), &mut max)
            .check("SoundGroup_GetMaxAudible")?;
        Ok(max)
    }

    /// Sets the audible limit.
    pub fn set_max_audible(&self, max: i32) -> Result<()> {
        self.handle
            .api()
            .sound_group_set_max_audible(self.raw(), max)
            .check("SoundGroup_SetMaxAudible")?;
        Ok(())
    }

    /// Behaviour when over the limit.
    pub fn max_audible_behavior(&self) -> Result<MaxAudibleBehavior> {
        let mut code = 0;
        self.handle
            .api()
            .sound_group_get_max_audible_behavior(self.raw(), &mut code)
            .check("SoundGroup_GetMaxAudibleBehavior")?;
        // Codes added by newer engines fall back to the documented default.
        Ok(MaxAudibleBehavior::from_code(code).unwrap_or_default())
    }

    /// Sets the behaviour when over the limit.
    pub fn set_max_audible_behavior(&self, behavior: MaxAudibleBehavior) -> Result<()> {
        self.handle
            .api()
            .sound_group_set_max_audible_behavior(self.raw(), behavior.code())
            .check("SoundGroup_SetMaxAudibleBehavior")?;
        Ok(())
    }

    /// Seconds a muted sound takes to fade, under [`MaxAudibleBehavior::Mute`].
    pub fn mute_fade_speed(&self) -> Result<f32> {
        let mut speed = 0.0;
        self.handle
            .api()
            .sound_group_get_mute_fade_speed(self.raw(), &mut speed)
            .check("SoundGroup_GetMuteFadeSpeed")?;
        Ok(speed)
    }

    /// Sets the mute fade time in seconds.
    pub fn set_mute_fade_speed(&self, speed: f32) -> Result<()> {
        self.handle
            .api()
            .sound_group_set_mute_fade_speed(self.raw(), speed)
            .check("SoundGroup_SetMuteFadeSpeed")?;
        Ok(())
    }

    /// Group volume.
    pub fn volume(&self) -> Result<f32> {
        let mut volume = 0.0;
        self.handle
            .api()
            .sound_group_get_volume(self.raw(), &mut volume)
            .check("SoundGroup_GetVolume")?;
        Ok(volume)
    }

    /// Sets the group volume.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.handle
            .api()
            .sound_group_set_volume(self.raw(), volume)
            .check("SoundGroup_SetVolume")?;
        Ok(())
    }

    /// Number of sounds in the group.
    pub fn num_sounds(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .sound_group_get_num_sounds(self.raw(), &mut count)
            .check("SoundGroup_GetNumSounds")?;
        Ok(count)
    }

    /// Sound at `index`.
    pub fn sound(&self, index: i32) -> Result<Sound> {
        let mut sound = RawHandle::NULL;
        self.handle
            .api()
            .sound_group_get_sound(self.raw(), index, &mut sound)
            .check("SoundGroup_GetSound")?;
        Ok(Sound::borrowed(self.handle.ctx(), sound))
    }

    /// Channels currently playing sounds of this group.
    pub fn num_playing(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .sound_group_get_num_playing(self.raw(), &mut count)
            .check("SoundGroup_GetNumPlaying")?;
        Ok(count)
    }

    /// Stops every channel playing a sound of this group.
    pub fn stop(&self) -> Result<()> {
        self.handle
            .api()
            .sound_group_stop(self.raw())
            .check("SoundGroup_Stop")?;
        Ok(())
    }

    /// Like [`stop`](Self::stop); `false` if the group was already released.
    pub fn try_stop(&self) -> Result<bool> {
        Ok(self
            .handle
            .api()
            .sound_group_stop(self.raw())
            .liveness(|| "SoundGroup_Stop".into())?)
    }

    /// Name given at creation.
    pub fn name(&self) -> Result<String> {
        let mut name = String::new();
        self.handle
            .api()
            .sound_group_get_name(self.raw(), &mut name)
            .check("SoundGroup_GetName")?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_control::ChannelControl;
    use crate::flags::Mode;
    use crate::mock::MockEngine;
    use crate::system::System;
    use std::sync::Arc;

    fn setup() -> (Arc<MockEngine>, System) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        (engine, system)
    }

    #[test]
    fn behaviour_codes() {
        assert_eq!(MaxAudibleBehavior::from_code(2), Some(MaxAudibleBehavior::StealLowest));
        assert_eq!(MaxAudibleBehavior::from_code(3), None);
        assert_eq!(MaxAudibleBehavior::Mute.code(), 1);
    }

    #[test]
    fn limits_round_trip() {
        let (_engine, system) = setup();
        let group = system.create_sound_group("voices").unwrap();
        assert_eq!(group.name().unwrap(), "voices");
        assert_eq!(group.max_audible().unwrap(), -1);
        group.set_max_audible(4).unwrap();
        assert_eq!(group.max_audible().unwrap(), 4);
        group
            .set_max_audible_behavior(MaxAudibleBehavior::StealLowest)
            .unwrap();
        assert_eq!(
            group.max_audible_behavior().unwrap(),
            MaxAudibleBehavior::StealLowest
        );
        group.set_mute_fade_speed(0.5).unwrap();
        assert_eq!(group.mute_fade_speed().unwrap(), 0.5);
        group.set_volume(0.8).unwrap();
        assert_eq!(group.volume().unwrap(), 0.8);
    }

    #[test]
    fn playing_sounds_are_counted_and_stopped() {
        let (_engine, system) = setup();
        let group = system.create_sound_group("sfx").unwrap();
        let sound = system.create_sound("zap.wav", Mode::DEFAULT).unwrap();
        sound.set_sound_group(&group).unwrap();
        assert_eq!(group.sound(0).unwrap().raw(), sound.raw());

        let first = system.play_sound(&sound, None, false).unwrap();
        let second = system.play_sound(&sound, None, false).unwrap();
        assert_eq!(group.num_playing().unwrap(), 2);

        group.stop().unwrap();
        assert_eq!(group.num_playing().unwrap(), 0);
        assert!(!first.is_valid().unwrap());
        assert!(!second.is_valid().unwrap());
    }

    #[test]
    fn released_group_is_stale() {
        let (_engine, system) = setup();
        let group = system.create_sound_group("temp").unwrap();
        let view = group.to_borrowed();
        group.close().unwrap();
        assert!(!view.is_valid().unwrap());
        assert!(!view.try_stop().unwrap());
    }
}
