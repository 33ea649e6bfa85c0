//! Playing voices.

use crate::callback::ChannelCallback;
use crate::channel_control::{ChannelControl, sealed};
use crate::channel_group::ChannelGroup;
use crate::error::Result;
use crate::flags::{LoopPoints, TimeUnit};
use crate::handle::{NativeHandle, native_object};
use crate::native::RawHandle;
use crate::sound::Sound;

native_object!(
    /// One voice playing a sound or DSP.
    ///
    /// Channels belong to the engine: they are always borrowed and go stale
    /// when playback ends or the voice is stolen. Use
    /// [`is_valid`](ChannelControl::is_valid) or
    /// [`try_stop`](ChannelControl::try_stop) when that may have happened.
    Channel, Channel
);

impl sealed::Sealed for Channel {
    fn control(&self) -> &NativeHandle {
        &self.handle
    }
}

impl ChannelControl for Channel {
    type Callbacks = dyn ChannelCallback;
}

impl Channel {
    /// Playback frequency in Hz.
    pub fn frequency(&self) -> Result<f32> {
        let mut frequency = 0.0;
        self.handle
            .api()
            .channel_get_frequency(self.raw(), &mut frequency)
            .check("Channel_GetFrequency")?;
        Ok(frequency)
    }

    /// Changes the playback frequency.
    pub fn set_frequency(&self, frequency: f32) -> Result<()> {
        self.handle
            .api()
            .channel_set_frequency(self.raw(), frequency)
            .check("Channel_SetFrequency")?;
        Ok(())
    }

    /// Voice-stealing priority, 0 (most important) to 256.
    pub fn priority(&self) -> Result<i32> {
        let mut priority = 0;
        self.handle
            .api()
            .channel_get_priority(self.raw(), &mut priority)
            .check("Channel_GetPriority")?;
        Ok(priority)
    }

    /// Sets the voice-stealing priority.
    pub fn set_priority(&self, priority: i32) -> Result<()> {
        self.handle
            .api()
            .channel_set_priority(self.raw(), priority)
            .check("Channel_SetPriority")?;
        Ok(())
    }

    /// Playback position in `unit`.
    pub fn position(&self, unit: TimeUnit) -> Result<u32> {
        let mut position = 0;
        self.handle
            .api()
            .channel_get_position(self.raw(), &mut position, unit)
            .check("Channel_GetPosition")?;
        Ok(position)
    }

    /// Seeks to `position` in `unit`.
    pub fn set_position(&self, position: u32, unit: TimeUnit) -> Result<()> {
        self.handle
            .api()
            .channel_set_position(self.raw(), position, unit)
            .check("Channel_SetPosition")?;
        Ok(())
    }

    /// Remaining loop count; -1 loops forever.
    pub fn loop_count(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .channel_get_loop_count(self.raw(), &mut count)
            .check("Channel_GetLoopCount")?;
        Ok(count)
    }

    /// Sets the loop count for this voice only.
    pub fn set_loop_count(&self, count: i32) -> Result<()> {
        self.handle
            .api()
            .channel_set_loop_count(self.raw(), count)
            .check("Channel_SetLoopCount")?;
        Ok(())
    }

    /// Loop region with each endpoint in the requested unit.
    pub fn loop_points(&self, start_unit: TimeUnit, end_unit: TimeUnit) -> Result<LoopPoints> {
        let (mut start, mut end) = (0, 0);
        self.handle
            .api()
            .channel_get_loop_points(self.raw(), &mut start, start_unit, &mut end, end_unit)
            .check("Channel_GetLoopPoints")?;
        Ok(LoopPoints {
            start,
            start_unit,
            end,
            end_unit,
        })
    }

    /// Sets the loop region for this voice only.
    pub fn set_loop_points(&self, points: LoopPoints) -> Result<()> {
        self.handle
            .api()
            .channel_set_loop_points(
                self.raw(),
                points.start,
                points.start_unit,
                points.end,
                points.end_unit,
            )
            .check("Channel_SetLoopPoints")?;
        Ok(())
    }

    /// `true` when the voice is tracked but not mixed.
    pub fn is_virtual(&self) -> Result<bool> {
        let mut is_virtual = false;
        self.handle
            .api()
            .channel_is_virtual(self.raw(), &mut is_virtual)
            .check("Channel_IsVirtual")?;
        Ok(is_virtual)
    }

    /// The sound being played, if the voice plays a sound (not a DSP).
    pub fn current_sound(&self) -> Result<Option<Sound>> {
        let mut sound = RawHandle::NULL;
        self.handle
            .api()
            .channel_get_current_sound(self.raw(), &mut sound)
            .check("Channel_GetCurrentSound")?;
        Ok(Sound::borrowed_opt(self.handle.ctx(), sound))
    }

    /// Index of this voice in the pool.
    pub fn index(&self) -> Result<i32> {
        let mut index = 0;
        self.handle
            .api()
            .channel_get_index(self.raw(), &mut index)
            .check("Channel_GetIndex")?;
        Ok(index)
    }

    /// Group the voice is routed into.
    pub fn channel_group(&self) -> Result<ChannelGroup> {
        let mut group = RawHandle::NULL;
        self.handle
            .api()
            .channel_get_channel_group(self.raw(), &mut group)
            .check("Channel_GetChannelGroup")?;
        Ok(ChannelGroup::borrowed(self.handle.ctx(), group))
    }

    /// Re-routes the voice into `group`.
    pub fn set_channel_group(&self, group: &ChannelGroup) -> Result<()> {
        self.handle
            .api()
            .channel_set_channel_group(self.raw(), group.raw())
            .check("Channel_SetChannelGroup")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::flags::Mode;
    use crate::mock::MockEngine;
    use crate::status::Status;
    use crate::system::System;
    use std::sync::Arc;

    fn play() -> (Arc<MockEngine>, System, Sound, Channel) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        let sound = system.create_sound("pad.wav", Mode::DEFAULT).unwrap();
        let channel = system.play_sound(&sound, None, false).unwrap();
        (engine, system, sound, channel)
    }

    #[test]
    fn current_sound_is_borrowed() {
        let (_engine, _system, sound, channel) = play();
        let current = channel.current_sound().unwrap().unwrap();
        assert_eq!(current.raw(), sound.raw());
        assert!(!current.is_owned());
        drop(current);
        assert!(sound.is_valid().unwrap());
    }

    #[test]
    fn stale_after_end() {
        let (engine, _system, _sound, channel) = play();
        assert!(channel.is_valid().unwrap());
        engine.emit_end(channel.raw()).unwrap();
        assert!(!channel.is_valid().unwrap());
        assert!(!channel.try_stop().unwrap());
        let err = channel.stop().unwrap_err();
        assert_eq!(err.status(), Some(Status::ERR_INVALID_HANDLE));
    }

    #[test]
    fn stolen_channel_is_stale() {
        let (engine, _system, _sound, channel) = play();
        engine.steal(channel.raw());
        assert!(!channel.is_valid().unwrap());
        assert!(matches!(
            channel.frequency(),
            Err(Error::Engine(e)) if e.status() == Status::ERR_CHANNEL_STOLEN
        ));
    }

    #[test]
    fn other_failures_are_errors() {
        let (engine, _system, _sound, channel) = play();
        engine.fail_next("Channel_IsPlaying", Status::ERR_INTERNAL);
        let err = channel.is_valid().unwrap_err();
        assert_eq!(err.status(), Some(Status::ERR_INTERNAL));
        assert!(err.to_string().starts_with("Channel_IsPlaying: INTERNAL (28)"));
    }

    #[test]
    fn properties_round_trip() {
        let (_engine, _system, _sound, channel) = play();
        channel.set_frequency(22_050.0).unwrap();
        assert_eq!(channel.frequency().unwrap(), 22_050.0);
        channel.set_priority(12).unwrap();
        assert_eq!(channel.priority().unwrap(), 12);
        channel.set_position(480, TimeUnit::PCM).unwrap();
        assert_eq!(channel.position(TimeUnit::PCM).unwrap(), 480);
        channel.set_loop_count(-1).unwrap();
        assert_eq!(channel.loop_count().unwrap(), -1);
        let points = LoopPoints::new(10, 900, TimeUnit::MS);
        channel.set_loop_points(points).unwrap();
        assert_eq!(channel.loop_points(TimeUnit::MS, TimeUnit::MS).unwrap(), points);
        assert!(!channel.is_virtual().unwrap());
        assert_eq!(channel.index().unwrap(), 0);
    }

    #[test]
    fn regrouping() {
        let (_engine, system, _sound, channel) = play();
        let master = system.master_channel_group().unwrap();
        assert_eq!(channel.channel_group().unwrap().raw(), master.raw());
        let music = system.create_channel_group("music").unwrap();
        channel.set_channel_group(&music).unwrap();
        assert_eq!(channel.channel_group().unwrap().raw(), music.raw());
        assert_eq!(music.num_channels().unwrap(), 1);
    }
}
