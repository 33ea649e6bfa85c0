//! Submix buses.

use crate::callback::ChannelGroupCallback;
use crate::channel::Channel;
use crate::channel_control::{ChannelControl, sealed};
use crate::dsp_connection::DspConnection;
use crate::error::Result;
use crate::handle::{NativeHandle, native_object};
use crate::native::RawHandle;

native_object!(
    /// A bus that channels and other groups mix into.
    ///
    /// Owned when created with
    /// [`System::create_channel_group`](crate::System::create_channel_group);
    /// the master group and groups returned by queries are borrowed.
    ChannelGroup, ChannelGroup
);

impl sealed::Sealed for ChannelGroup {
    fn control(&self) -> &NativeHandle {
        &self.handle
    }
}

impl ChannelControl for ChannelGroup {
    type Callbacks = dyn ChannelGroupCallback;
}

impl ChannelGroup {
    /// Releases the group. Its channels are moved to the master group.
    pub fn close(self) -> Result<()> {
        self.handle.release()?;
        Ok(())
    }

    /// Routes `child` into this group. With `propagate_dsp_clock` the child
    /// follows this group's pause and delay state.
    pub fn add_group(&self, child: &ChannelGroup, propagate_dsp_clock: bool) -> Result<DspConnection> {
        let mut connection = RawHandle::NULL;
        self.handle
            .api()
            .channel_group_add_group(self.raw(), child.raw(), propagate_dsp_clock, &mut connection)
            .check("ChannelGroup_AddGroup")?;
        Ok(DspConnection::borrowed(self.handle.ctx(), connection))
    }

    /// Number of direct child groups.
    pub fn num_groups(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .channel_group_get_num_groups(self.raw(), &mut count)
            .check("ChannelGroup_GetNumGroups")?;
        Ok(count)
    }

    /// Child group at `index`.
    pub fn group(&self, index: i32) -> Result<ChannelGroup> {
        let mut group = RawHandle::NULL;
        self.handle
            .api()
            .channel_group_get_group(self.raw(), index, &mut group)
            .check("ChannelGroup_GetGroup")?;
        Ok(ChannelGroup::borrowed(self.handle.ctx(), group))
    }

    /// Parent group; `None` for the master group.
    pub fn parent_group(&self) -> Result<Option<ChannelGroup>> {
        let mut parent = RawHandle::NULL;
        self.handle
            .api()
            .channel_group_get_parent_group(self.raw(), &mut parent)
            .check("ChannelGroup_GetParentGroup")?;
        Ok(ChannelGroup::borrowed_opt(self.handle.ctx(), parent))
    }

    /// `true` for the system's master group.
    pub fn is_master(&self) -> Result<bool> {
        Ok(self.parent_group()?.is_none())
    }

    /// Number of channels routed directly into this group.
    pub fn num_channels(&self) -> Result<i32> {
        let mut count = 0;
        self.handle
            .api()
            .channel_group_get_num_channels(self.raw(), &mut count)
            .check("ChannelGroup_GetNumChannels")?;
        Ok(count)
    }

    /// Channel at `index`; `None` if that slot is empty.
    pub fn channel(&self, index: i32) -> Result<Option<Channel>> {
        let mut channel = RawHandle::NULL;
        self.handle
            .api()
            .channel_group_get_channel(self.raw(), index, &mut channel)
            .check("ChannelGroup_GetChannel")?;
        Ok(Channel::borrowed_opt(self.handle.ctx(), channel))
    }

    /// Name given at creation.
    pub fn name(&self) -> Result<String> {
        let mut name = String::new();
        self.handle
            .api()
            .channel_group_get_name(self.raw(), &mut name)
            .check("ChannelGroup_GetName")?;
        Ok(name)
    }
}
