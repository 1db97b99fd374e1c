//! One time sample: channel values for every bone in the skeleton

use glam::Mat4;

use crate::channel::Channel;
use crate::channel_data::ChannelData;
use crate::error::{BvhError, Result};
use crate::skeleton::{BoneId, Skeleton};

/// The complete set of channel values for every bone at one time sample.
///
/// A frame owns one [`ChannelData`] per bone, in the skeleton's pre-order
/// traversal — the same order motion data lines are laid out in the file.
/// Bones without channels still get an (empty) entry so the sequence stays
/// aligned 1:1 with the bone list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    channel_data: Vec<ChannelData>,
}

impl Frame {
    /// Creates a rest-pose frame for a skeleton: every declared channel
    /// of every bone set to 0.0, in pre-order.
    pub fn for_skeleton(skeleton: &Skeleton) -> Self {
        let channel_data = skeleton
            .preorder()
            .into_iter()
            .filter_map(|id| skeleton.bone(id).map(|bone| ChannelData::zeroed(id, bone)))
            .collect();
        Self { channel_data }
    }

    pub(crate) fn from_channel_data(channel_data: Vec<ChannelData>) -> Self {
        Self { channel_data }
    }

    /// The frame's channel data, one entry per bone in pre-order
    pub fn channel_data(&self) -> &[ChannelData] {
        &self.channel_data
    }

    /// The channel data belonging to `bone`.
    ///
    /// Lookup is by bone identity; a miss means the frame and the skeleton
    /// do not belong together and fails with
    /// [`BvhError::StructuralMismatch`].
    pub fn channel_data_for(&self, bone: BoneId) -> Result<&ChannelData> {
        self.channel_data
            .iter()
            .find(|data| data.bone() == bone)
            .ok_or_else(|| missing_bone(bone))
    }

    /// Mutable access to the channel data belonging to `bone`
    pub fn channel_data_for_mut(&mut self, bone: BoneId) -> Result<&mut ChannelData> {
        self.channel_data
            .iter_mut()
            .find(|data| data.bone() == bone)
            .ok_or_else(|| missing_bone(bone))
    }

    /// Reads one channel value for a bone
    pub fn get_channel(&self, bone: BoneId, channel: &Channel) -> Result<f32> {
        self.channel_data_for(bone)?.get(channel)
    }

    /// Writes one channel value for a bone
    pub fn set_channel(&mut self, bone: BoneId, channel: &Channel, value: f32) -> Result<()> {
        self.channel_data_for_mut(bone)?.set(channel, value)
    }

    /// Adds `delta` (radians for rotation channels) to one channel of a bone
    pub fn rotate(&mut self, bone: BoneId, channel: &Channel, delta: f32) -> Result<()> {
        self.channel_data_for_mut(bone)?.rotate(channel, delta)
    }

    /// Adds a displacement to a bone's three position channels
    pub fn translate(&mut self, bone: BoneId, dx: f32, dy: f32, dz: f32) -> Result<()> {
        self.channel_data_for_mut(bone)?.translate(dx, dy, dz)
    }

    /// The local (bone-to-parent) transform of `bone` in this frame
    pub fn relative_transform_matrix(&self, skeleton: &Skeleton, bone: BoneId) -> Result<Mat4> {
        let data = self.channel_data_for(bone)?;
        let bone_ref = skeleton.bone(bone).ok_or_else(|| missing_bone(bone))?;
        Ok(data.relative_transform_matrix(bone_ref))
    }

    /// The world (bone-to-world) transform of `bone` in this frame.
    ///
    /// The bone's local matrix pre-multiplied by every ancestor's local
    /// matrix up to the root; for the root itself this equals
    /// [`Frame::relative_transform_matrix`].
    pub fn absolute_transform_matrix(&self, skeleton: &Skeleton, bone: BoneId) -> Result<Mat4> {
        let mut m = self.relative_transform_matrix(skeleton, bone)?;
        let mut current = skeleton.bone(bone).ok_or_else(|| missing_bone(bone))?;
        while let Some(parent) = current.parent() {
            m = self.relative_transform_matrix(skeleton, parent)? * m;
            current = skeleton.bone(parent).ok_or_else(|| missing_bone(parent))?;
        }
        Ok(m)
    }

    /// Element-wise sum with another frame of the same shape
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, ChannelData::try_add)
    }

    /// Element-wise difference with another frame of the same shape
    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, ChannelData::try_sub)
    }

    /// Element-wise product with another frame of the same shape
    pub fn try_mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, ChannelData::try_mul)
    }

    /// Element-wise quotient with another frame of the same shape
    pub fn try_div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, ChannelData::try_div)
    }

    /// Adds a scalar to every channel of every bone
    pub fn add_scalar(&self, scalar: f32) -> Self {
        self.map(|data| data.add_scalar(scalar))
    }

    /// Subtracts a scalar from every channel of every bone
    pub fn sub_scalar(&self, scalar: f32) -> Self {
        self.map(|data| data.sub_scalar(scalar))
    }

    /// Multiplies every channel of every bone by a scalar
    pub fn mul_scalar(&self, scalar: f32) -> Self {
        self.map(|data| data.mul_scalar(scalar))
    }

    /// Divides every channel of every bone by a scalar
    pub fn div_scalar(&self, scalar: f32) -> Self {
        self.map(|data| data.div_scalar(scalar))
    }

    fn zip_with(
        &self,
        other: &Self,
        op: impl Fn(&ChannelData, &ChannelData) -> Result<ChannelData>,
    ) -> Result<Self> {
        if self.channel_data.len() != other.channel_data.len() {
            return Err(BvhError::StructuralMismatch(format!(
                "frames hold channel data for {} and {} bones",
                self.channel_data.len(),
                other.channel_data.len()
            )));
        }
        let channel_data = self
            .channel_data
            .iter()
            .zip(&other.channel_data)
            .map(|(a, b)| op(a, b))
            .collect::<Result<_>>()?;
        Ok(Self { channel_data })
    }

    fn map(&self, op: impl Fn(&ChannelData) -> ChannelData) -> Self {
        Self {
            channel_data: self.channel_data.iter().map(op).collect(),
        }
    }
}

fn missing_bone(bone: BoneId) -> BvhError {
    BvhError::StructuralMismatch(format!("no channel data for bone #{}", bone.index()))
}
