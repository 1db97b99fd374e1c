//! Per-bone channel values for a single frame

use glam::{Mat4, Vec4};

use crate::channel::{Axis, Channel};
use crate::error::{BvhError, Result};
use crate::skeleton::{Bone, BoneId};

/// The channel values of one bone in one frame.
///
/// Values are stored in the bone's declared channel order; that order
/// drives both matrix composition and export column order. The key set is
/// fixed to the channels declared for the bone: reading or writing any
/// other channel fails with [`BvhError::UnknownChannel`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelData {
    bone: BoneId,
    values: Vec<(Channel, f32)>,
}

impl ChannelData {
    /// Creates channel data for `bone` with every declared channel at 0.0
    pub fn zeroed(id: BoneId, bone: &Bone) -> Self {
        Self {
            bone: id,
            values: bone.channels().iter().map(|c| (c.clone(), 0.0)).collect(),
        }
    }

    pub(crate) fn from_values(bone: BoneId, values: Vec<(Channel, f32)>) -> Self {
        Self { bone, values }
    }

    /// The bone this data describes
    pub fn bone(&self) -> BoneId {
        self.bone
    }

    /// Iterates channel/value pairs in the bone's declared order
    pub fn iter(&self) -> impl Iterator<Item = (&Channel, f32)> {
        self.values.iter().map(|(c, v)| (c, *v))
    }

    /// Number of channels held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the bone declares no channels
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads the value of a declared channel.
    ///
    /// Fails with [`BvhError::UnknownChannel`] if the channel was not
    /// declared for this bone.
    pub fn get(&self, channel: &Channel) -> Result<f32> {
        self.value_of(channel)
            .ok_or_else(|| self.unknown_channel(channel))
    }

    /// Writes the value of a declared channel.
    ///
    /// Fails with [`BvhError::UnknownChannel`] if the channel was not
    /// declared for this bone; the declared key set never grows.
    pub fn set(&mut self, channel: &Channel, value: f32) -> Result<()> {
        match self.values.iter_mut().find(|(c, _)| c == channel) {
            Some((_, v)) => {
                *v = value;
                Ok(())
            }
            None => Err(self.unknown_channel(channel)),
        }
    }

    /// Adds `delta` to a declared channel, a rotation when the channel is
    /// one of the three rotation kinds. Values are radians; no wrapping is
    /// applied.
    pub fn rotate(&mut self, channel: &Channel, delta: f32) -> Result<()> {
        self.add_to(channel, delta)
    }

    /// Adds a displacement to the three position channels.
    ///
    /// Fails with [`BvhError::UnknownChannel`] if the bone does not
    /// declare all three position channels.
    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) -> Result<()> {
        self.add_to(&Channel::Xposition, dx)?;
        self.add_to(&Channel::Yposition, dy)?;
        self.add_to(&Channel::Zposition, dz)
    }

    fn add_to(&mut self, channel: &Channel, delta: f32) -> Result<()> {
        let current = self.get(channel)?;
        self.set(channel, current + delta)
    }

    /// The local (bone-to-parent) transform matrix for this data.
    ///
    /// Rotation channels are composed in the bone's declared order by
    /// right-multiplication; position channels and everything unrecognized
    /// are skipped during composition. The translation column is the bone
    /// offset plus any position channel values. Rotation values are
    /// radians.
    pub fn relative_transform_matrix(&self, bone: &Bone) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        // bone.channels(), not self.values: the declared order is the
        // composition order even if the two ever disagree.
        for channel in bone.channels() {
            let Some(axis) = channel.rotation_axis() else {
                continue;
            };
            let theta = self.value_of(channel).unwrap_or(0.0);
            m *= match axis {
                Axis::X => Mat4::from_rotation_x(theta),
                Axis::Y => Mat4::from_rotation_y(theta),
                Axis::Z => Mat4::from_rotation_z(theta),
            };
        }
        let offset = bone.offset();
        m.w_axis = Vec4::new(
            offset.x + self.position_value(Axis::X),
            offset.y + self.position_value(Axis::Y),
            offset.z + self.position_value(Axis::Z),
            1.0,
        );
        m
    }

    /// Channel-wise sum with another data set for the same bone.
    ///
    /// A channel present on only one side counts as 0 on the other.
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.merge_with(other, |a, b| a + b)
    }

    /// Channel-wise difference with another data set for the same bone.
    ///
    /// A channel present on only one side counts as 0 on the other.
    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.merge_with(other, |a, b| a - b)
    }

    /// Channel-wise product with another data set for the same bone.
    ///
    /// Unlike addition, a missing channel has no sensible identity here,
    /// so both sides must declare identical channel sets.
    pub fn try_mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Channel-wise quotient with another data set for the same bone.
    ///
    /// Unlike subtraction, a missing channel has no sensible identity
    /// here, so both sides must declare identical channel sets.
    pub fn try_div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Adds a scalar to every channel value
    pub fn add_scalar(&self, scalar: f32) -> Self {
        self.map(|v| v + scalar)
    }

    /// Subtracts a scalar from every channel value
    pub fn sub_scalar(&self, scalar: f32) -> Self {
        self.map(|v| v - scalar)
    }

    /// Multiplies every channel value by a scalar
    pub fn mul_scalar(&self, scalar: f32) -> Self {
        self.map(|v| v * scalar)
    }

    /// Divides every channel value by a scalar
    pub fn div_scalar(&self, scalar: f32) -> Self {
        self.map(|v| v / scalar)
    }

    // +/-: combine by channel name over the union of both key sets, a
    // missing key counting as 0; channels keep this side's order, with
    // the other side's extras appended.
    fn merge_with(&self, other: &Self, op: impl Fn(f32, f32) -> f32) -> Result<Self> {
        self.check_same_bone(other)?;
        let mut values: Vec<(Channel, f32)> = self
            .values
            .iter()
            .map(|(c, v)| (c.clone(), op(*v, other.value_of(c).unwrap_or(0.0))))
            .collect();
        for (c, v) in &other.values {
            if self.value_of(c).is_none() {
                values.push((c.clone(), op(0.0, *v)));
            }
        }
        Ok(Self {
            bone: self.bone,
            values,
        })
    }

    // multiply/divide: asymmetric key sets are an error rather than an
    // implicit zero
    fn zip_with(&self, other: &Self, op: impl Fn(f32, f32) -> f32) -> Result<Self> {
        self.check_same_bone(other)?;
        if self.values.len() != other.values.len() {
            return Err(BvhError::StructuralMismatch(format!(
                "channel data for bone #{} has {} channels on one side, {} on the other",
                self.bone.0,
                self.values.len(),
                other.values.len()
            )));
        }
        let mut values = Vec::with_capacity(self.values.len());
        for ((ca, va), (cb, vb)) in self.values.iter().zip(&other.values) {
            if ca != cb {
                return Err(BvhError::StructuralMismatch(format!(
                    "channel data for bone #{} disagrees on channel order ('{ca}' vs '{cb}')",
                    self.bone.0
                )));
            }
            values.push((ca.clone(), op(*va, *vb)));
        }
        Ok(Self {
            bone: self.bone,
            values,
        })
    }

    fn map(&self, op: impl Fn(f32) -> f32) -> Self {
        Self {
            bone: self.bone,
            values: self.values.iter().map(|(c, v)| (c.clone(), op(*v))).collect(),
        }
    }

    fn check_same_bone(&self, other: &Self) -> Result<()> {
        if self.bone != other.bone {
            return Err(BvhError::StructuralMismatch(format!(
                "channel data describes different bones (#{} vs #{})",
                self.bone.0, other.bone.0
            )));
        }
        Ok(())
    }

    fn value_of(&self, channel: &Channel) -> Option<f32> {
        self.values
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, v)| *v)
    }

    fn position_value(&self, axis: Axis) -> f32 {
        self.values
            .iter()
            .find(|(c, _)| c.position_axis() == Some(axis))
            .map_or(0.0, |(_, v)| *v)
    }

    fn unknown_channel(&self, channel: &Channel) -> BvhError {
        BvhError::UnknownChannel {
            channel: channel.name().to_string(),
            bone_index: self.bone.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use crate::skeleton::Bone;

    fn six_channel_bone() -> Bone {
        Bone::new(
            "Hips",
            Vec3::ZERO,
            vec![
                Channel::Xposition,
                Channel::Yposition,
                Channel::Zposition,
                Channel::Zrotation,
                Channel::Xrotation,
                Channel::Yrotation,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_zeroed_follows_declared_order() {
        let bone = six_channel_bone();
        let data = ChannelData::zeroed(BoneId(0), &bone);
        let order: Vec<&Channel> = data.iter().map(|(c, _)| c).collect();
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], &Channel::Xposition);
        assert_eq!(order[3], &Channel::Zrotation);
    }

    #[test]
    fn test_unknown_channel_read_write() {
        let bone = Bone::new("Knee", Vec3::ZERO, vec![Channel::Xrotation]).unwrap();
        let mut data = ChannelData::zeroed(BoneId(2), &bone);
        assert!(matches!(
            data.get(&Channel::Yposition),
            Err(BvhError::UnknownChannel { .. })
        ));
        assert!(matches!(
            data.set(&Channel::Yposition, 1.0),
            Err(BvhError::UnknownChannel { .. })
        ));
        data.set(&Channel::Xrotation, 0.5).unwrap();
        assert_eq!(data.get(&Channel::Xrotation).unwrap(), 0.5);
    }

    #[test]
    fn test_zero_pose_matrix_is_identity() {
        let bone = six_channel_bone();
        let data = ChannelData::zeroed(BoneId(0), &bone);
        assert_eq!(data.relative_transform_matrix(&bone), Mat4::IDENTITY);
    }

    #[test]
    fn test_rotations_compose_in_declared_order() {
        let bone = six_channel_bone();
        let mut data = ChannelData::zeroed(BoneId(0), &bone);
        data.set(&Channel::Zrotation, 0.3).unwrap();
        data.set(&Channel::Xrotation, -0.7).unwrap();
        data.set(&Channel::Yrotation, 1.1).unwrap();

        // declared order is Z, X, Y
        let expected = Mat4::from_rotation_z(0.3)
            * Mat4::from_rotation_x(-0.7)
            * Mat4::from_rotation_y(1.1);
        let actual = data.relative_transform_matrix(&bone);
        assert!(actual.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_translation_folds_offset_and_position_channels() {
        let bone = Bone::new(
            "Hips",
            Vec3::new(1.0, 2.0, 3.0),
            vec![Channel::Xposition, Channel::Yposition, Channel::Zposition],
        )
        .unwrap();
        let mut data = ChannelData::zeroed(BoneId(0), &bone);
        data.set(&Channel::Xposition, 10.0).unwrap();
        data.set(&Channel::Zposition, -1.0).unwrap();

        let m = data.relative_transform_matrix(&bone);
        assert_eq!(m.w_axis, Vec4::new(11.0, 2.0, 2.0, 1.0));
    }

    #[test]
    fn test_offset_only_translation_without_position_channels() {
        let bone = Bone::new("Chest", Vec3::new(0.0, 5.5, 0.0), vec![Channel::Yrotation]).unwrap();
        let data = ChannelData::zeroed(BoneId(1), &bone);
        let m = data.relative_transform_matrix(&bone);
        assert_eq!(m.w_axis, Vec4::new(0.0, 5.5, 0.0, 1.0));
    }

    #[test]
    fn test_unrecognized_channels_skipped_by_matrix() {
        let bone = Bone::new(
            "Odd",
            Vec3::ZERO,
            vec![Channel::from_name("Wscale"), Channel::Xrotation],
        )
        .unwrap();
        let mut data = ChannelData::zeroed(BoneId(0), &bone);
        data.set(&Channel::from_name("Wscale"), 42.0).unwrap();
        data.set(&Channel::Xrotation, 0.25).unwrap();

        let m = data.relative_transform_matrix(&bone);
        assert!(m.abs_diff_eq(Mat4::from_rotation_x(0.25), 1e-6));
    }

    #[test]
    fn test_arithmetic_channel_wise() {
        let bone = Bone::new("Hips", Vec3::ZERO, vec![Channel::Xrotation, Channel::Yrotation])
            .unwrap();
        let mut a = ChannelData::zeroed(BoneId(0), &bone);
        let mut b = ChannelData::zeroed(BoneId(0), &bone);
        a.set(&Channel::Xrotation, 2.0).unwrap();
        a.set(&Channel::Yrotation, 6.0).unwrap();
        b.set(&Channel::Xrotation, 1.0).unwrap();
        b.set(&Channel::Yrotation, 3.0).unwrap();

        assert_eq!(a.try_add(&b).unwrap().get(&Channel::Xrotation).unwrap(), 3.0);
        assert_eq!(a.try_sub(&b).unwrap().get(&Channel::Yrotation).unwrap(), 3.0);
        assert_eq!(a.try_mul(&b).unwrap().get(&Channel::Yrotation).unwrap(), 18.0);
        assert_eq!(a.try_div(&b).unwrap().get(&Channel::Xrotation).unwrap(), 2.0);
    }

    #[test]
    fn test_add_and_sub_treat_missing_channels_as_zero() {
        let bone_a = Bone::new("A", Vec3::ZERO, vec![Channel::Xrotation]).unwrap();
        let bone_b = Bone::new("A", Vec3::ZERO, vec![Channel::Yrotation]).unwrap();
        let mut a = ChannelData::zeroed(BoneId(0), &bone_a);
        let mut b = ChannelData::zeroed(BoneId(0), &bone_b);
        a.set(&Channel::Xrotation, 2.0).unwrap();
        b.set(&Channel::Yrotation, 5.0).unwrap();

        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.get(&Channel::Xrotation).unwrap(), 2.0);
        assert_eq!(sum.get(&Channel::Yrotation).unwrap(), 5.0);

        let diff = a.try_sub(&b).unwrap();
        assert_eq!(diff.get(&Channel::Xrotation).unwrap(), 2.0);
        assert_eq!(diff.get(&Channel::Yrotation).unwrap(), -5.0);
    }

    #[test]
    fn test_arithmetic_rejects_mismatched_operands() {
        let bone_a = Bone::new("A", Vec3::ZERO, vec![Channel::Xrotation]).unwrap();
        let bone_b = Bone::new("B", Vec3::ZERO, vec![Channel::Yrotation]).unwrap();

        let a = ChannelData::zeroed(BoneId(0), &bone_a);
        let other_bone = ChannelData::zeroed(BoneId(1), &bone_a);
        assert!(matches!(
            a.try_add(&other_bone),
            Err(BvhError::StructuralMismatch(_))
        ));

        let different_keys = ChannelData::zeroed(BoneId(0), &bone_b);
        assert!(matches!(
            a.try_mul(&different_keys),
            Err(BvhError::StructuralMismatch(_))
        ));
    }

    #[test]
    fn test_scalar_broadcast() {
        let bone = Bone::new("Hips", Vec3::ZERO, vec![Channel::Xrotation, Channel::Yrotation])
            .unwrap();
        let mut data = ChannelData::zeroed(BoneId(0), &bone);
        data.set(&Channel::Xrotation, 4.0).unwrap();

        let scaled = data.mul_scalar(0.5);
        assert_eq!(scaled.get(&Channel::Xrotation).unwrap(), 2.0);
        assert_eq!(scaled.get(&Channel::Yrotation).unwrap(), 0.0);

        let shifted = data.add_scalar(1.0);
        assert_eq!(shifted.get(&Channel::Yrotation).unwrap(), 1.0);
        assert_eq!(data.sub_scalar(1.0).get(&Channel::Xrotation).unwrap(), 3.0);
        assert_eq!(data.div_scalar(2.0).get(&Channel::Xrotation).unwrap(), 2.0);
    }

    #[test]
    fn test_translate_requires_position_channels() {
        let bone = Bone::new("Knee", Vec3::ZERO, vec![Channel::Xrotation]).unwrap();
        let mut data = ChannelData::zeroed(BoneId(0), &bone);
        assert!(matches!(
            data.translate(1.0, 2.0, 3.0),
            Err(BvhError::UnknownChannel { .. })
        ));
    }
}
