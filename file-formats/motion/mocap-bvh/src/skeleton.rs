//! The skeletal bone tree parsed from a `HIERARCHY` block

use glam::Vec3;

use crate::channel::Channel;
use crate::error::{BvhError, Result};

/// Handle to a bone inside a [`Skeleton`].
///
/// Bone identity is structural: two bones with the same name are still
/// distinct bones. Handles index into the skeleton's bone arena and are
/// only meaningful for the skeleton that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneId(pub(crate) usize);

impl BoneId {
    /// The position of this bone in the skeleton's arena.
    ///
    /// Bones created by the parser are stored in declaration order, which
    /// equals the pre-order traversal of the tree.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the skeletal tree: a joint or an end site.
///
/// A bone owns its static offset from its parent and the ordered list of
/// channels it animates. End sites carry no name and no channels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bone {
    name: Option<String>,
    offset: Vec3,
    channels: Vec<Channel>,
    parent: Option<BoneId>,
    children: Vec<BoneId>,
}

impl Bone {
    /// Creates a named joint with the given offset and channel order.
    ///
    /// Fails with [`BvhError::DuplicateChannel`] if the channel list
    /// repeats a name.
    pub fn new(name: impl Into<String>, offset: Vec3, channels: Vec<Channel>) -> Result<Self> {
        let name = name.into();
        ensure_no_duplicates(&channels, &name)?;
        Ok(Self {
            name: Some(name),
            offset,
            channels,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Creates an end site: a leaf marker with no name and no channels
    pub fn end_site(offset: Vec3) -> Self {
        Self {
            name: None,
            offset,
            channels: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// The bone's name, absent for end sites
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The static displacement of this bone from its parent
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Replaces the bone's offset
    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
    }

    /// The channels this bone animates, in declaration order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Replaces the bone's channel list, preserving the given order.
    ///
    /// Fails with [`BvhError::DuplicateChannel`] if the list repeats a
    /// name. Frames built against the old channel order are not updated.
    pub fn set_channels(&mut self, channels: Vec<Channel>) -> Result<()> {
        ensure_no_duplicates(&channels, self.display_name())?;
        self.channels = channels;
        Ok(())
    }

    /// Number of channels this bone animates
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The bone this one is attached to, absent for the root
    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    /// Child bones in declaration order
    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    /// True for end sites: leaf markers with no name and no channels
    pub fn is_end_site(&self) -> bool {
        self.name.is_none()
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("End Site")
    }
}

fn ensure_no_duplicates(channels: &[Channel], bone: &str) -> Result<()> {
    for (i, channel) in channels.iter().enumerate() {
        if channels[..i].contains(channel) {
            return Err(BvhError::DuplicateChannel {
                channel: channel.name().to_string(),
                bone: bone.to_string(),
            });
        }
    }
    Ok(())
}

/// A bone tree with a single root.
///
/// Bones live in an arena owned by the skeleton; parent and child links
/// are arena indices, so walking up to the root for forward kinematics is
/// O(depth) with no shared ownership.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    /// Creates a skeleton from its root bone
    pub fn new(root: Bone) -> Self {
        Self { bones: vec![root] }
    }

    /// Handle to the root bone
    pub fn root(&self) -> BoneId {
        BoneId(0)
    }

    /// Looks up a bone by handle
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0)
    }

    /// Looks up a bone by handle, mutably
    pub fn bone_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.bones.get_mut(id.0)
    }

    /// Number of bones in the tree, end sites included
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Iterates over all bones in arena order
    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter().enumerate().map(|(i, b)| (BoneId(i), b))
    }

    /// Attaches `bone` as the last child of `parent` and returns its handle.
    ///
    /// The parent link is set exactly once, here. Fails with
    /// [`BvhError::StructuralMismatch`] if the parent handle is unknown or
    /// refers to an end site.
    pub fn add_joint(&mut self, parent: BoneId, mut bone: Bone) -> Result<BoneId> {
        let parent_bone = self
            .bones
            .get(parent.0)
            .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", parent.0)))?;
        if parent_bone.is_end_site() {
            return Err(BvhError::StructuralMismatch(
                "an End Site cannot have child joints".to_string(),
            ));
        }
        let id = BoneId(self.bones.len());
        bone.parent = Some(parent);
        self.bones.push(bone);
        self.bones[parent.0].children.push(id);
        Ok(id)
    }

    /// Pre-order traversal of the tree, children in declaration order.
    ///
    /// This order defines the column layout of every motion data line and
    /// the order of a frame's channel data.
    pub fn preorder(&self) -> Vec<BoneId> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(bone) = self.bone(id) {
                stack.extend(bone.children().iter().rev().copied());
            }
        }
        order
    }

    /// Finds the first bone with the given name, in pre-order.
    ///
    /// Names are labels, not keys; duplicates resolve to the earliest
    /// declaration.
    ///
    /// # Examples
    ///
    /// ```
    /// use glam::Vec3;
    /// use mocap_bvh::{Bone, Skeleton};
    ///
    /// let mut skeleton = Skeleton::new(Bone::new("Hips", Vec3::ZERO, vec![]).unwrap());
    /// let root = skeleton.root();
    /// let chest = skeleton
    ///     .add_joint(root, Bone::new("Chest", Vec3::new(0.0, 5.0, 0.0), vec![]).unwrap())
    ///     .unwrap();
    /// assert_eq!(skeleton.find_by_name("Chest"), Some(chest));
    /// assert_eq!(skeleton.find_by_name("Toe"), None);
    /// ```
    pub fn find_by_name(&self, name: &str) -> Option<BoneId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.bone(id).and_then(Bone::name) == Some(name))
    }

    /// Total channel count over all bones: the width of one motion line
    pub fn total_channel_count(&self) -> usize {
        self.bones.iter().map(Bone::channel_count).sum()
    }

    /// The length of a bone, inferred from the offset of its first child.
    ///
    /// Returns 0.0 for leaves and unknown handles.
    pub fn bone_length(&self, id: BoneId) -> f32 {
        self.first_child_offset(id).map_or(0.0, Vec3::length)
    }

    /// Unit vector along the bone, inferred from the offset of its first
    /// child. Returns `Vec3::ZERO` for leaves, unknown handles, and
    /// zero-length offsets.
    pub fn bone_orientation(&self, id: BoneId) -> Vec3 {
        self.first_child_offset(id)
            .map_or(Vec3::ZERO, Vec3::normalize_or_zero)
    }

    fn first_child_offset(&self, id: BoneId) -> Option<Vec3> {
        let bone = self.bone(id)?;
        let first = *bone.children().first()?;
        self.bone(first).map(Bone::offset)
    }
}
