//! Channel names: the animatable degrees of freedom of a bone

use std::fmt;

/// One animatable degree of freedom for a bone.
///
/// BVH files declare six channel kinds; their declaration order inside a
/// `CHANNELS` line is semantically significant and is preserved everywhere.
/// Names outside the six recognized kinds are accepted verbatim as
/// [`Channel::Other`] and round-trip through export unchanged, but they are
/// ignored by the transform-matrix computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Translation along the X axis
    Xposition,
    /// Translation along the Y axis
    Yposition,
    /// Translation along the Z axis
    Zposition,
    /// Rotation about the X axis, in radians
    Xrotation,
    /// Rotation about the Y axis, in radians
    Yrotation,
    /// Rotation about the Z axis, in radians
    Zrotation,
    /// An unrecognized channel name, preserved as written in the file
    Other(String),
}

/// A spatial axis, used to address offset components and rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// The X axis
    X,
    /// The Y axis
    Y,
    /// The Z axis
    Z,
}

impl Channel {
    /// Parses a channel name as it appears in a `CHANNELS` line.
    ///
    /// The six recognized names are matched case-insensitively and
    /// normalized to their canonical spelling; anything else is kept
    /// verbatim as [`Channel::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mocap_bvh::Channel;
    ///
    /// assert_eq!(Channel::from_name("XROTATION"), Channel::Xrotation);
    /// assert_eq!(Channel::from_name("Wscale"), Channel::Other("Wscale".to_string()));
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "xposition" => Self::Xposition,
            "yposition" => Self::Yposition,
            "zposition" => Self::Zposition,
            "xrotation" => Self::Xrotation,
            "yrotation" => Self::Yrotation,
            "zrotation" => Self::Zrotation,
            _ => Self::Other(name.to_string()),
        }
    }

    /// The canonical name of this channel as written to a BVH file
    pub fn name(&self) -> &str {
        match self {
            Self::Xposition => "Xposition",
            Self::Yposition => "Yposition",
            Self::Zposition => "Zposition",
            Self::Xrotation => "Xrotation",
            Self::Yrotation => "Yrotation",
            Self::Zrotation => "Zrotation",
            Self::Other(name) => name,
        }
    }

    /// Returns true if this channel is one of the three rotations
    pub fn is_rotation(&self) -> bool {
        self.rotation_axis().is_some()
    }

    /// Returns true if this channel is one of the three translations
    pub fn is_position(&self) -> bool {
        self.position_axis().is_some()
    }

    /// The rotation axis this channel drives, if it is a rotation channel
    pub fn rotation_axis(&self) -> Option<Axis> {
        match self {
            Self::Xrotation => Some(Axis::X),
            Self::Yrotation => Some(Axis::Y),
            Self::Zrotation => Some(Axis::Z),
            _ => None,
        }
    }

    /// The translation axis this channel drives, if it is a position channel
    pub fn position_axis(&self) -> Option<Axis> {
        match self {
            Self::Xposition => Some(Axis::X),
            Self::Yposition => Some(Axis::Y),
            Self::Zposition => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
