//! Parser, editor, and writer for BVH (Biovision Hierarchy) motion capture
//! files.
//!
//! A BVH file pairs a `HIERARCHY` block — a tree of named joints with
//! static offsets and per-joint channel lists — with a `MOTION` block of
//! per-frame channel values. This crate parses that text into a
//! [`Skeleton`] plus a [`Motion`], lets you query and edit channel values
//! frame by frame, computes local and world forward-kinematics transform
//! matrices for any bone in any frame, stretches or trims the animation in
//! time, and writes the model back out as canonical BVH text.
//!
//! Rotation channel values are treated as radians throughout.
//!
//! # Examples
//!
//! ```
//! use mocap_bvh::{BvhFile, Channel};
//!
//! let text = "HIERARCHY\nROOT Hips\n{\n\tOFFSET\t 0.0\t 0.0\t 0.0\n\
//!             \tCHANNELS 3 Zrotation Xrotation Yrotation\n\tEnd Site\n{\n\
//!             \tOFFSET\t 0.0\t -7.0\t 0.0\n}\n}\nMOTION\nFrames: 1\n\
//!             Frame Time: 0.033333\n0.0 0.0 0.0\n";
//! let mut file = BvhFile::parse_str(text).unwrap();
//!
//! let hips = file.skeleton.find_by_name("Hips").unwrap();
//! assert_eq!(file.skeleton.bone_length(hips), 7.0);
//!
//! // rotate the hips by half a radian in the first frame
//! file.motion.frames_mut()[0]
//!     .rotate(hips, &Channel::Yrotation, 0.5)
//!     .unwrap();
//! let world = file.motion.frames()[0]
//!     .absolute_transform_matrix(&file.skeleton, hips)
//!     .unwrap();
//! assert!(world.abs_diff_eq(glam::Mat4::from_rotation_y(0.5), 1e-6));
//!
//! // and back to text
//! let exported = file.to_bvh_string().unwrap();
//! assert!(exported.starts_with("HIERARCHY"));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod channel_data;
pub mod error;
pub mod frame;
pub mod motion;
pub mod parser;
pub mod skeleton;
pub mod writer;

pub use channel::{Axis, Channel};
pub use channel_data::ChannelData;
pub use error::{BvhError, Result};
pub use frame::Frame;
pub use motion::Motion;
pub use parser::BvhParser;
pub use skeleton::{Bone, BoneId, Skeleton};

use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use log::debug;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A parsed BVH file: one skeleton plus its motion capture data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvhFile {
    /// The bone tree from the `HIERARCHY` block
    pub skeleton: Skeleton,
    /// The frame data from the `MOTION` block
    pub motion: Motion,
}

impl BvhFile {
    /// Parses a BVH file from its source text
    pub fn parse_str(text: &str) -> Result<Self> {
        BvhParser::new().parse_str(text)
    }

    /// Parses a BVH file from a reader
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self> {
        BvhParser::new().parse(reader)
    }

    /// Reads and parses the BVH file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading BVH file from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    /// Writes this file as BVH text to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("saving BVH file to {}", path.display());
        let file = fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes this file as BVH text
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer::write(writer, self)
    }

    /// Renders this file as BVH text in a string
    pub fn to_bvh_string(&self) -> Result<String> {
        writer::write_to_string(self)
    }

    /// Handle to the skeleton's root bone
    pub fn root(&self) -> BoneId {
        self.skeleton.root()
    }

    /// The frames of the animation, in playback order
    pub fn frames(&self) -> &[Frame] {
        self.motion.frames()
    }

    /// The last frame of the animation, if any
    pub fn last_frame(&self) -> Option<&Frame> {
        self.motion.last_frame()
    }

    /// Seconds per frame
    pub fn frame_time(&self) -> f32 {
        self.motion.frame_time()
    }

    /// Sets the seconds-per-frame value
    pub fn set_frame_time(&mut self, frame_time: f32) {
        self.motion.set_frame_time(frame_time);
    }

    /// Number of frames in the animation
    pub fn frame_count(&self) -> usize {
        self.motion.frame_count()
    }
}
