//! The frame sequence and its timing

use crate::error::{BvhError, Result};
use crate::frame::Frame;

/// The motion capture data of a BVH file: an ordered frame sequence plus
/// the time each frame occupies.
///
/// The frame count is always derived from the sequence length; it is never
/// stored separately, so it cannot drift.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motion {
    frames: Vec<Frame>,
    frame_time: f32,
}

impl Motion {
    /// Creates an empty motion with an unset (zero) frame time
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds per frame. Most BVH files use 0.033333, i.e. 30 fps:
    /// `frame_time = 1 / frames_per_second`.
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    /// Sets the seconds-per-frame value
    pub fn set_frame_time(&mut self, frame_time: f32) {
        self.frame_time = frame_time;
    }

    /// Frames per second, the reciprocal of [`Motion::frame_time`]
    pub fn fps(&self) -> f32 {
        1.0 / self.frame_time
    }

    /// The frames of this animation, in playback order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Mutable access to the frame sequence
    pub fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    /// Number of frames, derived from the sequence length
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The last frame of the animation, if any
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Appends a frame to the end of the animation
    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Removes and returns the frame at `index`, if it exists
    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        (index < self.frames.len()).then(|| self.frames.remove(index))
    }

    /// A copy of the last frame, ready to be edited and appended.
    ///
    /// Fails with [`BvhError::EmptyMotion`] when there are no frames.
    pub fn create_frame(&self) -> Result<Frame> {
        self.frames.last().cloned().ok_or(BvhError::EmptyMotion)
    }

    /// Appends `floor(seconds / frame_time)` interpolated frames ending in
    /// an exact copy of `target_frame`.
    ///
    /// The change per appended frame is
    /// `(last_frame - target_frame) / num_frames`, accumulated from the
    /// current last frame; the final appended frame is a clone of
    /// `target_frame` itself, so the animation lands on the target with no
    /// accumulated floating error. Appending nothing (when `seconds` is
    /// below one frame time) leaves the motion unchanged.
    ///
    /// Returns the number of frames appended. Fails with
    /// [`BvhError::InvalidFrameTime`] when the frame time is not strictly
    /// positive and with [`BvhError::EmptyMotion`] when there is no frame
    /// to interpolate from.
    pub fn add_time(&mut self, seconds: f32, target_frame: &Frame) -> Result<usize> {
        let num_frames = self.frames_in(seconds)?;
        if num_frames == 0 {
            return Ok(0);
        }
        let last = self.frames.last().ok_or(BvhError::EmptyMotion)?;
        let step = last.try_sub(target_frame)?.div_scalar(num_frames as f32);

        let mut running = last.clone();
        for _ in 0..num_frames - 1 {
            running = running.try_add(&step)?;
            self.frames.push(running.clone());
        }
        self.frames.push(target_frame.clone());
        Ok(num_frames)
    }

    /// Removes the trailing `floor(seconds / frame_time)` frames,
    /// stopping at an empty sequence.
    ///
    /// Returns the number of frames removed. Fails with
    /// [`BvhError::InvalidFrameTime`] when the frame time is not strictly
    /// positive.
    pub fn truncate_time(&mut self, seconds: f32) -> Result<usize> {
        let num_frames = self.frames_in(seconds)?;
        let keep = self.frames.len().saturating_sub(num_frames);
        let removed = self.frames.len() - keep;
        self.frames.truncate(keep);
        Ok(removed)
    }

    /// Checks the frame-time/frame-count consistency rule: once any frame
    /// exists the frame time must be strictly positive. Run on import and
    /// again before export.
    pub fn validate(&self) -> Result<()> {
        if !self.frames.is_empty() && self.frame_time <= 0.0 {
            return Err(BvhError::InvalidFrameTime(self.frame_time));
        }
        Ok(())
    }

    fn frames_in(&self, seconds: f32) -> Result<usize> {
        if self.frame_time <= 0.0 {
            return Err(BvhError::InvalidFrameTime(self.frame_time));
        }
        Ok((seconds / self.frame_time).floor() as usize)
    }
}
