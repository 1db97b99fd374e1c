//! Line-oriented parser for the BVH text format
//!
//! The grammar is parsed by an explicit state machine over trimmed lines;
//! block nesting is tracked with a stack of open bone blocks. All errors
//! carry the 1-based line number they were detected on.

use std::io::BufRead;

use glam::Vec3;
use log::debug;

use crate::channel::Channel;
use crate::channel_data::ChannelData;
use crate::error::{BvhError, Result};
use crate::frame::Frame;
use crate::motion::Motion;
use crate::skeleton::{Bone, BoneId, Skeleton};
use crate::BvhFile;

/// Parser for BVH (Biovision Hierarchy) motion capture files
///
/// # Examples
///
/// ```
/// use mocap_bvh::BvhParser;
///
/// let text = "HIERARCHY\nROOT Hips\n{\n\tOFFSET\t 0.0\t 0.0\t 0.0\n\
///             \tCHANNELS 3 Zrotation Xrotation Yrotation\n\tEnd Site\n{\n\
///             \tOFFSET\t 0.0\t -7.0\t 0.0\n}\n}\nMOTION\nFrames: 1\n\
///             Frame Time: 0.033333\n0.1 0.2 0.3\n";
/// let parser = BvhParser::new();
/// let file = parser.parse_str(text).unwrap();
/// assert_eq!(file.skeleton.bone_count(), 2);
/// assert_eq!(file.motion.frame_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct BvhParser;

impl BvhParser {
    /// Creates a new BVH parser
    pub fn new() -> Self {
        Self
    }

    /// Parses a BVH file from a reader
    pub fn parse<R: BufRead>(&self, reader: &mut R) -> Result<BvhFile> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse_str(&text)
    }

    /// Parses a BVH file from its source text
    pub fn parse_str(&self, text: &str) -> Result<BvhFile> {
        let mut machine = Machine::new();
        let mut line_count = 0;
        for (index, raw) in text.lines().enumerate() {
            line_count = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            machine.step(line_count, line)?;
        }
        let file = machine.finish(line_count)?;
        debug!(
            "parsed BVH: {} bones, {} frames, frame time {}",
            file.skeleton.bone_count(),
            file.motion.frame_count(),
            file.motion.frame_time()
        );
        Ok(file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    ExpectHierarchy,
    ExpectRoot,
    InBoneBlock,
    ExpectMotion,
    ExpectFrames,
    ExpectFrameTime,
    MotionData,
}

struct OpenBlock {
    bone: BoneId,
    is_end_site: bool,
    brace_pending: bool,
    has_offset: bool,
    has_channels: bool,
    has_joint_child: bool,
    has_end_site_child: bool,
}

impl OpenBlock {
    fn new(bone: BoneId, is_end_site: bool) -> Self {
        Self {
            bone,
            is_end_site,
            brace_pending: true,
            has_offset: false,
            has_channels: false,
            has_joint_child: false,
            has_end_site_child: false,
        }
    }
}

struct Machine {
    state: State,
    skeleton: Option<Skeleton>,
    stack: Vec<OpenBlock>,
    preorder: Vec<BoneId>,
    declared_frames: usize,
    frame_time: f32,
    frames: Vec<Frame>,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: State::ExpectHierarchy,
            skeleton: None,
            stack: Vec::new(),
            preorder: Vec::new(),
            declared_frames: 0,
            frame_time: 0.0,
            frames: Vec::new(),
        }
    }

    fn step(&mut self, line_no: usize, line: &str) -> Result<()> {
        match self.state {
            State::ExpectHierarchy => self.expect_keyword(line_no, line, "HIERARCHY", State::ExpectRoot),
            State::ExpectRoot => self.root_header(line_no, line),
            State::InBoneBlock => self.bone_block_line(line_no, line),
            State::ExpectMotion => self.expect_keyword(line_no, line, "MOTION", State::ExpectFrames),
            State::ExpectFrames => self.frames_header(line_no, line),
            State::ExpectFrameTime => self.frame_time_header(line_no, line),
            State::MotionData => self.data_line(line_no, line),
        }
    }

    fn expect_keyword(&mut self, line_no: usize, line: &str, keyword: &str, next: State) -> Result<()> {
        if line.eq_ignore_ascii_case(keyword) {
            self.state = next;
            Ok(())
        } else {
            Err(grammar(line_no, format!("expected '{keyword}', found '{line}'")))
        }
    }

    fn root_header(&mut self, line_no: usize, line: &str) -> Result<()> {
        let (keyword, rest) = split_keyword(line);
        if !keyword.eq_ignore_ascii_case("ROOT") {
            return Err(grammar(line_no, format!("expected 'ROOT', found '{line}'")));
        }
        let name = block_name(line_no, "ROOT", rest)?;
        let root = Bone::new(name, Vec3::ZERO, Vec::new())?;
        let skeleton = Skeleton::new(root);
        let id = skeleton.root();
        self.skeleton = Some(skeleton);
        self.stack.push(OpenBlock::new(id, false));
        self.state = State::InBoneBlock;
        Ok(())
    }

    fn bone_block_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        if self.current_block(line_no)?.brace_pending {
            return if line == "{" {
                self.current_block(line_no)?.brace_pending = false;
                Ok(())
            } else {
                Err(grammar(line_no, format!("expected '{{', found '{line}'")))
            };
        }

        if line == "}" {
            return self.close_block(line_no);
        }

        let (keyword, rest) = split_keyword(line);
        match keyword.to_ascii_lowercase().as_str() {
            "offset" => self.offset_line(line_no, rest),
            "channels" => self.channels_line(line_no, rest),
            "joint" => self.joint_header(line_no, rest),
            "end" if rest.eq_ignore_ascii_case("Site") => self.end_site_header(line_no),
            _ => Err(grammar(line_no, format!("'{line}' is unexpected at this time"))),
        }
    }

    fn offset_line(&mut self, line_no: usize, rest: &str) -> Result<()> {
        let block = self.current_block(line_no)?;
        if block.has_offset {
            return Err(grammar(line_no, "this block already has OFFSET data".to_string()));
        }
        block.has_offset = true;
        let bone = block.bone;

        let values = rest.split_whitespace().collect::<Vec<_>>();
        if values.len() != 3 {
            return Err(grammar(
                line_no,
                format!("OFFSET expects exactly 3 values, found {}", values.len()),
            ));
        }
        let x = parse_float(line_no, values[0])?;
        let y = parse_float(line_no, values[1])?;
        let z = parse_float(line_no, values[2])?;
        self.bone_mut(line_no, bone)?.set_offset(Vec3::new(x, y, z));
        Ok(())
    }

    fn channels_line(&mut self, line_no: usize, rest: &str) -> Result<()> {
        let block = self.current_block(line_no)?;
        if block.is_end_site {
            return Err(grammar(line_no, "an End Site cannot declare CHANNELS".to_string()));
        }
        if block.has_channels {
            return Err(grammar(line_no, "this block already has CHANNELS data".to_string()));
        }
        block.has_channels = true;
        let bone = block.bone;

        let mut tokens = rest.split_whitespace();
        let count = tokens
            .next()
            .ok_or_else(|| grammar(line_no, "CHANNELS expects a count".to_string()))?;
        let expected: usize = count.parse().map_err(|_| {
            grammar(
                line_no,
                format!("expected a non-negative channel count, found '{count}'"),
            )
        })?;
        let names = tokens.collect::<Vec<_>>();
        if names.len() != expected {
            return Err(BvhError::ChannelCountMismatch {
                line: line_no,
                expected,
                found: names.len(),
            });
        }
        let channels = names.iter().map(|n| Channel::from_name(n)).collect();
        self.bone_mut(line_no, bone)?
            .set_channels(channels)
            .map_err(|err| match err {
                BvhError::DuplicateChannel { channel, .. } => grammar(
                    line_no,
                    format!("duplicate channel '{channel}' in CHANNELS list"),
                ),
                other => other,
            })
    }

    fn joint_header(&mut self, line_no: usize, rest: &str) -> Result<()> {
        let block = self.current_block(line_no)?;
        if block.is_end_site {
            return Err(grammar(line_no, "JOINT is not allowed inside an End Site".to_string()));
        }
        if block.has_end_site_child {
            return Err(grammar(
                line_no,
                "a bone with an End Site cannot also have JOINT children".to_string(),
            ));
        }
        block.has_joint_child = true;
        let parent = block.bone;

        let name = block_name(line_no, "JOINT", rest)?;
        let bone = Bone::new(name, Vec3::ZERO, Vec::new())?;
        let id = self.skeleton_mut(line_no)?.add_joint(parent, bone)?;
        self.stack.push(OpenBlock::new(id, false));
        Ok(())
    }

    fn end_site_header(&mut self, line_no: usize) -> Result<()> {
        let block = self.current_block(line_no)?;
        if block.is_end_site {
            return Err(grammar(line_no, "an End Site cannot nest another End Site".to_string()));
        }
        if block.has_end_site_child {
            return Err(grammar(line_no, "this bone already has an End Site".to_string()));
        }
        if block.has_joint_child {
            return Err(grammar(
                line_no,
                "a bone with JOINT children cannot also have an End Site".to_string(),
            ));
        }
        block.has_end_site_child = true;
        let parent = block.bone;

        let id = self
            .skeleton_mut(line_no)?
            .add_joint(parent, Bone::end_site(Vec3::ZERO))?;
        self.stack.push(OpenBlock::new(id, true));
        Ok(())
    }

    fn close_block(&mut self, line_no: usize) -> Result<()> {
        let block = self
            .stack
            .pop()
            .ok_or_else(|| grammar(line_no, "unexpected '}'".to_string()))?;
        if !block.has_offset {
            return Err(grammar(line_no, "block closed without an OFFSET".to_string()));
        }
        if self.stack.is_empty() {
            // hierarchy complete; freeze the traversal order used to
            // distribute motion data
            self.preorder = self.skeleton_mut(line_no)?.preorder();
            self.state = State::ExpectMotion;
        }
        Ok(())
    }

    fn frames_header(&mut self, line_no: usize, line: &str) -> Result<()> {
        let (keyword, rest) = split_keyword(line);
        if !keyword.eq_ignore_ascii_case("Frames:") {
            return Err(grammar(line_no, format!("expected 'Frames:', found '{line}'")));
        }
        self.declared_frames = rest.parse().map_err(|_| {
            grammar(
                line_no,
                format!("expected one non-negative integer frame count, found '{rest}'"),
            )
        })?;
        self.state = State::ExpectFrameTime;
        Ok(())
    }

    fn frame_time_header(&mut self, line_no: usize, line: &str) -> Result<()> {
        let (first, rest) = split_keyword(line);
        let (second, value) = split_keyword(rest);
        if !first.eq_ignore_ascii_case("Frame") || !second.eq_ignore_ascii_case("Time:") {
            return Err(grammar(line_no, format!("expected 'Frame Time:', found '{line}'")));
        }
        self.frame_time = parse_float(line_no, value)?;
        self.state = State::MotionData;
        Ok(())
    }

    fn data_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let values = line
            .split_whitespace()
            .map(|token| parse_float(line_no, token))
            .collect::<Result<Vec<f32>>>()?;

        let skeleton = self
            .skeleton
            .as_ref()
            .ok_or_else(|| grammar(line_no, "motion data without a skeleton".to_string()))?;
        let expected = skeleton.total_channel_count();
        if values.len() != expected {
            return Err(BvhError::ChannelCountMismatch {
                line: line_no,
                expected,
                found: values.len(),
            });
        }

        // distribute greedily, bone by bone, in pre-order
        let mut channel_data = Vec::with_capacity(self.preorder.len());
        let mut cursor = 0;
        for &id in &self.preorder {
            let bone = skeleton
                .bone(id)
                .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", id.index())))?;
            let count = bone.channel_count();
            let slice = &values[cursor..cursor + count];
            cursor += count;
            channel_data.push(ChannelData::from_values(
                id,
                bone.channels().iter().cloned().zip(slice.iter().copied()).collect(),
            ));
        }
        self.frames.push(Frame::from_channel_data(channel_data));
        Ok(())
    }

    fn finish(self, line_count: usize) -> Result<BvhFile> {
        let (skeleton, frames) = match self.state {
            State::MotionData => (
                self.skeleton.ok_or_else(|| {
                    grammar(line_count, "motion data without a skeleton".to_string())
                })?,
                self.frames,
            ),
            other => {
                let expectation = match other {
                    State::ExpectHierarchy => "expected 'HIERARCHY'",
                    State::ExpectRoot => "expected 'ROOT'",
                    State::InBoneBlock => "unclosed bone block",
                    State::ExpectMotion => "expected 'MOTION'",
                    State::ExpectFrames => "expected 'Frames:'",
                    State::ExpectFrameTime | State::MotionData => "expected 'Frame Time:'",
                };
                return Err(grammar(
                    line_count,
                    format!("unexpected end of input: {expectation}"),
                ));
            }
        };

        if frames.len() != self.declared_frames {
            return Err(BvhError::FrameCountMismatch {
                expected: self.declared_frames,
                found: frames.len(),
            });
        }

        let mut motion = Motion::new();
        motion.set_frame_time(self.frame_time);
        for frame in frames {
            motion.add_frame(frame);
        }
        motion.validate()?;

        Ok(BvhFile { skeleton, motion })
    }

    fn current_block(&mut self, line_no: usize) -> Result<&mut OpenBlock> {
        self.stack
            .last_mut()
            .ok_or_else(|| grammar(line_no, "no open bone block".to_string()))
    }

    fn skeleton_mut(&mut self, line_no: usize) -> Result<&mut Skeleton> {
        self.skeleton
            .as_mut()
            .ok_or_else(|| grammar(line_no, "no skeleton declared".to_string()))
    }

    fn bone_mut(&mut self, line_no: usize, id: BoneId) -> Result<&mut Bone> {
        self.skeleton_mut(line_no)?
            .bone_mut(id)
            .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", id.index())))
    }
}

fn grammar(line: usize, message: String) -> BvhError {
    BvhError::Grammar { line, message }
}

fn split_keyword(line: &str) -> (&str, &str) {
    let mut parts = line.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    (keyword, parts.next().unwrap_or("").trim())
}

fn block_name<'a>(line_no: usize, keyword: &str, rest: &'a str) -> Result<&'a str> {
    if rest.is_empty() {
        return Err(grammar(line_no, format!("{keyword} requires a name")));
    }
    if rest.contains('{') {
        return Err(grammar(
            line_no,
            format!("expected '{{' on the line after {keyword}"),
        ));
    }
    Ok(rest)
}

fn parse_float(line_no: usize, token: &str) -> Result<f32> {
    token.parse().map_err(|_| {
        grammar(
            line_no,
            format!("expected a numeric value, found '{token}'"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASIC: &str = "HIERARCHY
ROOT Hips
{
\tOFFSET\t 0.000000\t 0.000000\t 0.000000
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Chest
\t{
\t\tOFFSET\t 0.000000\t 5.210000\t 0.000000
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET\t 0.000000\t 7.000000\t 0.000000
\t\t}
\t}
}
MOTION
Frames: 2
Frame Time: 0.033333
0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0
1.0 2.0 3.0 0.1 0.2 0.3 0.4 0.5 0.6
";

    #[test]
    fn test_parse_basic_file() {
        let file = BvhParser::new().parse_str(BASIC).unwrap();

        assert_eq!(file.skeleton.bone_count(), 3);
        let root = file.skeleton.root();
        let root_bone = file.skeleton.bone(root).unwrap();
        assert_eq!(root_bone.name(), Some("Hips"));
        assert_eq!(root_bone.channel_count(), 6);

        let chest = file.skeleton.find_by_name("Chest").unwrap();
        let chest_bone = file.skeleton.bone(chest).unwrap();
        assert_eq!(chest_bone.offset(), Vec3::new(0.0, 5.21, 0.0));
        assert_eq!(chest_bone.channels()[0], Channel::Zrotation);

        let tip = chest_bone.children()[0];
        assert!(file.skeleton.bone(tip).unwrap().is_end_site());

        assert_eq!(file.motion.frame_count(), 2);
        assert!((file.motion.frame_time() - 0.033333).abs() < 1e-6);

        let second = &file.motion.frames()[1];
        assert_eq!(second.get_channel(root, &Channel::Zposition).unwrap(), 3.0);
        assert_eq!(second.get_channel(chest, &Channel::Yrotation).unwrap(), 0.6);
    }

    #[test]
    fn test_frames_distributed_in_preorder() {
        let file = BvhParser::new().parse_str(BASIC).unwrap();
        for frame in file.motion.frames() {
            let order: Vec<BoneId> = frame.channel_data().iter().map(|d| d.bone()).collect();
            assert_eq!(order, file.skeleton.preorder());
        }
        // the end site still holds an (empty) slot
        assert!(file.motion.frames()[0].channel_data()[2].is_empty());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let text = BASIC
            .replace("HIERARCHY", "hierarchy")
            .replace("ROOT", "root")
            .replace("JOINT", "joint")
            .replace("End Site", "END SITE")
            .replace("MOTION", "motion")
            .replace("Frames:", "FRAMES:")
            .replace("Frame Time:", "FRAME TIME:");
        let file = BvhParser::new().parse_str(&text).unwrap();
        assert_eq!(file.skeleton.bone_count(), 3);
        assert_eq!(file.motion.frame_count(), 2);
    }

    #[test]
    fn test_missing_hierarchy_keyword() {
        let err = BvhParser::new().parse_str("ROOT Hips\n{\n}\n").unwrap_err();
        assert!(matches!(err, BvhError::Grammar { line: 1, .. }));
    }

    #[test]
    fn test_channel_count_mismatch_in_declaration() {
        let text = BASIC.replace(
            "CHANNELS 3 Zrotation Xrotation Yrotation",
            "CHANNELS 4 Zrotation Xrotation Yrotation",
        );
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(
            err,
            BvhError::ChannelCountMismatch {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_short_data_line() {
        let text = BASIC.replace(
            "1.0 2.0 3.0 0.1 0.2 0.3 0.4 0.5 0.6",
            "1.0 2.0 3.0 0.1 0.2",
        );
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(
            err,
            BvhError::ChannelCountMismatch {
                expected: 9,
                found: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_declared_frames_must_match_data_lines() {
        let text = BASIC.replace("Frames: 2", "Frames: 3");
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(
            err,
            BvhError::FrameCountMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_zero_frame_time_with_frames_is_invalid() {
        let text = BASIC.replace("Frame Time: 0.033333", "Frame Time: 0");
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::InvalidFrameTime(t) if t == 0.0));
    }

    #[test]
    fn test_zero_frame_time_without_frames_is_tolerated() {
        let text = "HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 3 Zrotation Xrotation Yrotation
\tEnd Site
\t{
\t\tOFFSET 0.0 -7.0 0.0
\t}
}
MOTION
Frames: 0
Frame Time: 0
";
        let file = BvhParser::new().parse_str(text).unwrap();
        assert_eq!(file.motion.frame_count(), 0);
    }

    #[test]
    fn test_negative_frame_count_rejected() {
        let text = BASIC.replace("Frames: 2", "Frames: -2");
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { line: 17, .. }));
    }

    #[test]
    fn test_duplicate_offset_rejected() {
        let text = BASIC.replace(
            "\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation",
            "\tOFFSET 1.0 1.0 1.0\n\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation",
        );
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { .. }));
    }

    #[test]
    fn test_missing_offset_rejected() {
        let text = BASIC.replace("\t\t\tOFFSET\t 0.000000\t 7.000000\t 0.000000\n", "");
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { .. }));
    }

    #[test]
    fn test_end_site_cannot_declare_channels() {
        let text = BASIC.replace(
            "\t\t\tOFFSET\t 0.000000\t 7.000000\t 0.000000",
            "\t\t\tOFFSET\t 0.000000\t 7.000000\t 0.000000\n\t\t\tCHANNELS 1 Xrotation",
        );
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { .. }));
    }

    #[test]
    fn test_non_numeric_motion_value_rejected() {
        let text = BASIC.replace(
            "1.0 2.0 3.0 0.1 0.2 0.3 0.4 0.5 0.6",
            "1.0 2.0 3.0 0.1 0.2 0.3 0.4 0.5 oops",
        );
        let err = BvhParser::new().parse_str(&text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { line: 20, .. }));
    }

    #[test]
    fn test_truncated_input() {
        let text = "HIERARCHY\nROOT Hips\n{\n\tOFFSET 0.0 0.0 0.0\n";
        let err = BvhParser::new().parse_str(text).unwrap_err();
        assert!(matches!(err, BvhError::Grammar { .. }));
    }

    #[test]
    fn test_unknown_channel_names_accepted_verbatim() {
        let text = BASIC.replace(
            "CHANNELS 3 Zrotation Xrotation Yrotation",
            "CHANNELS 3 Zrotation Xrotation Wscale",
        );
        let file = BvhParser::new().parse_str(&text).unwrap();
        let chest = file.skeleton.find_by_name("Chest").unwrap();
        let channels = file.skeleton.bone(chest).unwrap().channels().to_vec();
        assert_eq!(channels[2], Channel::Other("Wscale".to_string()));
    }
}
