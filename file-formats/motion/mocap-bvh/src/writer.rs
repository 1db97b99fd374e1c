//! Writer producing canonical BVH text
//!
//! The column order of every motion line is the skeleton's pre-order
//! traversal with each bone's declared channel order — exactly the order
//! the parser distributes values in, so a written file reparses to an
//! identical model.

use std::io::Write;

use log::debug;

use crate::error::{BvhError, Result};
use crate::skeleton::{BoneId, Skeleton};
use crate::BvhFile;

/// Writes `file` as BVH text.
///
/// The model is re-validated first: a zero or negative frame time with
/// frames present, a nameless root, or a frame whose channel data count
/// does not match the skeleton would otherwise produce a corrupt file.
pub fn write<W: Write>(writer: &mut W, file: &BvhFile) -> Result<()> {
    validate(file)?;
    writeln!(writer, "HIERARCHY")?;
    write_root(writer, &file.skeleton)?;
    write_motion(writer, file)?;
    // files end with a blank line
    writeln!(writer)?;
    debug!(
        "wrote BVH: {} bones, {} frames",
        file.skeleton.bone_count(),
        file.motion.frame_count()
    );
    Ok(())
}

/// Renders `file` as BVH text in a string
pub fn write_to_string(file: &BvhFile) -> Result<String> {
    let mut buffer = Vec::new();
    write(&mut buffer, file)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn validate(file: &BvhFile) -> Result<()> {
    file.motion.validate()?;
    let root = file.skeleton.root();
    if file.skeleton.bone(root).is_none_or(|bone| bone.name().is_none()) {
        return Err(BvhError::StructuralMismatch(
            "the root bone must have a name to be exported".to_string(),
        ));
    }
    let bone_count = file.skeleton.bone_count();
    for (index, frame) in file.motion.frames().iter().enumerate() {
        if frame.channel_data().len() != bone_count {
            return Err(BvhError::StructuralMismatch(format!(
                "frame {} holds channel data for {} bones, skeleton has {}",
                index,
                frame.channel_data().len(),
                bone_count
            )));
        }
    }
    Ok(())
}

fn write_root<W: Write>(writer: &mut W, skeleton: &Skeleton) -> Result<()> {
    let root = skeleton.root();
    let name = skeleton
        .bone(root)
        .and_then(|bone| bone.name())
        .unwrap_or_default();
    writeln!(writer, "ROOT {name}")?;
    writeln!(writer, "{{")?;
    write_bone_data(writer, skeleton, root, 0)?;
    writeln!(writer, "}}")?;
    Ok(())
}

// JOINT node, or End Site for nameless leaf markers
fn write_joint<W: Write>(
    writer: &mut W,
    skeleton: &Skeleton,
    id: BoneId,
    level: usize,
) -> Result<()> {
    let bone = skeleton
        .bone(id)
        .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", id.index())))?;
    let tabs = "\t".repeat(level);
    match bone.name() {
        Some(name) => writeln!(writer, "{tabs}JOINT {name}")?,
        None => writeln!(writer, "{tabs}End Site")?,
    }
    writeln!(writer, "{tabs}{{")?;
    write_bone_data(writer, skeleton, id, level)?;
    writeln!(writer, "{tabs}}}")?;
    Ok(())
}

// offset, channels, and child blocks; level is the nesting depth of the
// enclosing block header
fn write_bone_data<W: Write>(
    writer: &mut W,
    skeleton: &Skeleton,
    id: BoneId,
    level: usize,
) -> Result<()> {
    let bone = skeleton
        .bone(id)
        .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", id.index())))?;
    let level = level + 1;
    let tabs = "\t".repeat(level);

    let offset = bone.offset();
    writeln!(
        writer,
        "{tabs}OFFSET\t {:.6}\t {:.6}\t {:.6}",
        offset.x, offset.y, offset.z
    )?;
    if !bone.channels().is_empty() {
        let names = bone
            .channels()
            .iter()
            .map(crate::channel::Channel::name)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{tabs}CHANNELS {} {names}", bone.channel_count())?;
    }
    for &child in bone.children() {
        write_joint(writer, skeleton, child, level)?;
    }
    Ok(())
}

fn write_motion<W: Write>(writer: &mut W, file: &BvhFile) -> Result<()> {
    writeln!(writer, "MOTION")?;
    writeln!(writer, "Frames: {}", file.motion.frame_count())?;
    writeln!(writer, "Frame Time: {}", file.motion.frame_time())?;

    let preorder = file.skeleton.preorder();
    for frame in file.motion.frames() {
        let mut line = String::new();
        for &id in &preorder {
            let bone = file
                .skeleton
                .bone(id)
                .ok_or_else(|| BvhError::StructuralMismatch(format!("no bone #{}", id.index())))?;
            let data = frame.channel_data_for(id)?;
            // bone.channels(), not the data's own order, to preserve the
            // declared column order
            for channel in bone.channels() {
                if !line.is_empty() {
                    line.push('\t');
                }
                line.push_str(&format!("{:.6}", data.get(channel)?));
            }
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
