//! Builds a small arm skeleton programmatically, animates it, and exports
//! it as `example_arm.bvh` in the current directory.

use anyhow::Result;
use glam::Vec3;
use mocap_bvh::{Bone, BvhFile, Channel, Frame, Motion, Skeleton};

fn main() -> Result<()> {
    env_logger::init();

    // shoulder -> elbow -> wrist -> tip, rotating joints only past the root
    let rotations = vec![Channel::Zrotation, Channel::Xrotation, Channel::Yrotation];
    let mut root_channels = vec![
        Channel::Xposition,
        Channel::Yposition,
        Channel::Zposition,
    ];
    root_channels.extend(rotations.clone());

    let mut skeleton = Skeleton::new(Bone::new("Shoulder", Vec3::ZERO, root_channels)?);
    let shoulder = skeleton.root();
    let elbow = skeleton.add_joint(
        shoulder,
        Bone::new("Elbow", Vec3::new(0.0, -3.2, 0.0), rotations.clone())?,
    )?;
    let wrist = skeleton.add_joint(
        elbow,
        Bone::new("Wrist", Vec3::new(0.0, -2.8, 0.0), rotations)?,
    )?;
    skeleton.add_joint(wrist, Bone::end_site(Vec3::new(0.0, -1.1, 0.0)))?;

    // a rest pose, then two seconds easing into a raised pose
    let mut motion = Motion::new();
    motion.set_frame_time(0.033333);
    motion.add_frame(Frame::for_skeleton(&skeleton));

    let mut raised = motion.create_frame()?;
    raised.rotate(shoulder, &Channel::Zrotation, -1.2)?;
    raised.rotate(elbow, &Channel::Zrotation, -0.6)?;
    raised.translate(shoulder, 0.0, 0.5, 0.0)?;
    let appended = motion.add_time(2.0, &raised)?;
    println!("appended {appended} interpolated frames");

    let file = BvhFile { skeleton, motion };
    let world = file
        .last_frame()
        .unwrap()
        .absolute_transform_matrix(&file.skeleton, wrist)?;
    println!("wrist world position: {}", world.w_axis.truncate());

    file.save("example_arm.bvh")?;
    println!(
        "wrote example_arm.bvh ({} bones, {} frames)",
        file.skeleton.bone_count(),
        file.frame_count()
    );
    Ok(())
}
