//! Loads a BVH file, stretches its animation by a few seconds toward a
//! rotated target pose, and saves the result.
//!
//! Run the `create_and_export` example first to generate an input file,
//! or pass a path to your own capture.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use mocap_bvh::{BvhFile, Channel};

fn main() -> Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("example_arm.bvh"), PathBuf::from);
    if !path.exists() {
        println!("{} not found.", path.display());
        println!("Run the create_and_export example first, or pass a BVH file path.");
        return Ok(());
    }

    let mut file = BvhFile::load(&path)?;
    println!(
        "loaded {}: {} bones, {} frames at {} fps",
        path.display(),
        file.skeleton.bone_count(),
        file.frame_count(),
        file.motion.fps()
    );

    // swing the root a quarter turn over three seconds
    let root = file.root();
    let mut target = file.motion.create_frame()?;
    target.rotate(root, &Channel::Yrotation, std::f32::consts::FRAC_PI_2)?;
    let appended = file.motion.add_time(3.0, &target)?;
    println!("appended {appended} frames");

    let output = path.with_extension("stretched.bvh");
    file.save(&output)?;
    println!("wrote {} ({} frames)", output.display(), file.frame_count());
    Ok(())
}
