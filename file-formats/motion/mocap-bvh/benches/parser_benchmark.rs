//! Benchmarks for the BVH parser and writer

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use glam::Vec3;
use mocap_bvh::{Bone, BvhFile, BvhParser, Channel, Frame, Motion, Skeleton};

/// Builds a chain skeleton with `joints` bones and `frames` frames of
/// slowly drifting data.
fn create_test_file(joints: usize, frames: usize) -> BvhFile {
    let rotations = || {
        vec![
            Channel::Zrotation,
            Channel::Xrotation,
            Channel::Yrotation,
        ]
    };
    let mut channels = vec![
        Channel::Xposition,
        Channel::Yposition,
        Channel::Zposition,
    ];
    channels.extend(rotations());

    let mut skeleton = Skeleton::new(Bone::new("Joint0", Vec3::ZERO, channels).unwrap());
    let mut parent = skeleton.root();
    for i in 1..joints {
        let bone = Bone::new(
            format!("Joint{i}"),
            Vec3::new(0.0, 2.5, 0.0),
            rotations(),
        )
        .unwrap();
        parent = skeleton.add_joint(parent, bone).unwrap();
    }
    skeleton
        .add_joint(parent, Bone::end_site(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();

    let mut motion = Motion::new();
    motion.set_frame_time(0.033333);
    let mut frame = Frame::for_skeleton(&skeleton);
    for index in 0..frames {
        frame = frame.add_scalar(0.001 * index as f32);
        motion.add_frame(frame.clone());
    }

    BvhFile { skeleton, motion }
}

fn parse_benchmark(c: &mut Criterion) {
    let text = create_test_file(30, 120).to_bvh_string().unwrap();
    let parser = BvhParser::new();

    c.bench_function("parse_30_joints_120_frames", |b| {
        b.iter(|| parser.parse_str(black_box(&text)).unwrap())
    });
}

fn write_benchmark(c: &mut Criterion) {
    let file = create_test_file(30, 120);

    c.bench_function("write_30_joints_120_frames", |b| {
        b.iter(|| black_box(&file).to_bvh_string().unwrap())
    });
}

criterion_group!(benches, parse_benchmark, write_benchmark);
criterion_main!(benches);
