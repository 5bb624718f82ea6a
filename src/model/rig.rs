use super::animation::{AnimationClip, BakedAnimation, Track, TrackValues};
use super::mesh::Geometry;
use super::skin::Skin;
use super::transform::{NodeId, NodeTree, Transform};
use crate::error::SketchResult;
use cgmath::{Matrix4, Quaternion, Rad, Rotation3, Vector3};
use std::f32::consts::TAU;

pub const SWAY_CLIP: &str = "sway";

pub struct StalkOptions {
    pub position: Vector3<f32>,
    pub height: f32,
    pub radius: f32,
    pub joint_count: usize,
    pub sway_period_sec: f32,
    /// Maximum bend per joint in radians.
    pub sway_angle: f32,
}

impl Default for StalkOptions {
    fn default() -> Self {
        Self {
            position: Vector3::new(0., 0., 0.),
            height: 3.,
            radius: 0.35,
            joint_count: 5,
            sway_period_sec: 4.,
            sway_angle: 0.22,
        }
    }
}

/// Skinned tube driven by a chain of joints, with a baked sway clip.
pub struct Rig {
    pub root: NodeId,
    pub geometry: Geometry,
    pub skin_joints: Vec<[u32; 4]>,
    pub skin_weights: Vec<[f32; 4]>,
    pub skin: Skin,
    pub animation: BakedAnimation,
}

impl Rig {
    pub fn stalk(nodes: &mut NodeTree, options: &StalkOptions) -> SketchResult<Self> {
        let joint_count = options.joint_count.max(2);
        let segment = options.height / (joint_count - 1) as f32;

        let root = nodes.add("stalk", Transform::from_position(options.position), None);

        let mut joints = Vec::with_capacity(joint_count);
        let mut inverse_bind_matrices = Vec::with_capacity(joint_count);

        for i in 0..joint_count {
            let (parent, offset) = match joints.last() {
                Some(&parent) => (parent, segment),
                None => (root, 0.),
            };

            let joint = nodes.add(
                &format!("stalk_joint_{}", i),
                Transform::from_position(Vector3::new(0., offset, 0.)),
                Some(parent),
            );

            joints.push(joint);
            inverse_bind_matrices.push(Matrix4::from_translation(Vector3::new(
                0.,
                -(i as f32) * segment,
                0.,
            )));
        }

        let geometry = Geometry::cylinder(options.radius, options.height, 16, 24);
        let (skin_joints, skin_weights) = bind_to_chain(&geometry, segment, joint_count);

        let mut skin = Skin::new(joints.clone(), inverse_bind_matrices)?;
        nodes.update_world_matrices();
        skin.update(nodes, root);

        let animation = BakedAnimation::new(vec![sway_clip(&joints, options)]);

        Ok(Self {
            root,
            geometry,
            skin_joints,
            skin_weights,
            skin,
            animation,
        })
    }
}

/// Each vertex blends between the two joints around its height.
fn bind_to_chain(geometry: &Geometry, segment: f32, joint_count: usize) -> (Vec<[u32; 4]>, Vec<[f32; 4]>) {
    let last_segment = joint_count as u32 - 2;

    geometry
        .vertices
        .iter()
        .map(|v| {
            let f = (v.position[1] / segment).max(0.);
            let lower = (f.floor() as u32).min(last_segment);
            let t = (f - lower as f32).clamp(0., 1.);

            ([lower, lower + 1, 0, 0], [1. - t, t, 0., 0.])
        })
        .unzip()
}

fn sway_clip(joints: &[NodeId], options: &StalkOptions) -> AnimationClip {
    const KEYFRAMES: usize = 16;

    let times: Vec<f32> = (0..=KEYFRAMES)
        .map(|k| k as f32 / KEYFRAMES as f32 * options.sway_period_sec)
        .collect();

    let tracks = joints
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &joint)| {
            // Upper joints lag behind so the bend travels up the stalk.
            let lag = i as f32 * 0.35;

            let values = (0..=KEYFRAMES)
                .map(|k| {
                    let phase = k as f32 / KEYFRAMES as f32 * TAU;
                    let bend = options.sway_angle * (phase - lag).sin();
                    let twist = options.sway_angle * 0.5 * (phase * 2. - lag).cos();

                    Quaternion::from_angle_z(Rad(bend)) * Quaternion::from_angle_x(Rad(twist))
                })
                .collect();

            Track {
                node: joint,
                times: times.clone(),
                values: TrackValues::Rotation(values),
            }
        })
        .collect();

    AnimationClip {
        name: SWAY_CLIP.to_string(),
        tracks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simulation::skin_vertex;
    use cgmath::InnerSpace;

    #[test]
    fn weights_sum_to_one() {
        let mut nodes = NodeTree::new();
        let rig = Rig::stalk(&mut nodes, &StalkOptions::default()).unwrap();

        assert_eq!(rig.skin_weights.len(), rig.geometry.vertices.len());

        for (joints, weights) in rig.skin_joints.iter().zip(rig.skin_weights.iter()) {
            assert!((weights.iter().sum::<f32>() - 1.).abs() < 1e-5);
            assert!((joints[1] as usize) < rig.skin.joint_matrices().len());
        }
    }

    #[test]
    fn rest_pose_skinning_keeps_vertices() {
        let mut nodes = NodeTree::new();
        let options = StalkOptions {
            position: Vector3::new(2., 0., -3.),
            ..Default::default()
        };
        let rig = Rig::stalk(&mut nodes, &options).unwrap();

        for (i, v) in rig.geometry.vertices.iter().enumerate() {
            let rest = Vector3::from(v.position);
            let skinned = skin_vertex(
                rest,
                rig.skin_joints[i],
                rig.skin_weights[i],
                rig.skin.joint_matrices(),
            );

            assert!((skinned - rest).magnitude() < 1e-4, "{:?} != {:?}", skinned, rest);
        }
    }

    #[test]
    fn sway_moves_the_tip() {
        let mut nodes = NodeTree::new();
        let mut rig = Rig::stalk(&mut nodes, &StalkOptions::default()).unwrap();
        let tip = rig.geometry.vertices.len() - 1;
        let rest = Vector3::from(rig.geometry.vertices[tip].position);

        assert!(rig.animation.run_animation(SWAY_CLIP));
        rig.animation.update(1., &mut nodes);
        nodes.update_world_matrices();
        rig.skin.update(&nodes, rig.root);

        let swayed = skin_vertex(
            rest,
            rig.skin_joints[tip],
            rig.skin_weights[tip],
            rig.skin.joint_matrices(),
        );

        assert!((swayed - rest).magnitude() > 0.05);
    }
}
