use super::transform::{NodeId, NodeTree};
use crate::error::{SketchError, SketchResult};
use crate::math::mat4_to_array;
use cgmath::{Matrix4, SquareMatrix};

/// Joint matrices of a skinned mesh, relative to the skin's root node.
///
/// Joints are handles into a `NodeTree` owned elsewhere, the skin only reads
/// their world matrices.
pub struct Skin {
    joints: Vec<NodeId>,
    inverse_bind_matrices: Vec<Matrix4<f32>>,
    joint_matrices: Vec<Matrix4<f32>>,
    degenerate_root: bool,
}

impl Skin {
    pub fn new(joints: Vec<NodeId>, inverse_bind_matrices: Vec<Matrix4<f32>>) -> SketchResult<Self> {
        if joints.len() != inverse_bind_matrices.len() {
            return Err(SketchError::SkinMismatch {
                joints: joints.len(),
                inverse_bind_matrices: inverse_bind_matrices.len(),
            });
        }

        let joint_matrices = vec![Matrix4::identity(); joints.len()];

        Ok(Self {
            joints,
            inverse_bind_matrices,
            joint_matrices,
            degenerate_root: false,
        })
    }

    /// `joint_matrix[i] = inverse(root_world) * joint_world[i] * inverse_bind[i]`.
    ///
    /// A root without an inverse keeps the previous matrices.
    pub fn update(&mut self, nodes: &NodeTree, root: NodeId) {
        let Some(global_world_inverse) = nodes.world_matrix(root).invert() else {
            if !self.degenerate_root {
                log::warn!("skin root '{}' is degenerate, keeping last pose", nodes.node(root).name);
                self.degenerate_root = true;
            }
            return;
        };

        self.degenerate_root = false;

        for (i, joint) in self.joints.iter().enumerate() {
            self.joint_matrices[i] =
                global_world_inverse * nodes.world_matrix(*joint) * self.inverse_bind_matrices[i];
        }
    }

    pub fn joint_matrices(&self) -> &[Matrix4<f32>] {
        &self.joint_matrices
    }

    /// Flat joint matrices, ready for upload.
    pub fn joint_data(&self) -> Vec<[[f32; 4]; 4]> {
        self.joint_matrices.iter().map(mat4_to_array).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transform::Transform;
    use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3, Zero};

    fn assert_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();

        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    fn chain() -> (NodeTree, NodeId, Vec<NodeId>) {
        let mut nodes = NodeTree::new();
        let root = nodes.add("root", Transform::from_position(Vector3::new(3., 0., -1.)), None);
        let hip = nodes.add("hip", Transform::default(), Some(root));
        let knee = nodes.add("knee", Transform::from_position(Vector3::new(0., 1., 0.)), Some(hip));

        nodes.transform_mut(hip).rotation = Quaternion::from_angle_z(Deg(30.));
        nodes.transform_mut(knee).rotation = Quaternion::from_angle_x(Deg(-20.));
        nodes.update_world_matrices();

        (nodes, root, vec![hip, knee])
    }

    fn inverse_binds() -> Vec<Matrix4<f32>> {
        vec![
            Matrix4::identity(),
            Matrix4::from_translation(Vector3::new(0., -1., 0.)),
        ]
    }

    /// `Σ weight_i * joint_matrix[joint_i]`.
    fn skin_matrix(skin: &Skin, joints: [u32; 4], weights: [f32; 4]) -> Matrix4<f32> {
        joints
            .iter()
            .zip(weights.iter())
            .fold(Matrix4::zero(), |acc, (&joint, &weight)| {
                acc + skin.joint_matrices()[joint as usize] * weight
            })
    }

    #[test]
    fn joint_matrices_follow_the_skinning_formula() {
        let (nodes, root, joints) = chain();
        let mut skin = Skin::new(joints.clone(), inverse_binds()).unwrap();
        skin.update(&nodes, root);

        let root_inverse = nodes.world_matrix(root).invert().unwrap();

        for (i, joint) in joints.iter().enumerate() {
            let expected = root_inverse * nodes.world_matrix(*joint) * inverse_binds()[i];
            assert_close(skin.joint_matrices()[i], expected);
        }
    }

    #[test]
    fn update_is_idempotent() {
        let (nodes, root, joints) = chain();
        let mut skin = Skin::new(joints, inverse_binds()).unwrap();

        skin.update(&nodes, root);
        let first = skin.joint_matrices().to_vec();
        skin.update(&nodes, root);

        assert_eq!(first, skin.joint_matrices());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let (_, _, joints) = chain();
        let res = Skin::new(joints, vec![Matrix4::identity()]);

        assert!(matches!(
            res,
            Err(SketchError::SkinMismatch {
                joints: 2,
                inverse_bind_matrices: 1
            })
        ));
    }

    #[test]
    fn blended_matrix_matches_blended_vertices() {
        let (nodes, root, joints) = chain();
        let mut skin = Skin::new(joints, inverse_binds()).unwrap();
        skin.update(&nodes, root);

        let rest = Vector3::new(0.2, 0.7, -0.1);
        let blended = skin_matrix(&skin, [0, 1, 0, 0], [0.3, 0.7, 0., 0.]) * rest.extend(1.);
        let per_joint = crate::model::simulation::skin_vertex(
            rest,
            [0, 1, 0, 0],
            [0.3, 0.7, 0., 0.],
            skin.joint_matrices(),
        );

        assert!((blended.truncate() - per_joint).magnitude() < 1e-5);
    }

    #[test]
    fn joint_data_is_column_major() {
        let (nodes, root, joints) = chain();
        let mut skin = Skin::new(joints, inverse_binds()).unwrap();
        skin.update(&nodes, root);

        let data = skin.joint_data();
        let m = skin.joint_matrices()[1];

        assert_eq!(data.len(), 2);
        assert_eq!(data[1][3], [m.w.x, m.w.y, m.w.z, m.w.w]);
    }

    #[test]
    fn degenerate_root_keeps_previous_pose() {
        let (mut nodes, root, joints) = chain();
        let mut skin = Skin::new(joints, inverse_binds()).unwrap();
        skin.update(&nodes, root);
        let before = skin.joint_matrices().to_vec();

        nodes.transform_mut(root).scale = Vector3::new(0., 1., 1.);
        nodes.update_world_matrices();
        skin.update(&nodes, root);

        assert_eq!(before, skin.joint_matrices());
    }
}
