use cgmath::{Matrix4, One, Quaternion, SquareMatrix, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0., 0., 0.),
            rotation: Quaternion::one(),
            scale: Vector3::new(1., 1., 1.),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Model matrix, scale first and translation last.
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    parent: Option<NodeId>,
    world: Matrix4<f32>,
}

/// Arena of nodes. A parent is always added before its children, so one pass
/// in insertion order resolves every world matrix.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, transform: Transform, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());

        let parent_world = parent
            .and_then(|parent| self.nodes.get(parent.0))
            .map(|parent| parent.world)
            .unwrap_or_else(Matrix4::identity);

        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            world: parent_world * transform.matrix(),
            transform,
        });

        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn transform_mut(&mut self, id: NodeId) -> &mut Transform {
        &mut self.nodes[id.0].transform
    }

    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        self.nodes[id.0].world
    }

    pub fn update_world_matrices(&mut self) {
        for i in 0..self.nodes.len() {
            let local = self.nodes[i].transform.matrix();

            self.nodes[i].world = match self.nodes[i].parent {
                Some(parent) => self.nodes[parent.0].world * local,
                None => local,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3, Transform as _};

    fn assert_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();

        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn transform_applies_scale_rotation_translation() {
        let transform = Transform {
            position: Vector3::new(1., 2., 3.),
            rotation: Quaternion::from_angle_z(Deg(90.)),
            scale: Vector3::new(2., 2., 2.),
        };

        let p = transform.matrix().transform_point(cgmath::Point3::new(1., 0., 0.));

        assert!((p.x - 1.).abs() < 1e-5);
        assert!((p.y - 4.).abs() < 1e-5);
        assert!((p.z - 3.).abs() < 1e-5);
    }

    #[test]
    fn child_world_is_parent_times_local() {
        let mut tree = NodeTree::new();
        let parent = tree.add("parent", Transform::from_position(Vector3::new(0., 1., 0.)), None);
        let child = tree.add(
            "child",
            Transform::from_position(Vector3::new(0., 2., 0.)),
            Some(parent),
        );

        tree.transform_mut(parent).rotation = Quaternion::from_angle_x(Deg(45.));
        tree.update_world_matrices();

        let expected = tree.node(parent).transform.matrix() * tree.node(child).transform.matrix();

        assert_close(tree.world_matrix(child), expected);
        assert_eq!(tree.node(child).parent, Some(parent));
    }
}
