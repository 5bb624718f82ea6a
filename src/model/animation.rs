use super::transform::{NodeId, NodeTree};
use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

#[derive(Debug, Clone)]
pub enum TrackValues {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
}

/// Keyframes of one channel of one node, `times` sorted ascending.
#[derive(Debug, Clone)]
pub struct Track {
    pub node: NodeId,
    pub times: Vec<f32>,
    pub values: TrackValues,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// `[min, max]` over every keyframe of every track.
    pub fn time_range(&self) -> (f32, f32) {
        let mut times = self.tracks.iter().flat_map(|t| t.times.iter().copied());

        match times.next() {
            Some(first) => times.fold((first, first), |(min, max), t| (min.min(t), max.max(t))),
            None => (0., 0.),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayState {
    Idle,
    Playing { clip: usize, time: f32 },
}

pub struct BakedAnimation {
    clips: Vec<AnimationClip>,
    state: PlayState,
    min_time: f32,
    max_time: f32,
}

impl BakedAnimation {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            state: PlayState::Idle,
            min_time: 0.,
            max_time: 0.,
        }
    }

    /// Starts `name` from time 0. Unknown names stop playback and return `false`.
    pub fn run_animation(&mut self, name: &str) -> bool {
        let Some(clip) = self.clips.iter().position(|c| c.name == name) else {
            log::warn!("no animation named '{}'", name);
            self.state = PlayState::Idle;
            return false;
        };

        let (min_time, max_time) = self.clips[clip].time_range();
        self.min_time = min_time;
        self.max_time = max_time;
        self.state = PlayState::Playing { clip, time: 0. };

        log::debug!("playing '{}' over [{}, {}]", name, min_time, max_time);
        true
    }

    pub fn update(&mut self, delta: f32, nodes: &mut NodeTree) {
        if let PlayState::Playing { time, .. } = self.state {
            self.play_frame(time + delta, nodes);
        }
    }

    /// Jumps to absolute time `t` (wrapped into the clip) and poses the nodes.
    pub fn play_frame(&mut self, t: f32, nodes: &mut NodeTree) {
        let PlayState::Playing { clip, .. } = self.state else {
            return;
        };

        let time = wrap_time(t, self.min_time, self.max_time);
        self.state = PlayState::Playing { clip, time };

        for track in self.clips[clip].tracks.iter() {
            apply_track(track, time, nodes);
        }
    }
}

/// Wraps `t` past `max` back into `[min, max)` keeping the overshoot.
pub fn wrap_time(t: f32, min: f32, max: f32) -> f32 {
    if t <= max {
        return t;
    }

    let span = max - min;

    if span <= 0. {
        min
    } else {
        min + (t - min) % span
    }
}

/// Previous and next keyframe around `t`, with the progression between them.
/// The first keyframe whose time exceeds `t` is the next one.
pub fn bracket(times: &[f32], t: f32) -> (usize, usize, f32) {
    let Some(last) = times.len().checked_sub(1) else {
        return (0, 0, 0.);
    };

    match times.iter().position(|&time| time > t) {
        Some(0) => (0, 0, 0.),
        Some(next) => {
            let prev = next - 1;
            let span = times[next] - times[prev];
            let progression = if span > 0. { (t - times[prev]) / span } else { 0. };

            (prev, next, progression)
        }
        None => (last, last, 0.),
    }
}

fn slerp(a: Quaternion<f32>, b: Quaternion<f32>, amount: f32) -> Quaternion<f32> {
    // Take the short way around.
    let b = if a.dot(b) < 0. { -b } else { b };

    a.slerp(b, amount).normalize()
}

fn apply_track(track: &Track, time: f32, nodes: &mut NodeTree) {
    if track.times.is_empty() {
        return;
    }

    let (prev, next, progression) = bracket(&track.times, time);
    let transform = nodes.transform_mut(track.node);

    match &track.values {
        TrackValues::Translation(values) => {
            transform.position = values[prev].lerp(values[next], progression);
        }
        TrackValues::Rotation(values) => {
            transform.rotation = slerp(values[prev], values[next], progression);
        }
        TrackValues::Scale(values) => {
            transform.scale = values[prev].lerp(values[next], progression);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transform::Transform;
    use cgmath::{Deg, Rotation3};

    fn sliding_node() -> (NodeTree, NodeId, BakedAnimation) {
        let mut nodes = NodeTree::new();
        let node = nodes.add("slider", Transform::default(), None);

        let clip = AnimationClip {
            name: "slide".to_string(),
            tracks: vec![
                Track {
                    node,
                    times: vec![0., 1., 2.],
                    values: TrackValues::Translation(vec![
                        Vector3::new(0., 0., 0.),
                        Vector3::new(2., 0., 0.),
                        Vector3::new(2., 4., 0.),
                    ]),
                },
                Track {
                    node,
                    times: vec![0., 2.],
                    values: TrackValues::Rotation(vec![
                        Quaternion::from_angle_y(Deg(0.)),
                        Quaternion::from_angle_y(Deg(90.)),
                    ]),
                },
            ],
        };

        (nodes, node, BakedAnimation::new(vec![clip]))
    }

    #[test]
    fn bracket_picks_surrounding_keyframes() {
        let times = [0., 1., 3.];

        assert_eq!(bracket(&times, 0.5), (0, 1, 0.5));
        assert_eq!(bracket(&times, 2.), (1, 2, 0.5));
        assert_eq!(bracket(&times, 1.), (1, 2, 0.));
        assert_eq!(bracket(&times, 5.), (2, 2, 0.));
        assert_eq!(bracket(&times, -1.), (0, 0, 0.));
        assert_eq!(bracket(&[], 1.), (0, 0, 0.));
    }

    #[test]
    fn wrap_uses_the_clip_span() {
        assert_eq!(wrap_time(2.5, 0., 2.), 0.5);
        assert_eq!(wrap_time(3.5, 1., 3.), 1.5);
        assert_eq!(wrap_time(1.5, 1., 3.), 1.5);
        assert_eq!(wrap_time(4., 2., 2.), 2.);
    }

    #[test]
    fn playing_interpolates_translation_and_rotation() {
        let (mut nodes, node, mut animation) = sliding_node();

        assert!(animation.run_animation("slide"));
        assert_eq!((animation.min_time, animation.max_time), (0., 2.));

        animation.update(0.5, &mut nodes);
        let transform = nodes.node(node).transform;

        assert!((transform.position - Vector3::new(1., 0., 0.)).magnitude() < 1e-5);

        let expected = Quaternion::from_angle_y(Deg(22.5));
        assert!((transform.rotation.dot(expected).abs() - 1.).abs() < 1e-5);
    }

    #[test]
    fn update_wraps_past_the_end() {
        let (mut nodes, node, mut animation) = sliding_node();
        animation.run_animation("slide");

        animation.update(1.5, &mut nodes);
        animation.update(1.0, &mut nodes);

        assert_eq!(animation.state, PlayState::Playing { clip: 0, time: 0.5 });
        assert!((nodes.node(node).transform.position.x - 1.).abs() < 1e-5);
    }

    #[test]
    fn unknown_clip_stays_idle() {
        let (mut nodes, node, mut animation) = sliding_node();

        assert!(!animation.run_animation("jump"));
        animation.update(1., &mut nodes);

        assert_eq!(animation.state, PlayState::Idle);
        assert_eq!(nodes.node(node).transform, Transform::default());
    }

    #[test]
    fn unknown_clip_stops_a_playing_clip() {
        let (mut nodes, node, mut animation) = sliding_node();
        animation.run_animation("slide");
        animation.update(0.25, &mut nodes);
        let posed = nodes.node(node).transform;

        assert!(!animation.run_animation("jump"));
        assert_eq!(animation.state, PlayState::Idle);

        animation.update(1., &mut nodes);
        assert_eq!(nodes.node(node).transform, posed);
    }
}
