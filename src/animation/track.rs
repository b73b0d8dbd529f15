use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::easing::CubicBezier;
use super::value::{interpolate, resolve_relative, AnimatableValue};
use crate::patch::{PatchError, Restorable, TargetPath};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationError {
    #[error("Track has no keyframes")]
    Empty,

    #[error("Keyframe {index} holds a {found} value, track animates {expected}")]
    MixedKinds {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Keyframe {index} at {time}s precedes the keyframe before it")]
    Unsorted { index: usize, time: f32 },

    #[error(transparent)]
    Patch(#[from] PatchError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Seconds from the start of the track.
    pub time: f32,
    pub value: AnimatableValue,
    /// Easing of the segment that ends at this keyframe.
    #[serde(default)]
    pub easing: CubicBezier,
}

impl Keyframe {
    pub fn new(time: f32, value: AnimatableValue) -> Self {
        Self {
            time,
            value,
            easing: CubicBezier::LINEAR,
        }
    }

    pub fn eased(mut self, easing: CubicBezier) -> Self {
        self.easing = easing;
        self
    }
}

/// Keyframes driving one field, addressed by a target path.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    target: TargetPath,
    keyframes: Vec<Keyframe>,
    relative: bool,
}

impl Track {
    /// Build a track. Keyframes must be time-ordered and share one shape.
    pub fn new(
        target: TargetPath,
        keyframes: Vec<Keyframe>,
        relative: bool,
    ) -> Result<Self, AnimationError> {
        let first = keyframes.first().ok_or(AnimationError::Empty)?;
        let kind = first.value;
        let mut last_time = first.time;
        for (index, kf) in keyframes.iter().enumerate().skip(1) {
            if !kf.value.same_kind(&kind) {
                return Err(AnimationError::MixedKinds {
                    index,
                    expected: kind.kind(),
                    found: kf.value.kind(),
                });
            }
            if kf.time < last_time {
                return Err(AnimationError::Unsorted {
                    index,
                    time: kf.time,
                });
            }
            last_time = kf.time;
        }
        Ok(Self {
            target,
            keyframes,
            relative,
        })
    }

    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn duration(&self) -> f32 {
        self.keyframes.last().map(|k| k.time).unwrap_or(0.0)
    }

    /// Value at `time`, clamped to the first and last keyframes.
    ///
    /// Relative tracks are composed onto `reference` when one is given.
    pub fn sample(&self, time: f32, reference: Option<&AnimatableValue>) -> AnimatableValue {
        let value = self.sample_raw(time);
        match (self.relative, reference) {
            (true, Some(reference)) => resolve_relative(reference, &value).unwrap_or(value),
            _ => value,
        }
    }

    /// Sample at `time` and write the result into `patch` at this track's path.
    pub fn apply<R: Restorable>(
        &self,
        time: f32,
        reference: Option<&AnimatableValue>,
        patch: &mut R,
    ) -> Result<(), AnimationError> {
        let value = self.sample(time, reference);
        patch.write(&self.target.path, &value)?;
        Ok(())
    }

    fn sample_raw(&self, time: f32) -> AnimatableValue {
        // `new` guarantees at least one keyframe.
        let first = &self.keyframes[0];
        if time <= first.time {
            return first.value;
        }
        for pair in self.keyframes.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if time <= to.time {
                let span = to.time - from.time;
                if span <= f32::EPSILON {
                    return to.value;
                }
                let t = to.easing.sample((time - from.time) / span);
                return interpolate(&from.value, &to.value, t).unwrap_or(to.value);
            }
        }
        self.keyframes[self.keyframes.len() - 1].value
    }
}
