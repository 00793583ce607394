// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Aggregation of time-sampled submissions into one motion statement.

use crate::error::{RendererError, RendererResult};
use crate::primitive::Primitive;
use vesper_core::math::Mat4;

/// One time sample of a motion block.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionSample {
    /// A transform concatenated at this sample time.
    Transform(Mat4),
    /// The primitive's shape at this sample time.
    Primitive(Primitive),
}

impl MotionSample {
    fn describe(&self) -> &'static str {
        match self {
            MotionSample::Transform(_) => "a transform",
            MotionSample::Primitive(_) => "a primitive",
        }
    }
}

/// An open motion block collecting one sample per declared time.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionBlock {
    times: Vec<f32>,
    samples: Vec<MotionSample>,
}

impl MotionBlock {
    /// Opens a block for the given sample times.
    ///
    /// At least two finite, strictly increasing times are required.
    pub fn new(times: Vec<f32>) -> RendererResult<Self> {
        let reason = if times.len() < 2 {
            Some("a motion block needs at least two sample times")
        } else if times.iter().any(|t| !t.is_finite()) {
            Some("sample times must be finite")
        } else if times.windows(2).any(|w| w[0] >= w[1]) {
            Some("sample times must be strictly increasing")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(RendererError::InvalidMotionTimes { times, reason });
        }
        Ok(Self {
            samples: Vec::with_capacity(times.len()),
            times,
        })
    }

    /// The declared sample times.
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// The samples submitted so far, in submission order.
    pub fn samples(&self) -> &[MotionSample] {
        &self.samples
    }

    /// Records the next sample.
    ///
    /// Fails without recording anything if the block is already full or if
    /// the sample does not describe the same kind of thing as the first one.
    pub fn push(&mut self, sample: MotionSample) -> RendererResult<()> {
        if self.samples.len() == self.times.len() {
            return Err(RendererError::MotionSampleCount {
                expected: self.times.len(),
                submitted: self.samples.len() + 1,
            });
        }
        if let Some(first) = self.samples.first() {
            let index = self.samples.len();
            match (first, &sample) {
                (MotionSample::Transform(_), MotionSample::Transform(_)) => {}
                (MotionSample::Primitive(a), MotionSample::Primitive(b)) => {
                    if let Some(reason) = a.topology_mismatch(b) {
                        return Err(RendererError::MotionSampleMismatch { index, reason });
                    }
                }
                (first, sample) => {
                    return Err(RendererError::MotionSampleMismatch {
                        index,
                        reason: format!(
                            "got {} but the block started with {}",
                            sample.describe(),
                            first.describe()
                        ),
                    });
                }
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Closes the block, returning its times and samples.
    pub fn finish(self) -> RendererResult<(Vec<f32>, Vec<MotionSample>)> {
        if self.samples.len() != self.times.len() {
            return Err(RendererError::MotionSampleCount {
                expected: self.times.len(),
                submitted: self.samples.len(),
            });
        }
        Ok((self.times, self.samples))
    }
}
