// The smallest unit of audio; one stereo frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn mono(s: f32) -> Self {
        Self { left: s, right: s }
    }

    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}
