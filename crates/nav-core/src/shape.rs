/// Collision cylinder of an agent.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentShape {
    pub radius: f32,
    pub height: f32,
}

impl AgentShape {
    #[inline]
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }
}

impl Default for AgentShape {
    fn default() -> Self {
        Self { radius: 0.5, height: 2.0 }
    }
}
