//! Destination point and facing.

use glam::Vec3;

/// Where an agent is heading, and optionally which way it should face on
/// arrival.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destination {
    pub point:  Vec3,
    /// `None` means any facing is fine.
    pub facing: Option<Vec3>,
}

impl Destination {
    /// A zero facing vector is treated as "don't care".
    pub fn new(point: Vec3, facing: Option<Vec3>) -> Self {
        let facing = facing.filter(|f| f.length_squared() > 1e-12);
        Self { point, facing }
    }
}

/// Owns the agent's destination.
///
/// Setting a value equal to the stored one reports no change, so repeated
/// identical calls never touch the path.  While a link is being crossed the
/// value is still stored, but the path repair it calls for is deferred until
/// the crossing ends.
#[derive(Clone, Debug, Default)]
pub struct DestinationController {
    current:  Option<Destination>,
    deferred: bool,
}

impl DestinationController {
    #[inline]
    pub fn get(&self) -> Option<&Destination> {
        self.current.as_ref()
    }

    #[inline]
    pub fn point(&self) -> Option<Vec3> {
        self.current.map(|d| d.point)
    }

    /// Store `destination`.  Returns `false` if it equals the stored one.
    pub fn set(&mut self, destination: Destination) -> bool {
        if self.current == Some(destination) {
            return false;
        }
        self.current = Some(destination);
        true
    }

    /// Remember that the path end still has to follow the stored value.
    #[inline]
    pub fn defer(&mut self) {
        self.deferred = true;
    }

    /// Take the deferred flag, leaving it cleared.
    #[inline]
    pub fn take_deferred(&mut self) -> bool {
        std::mem::take(&mut self.deferred)
    }
}
