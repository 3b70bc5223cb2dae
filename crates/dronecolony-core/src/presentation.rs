//! Presentation hooks.
//!
//! The simulation announces sounds, visual effects and beams through this
//! trait. Every method defaults to a no-op, so a headless run needs no
//! implementation of its own.

use crate::components::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    Explosion,
    Shot,
    Beam,
    Production,
    Merge,
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Explosion,
    SmallExplosion,
    Teleport,
    Recycle,
    Stomp,
}

pub trait Presentation {
    fn play_sound(&mut self, _sound: SoundKind, _pos: Vec2) {}
    fn create_effect(&mut self, _effect: EffectKind, _pos: Vec2) {}
    fn create_beam(&mut self, _from: Vec2, _to: Vec2) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Presentation for Headless {}

/// Counts calls; used by tests and the harness to check hooks fire.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub sounds: usize,
    pub effects: usize,
    pub beams: usize,
}

impl Presentation for Recorder {
    fn play_sound(&mut self, _sound: SoundKind, _pos: Vec2) {
        self.sounds += 1;
    }

    fn create_effect(&mut self, _effect: EffectKind, _pos: Vec2) {
        self.effects += 1;
    }

    fn create_beam(&mut self, _from: Vec2, _to: Vec2) {
        self.beams += 1;
    }
}
