//! Scripted tutorial generators
//!
//! Tutorials never draw from the PRNG. Each call plays the next step of a
//! fixed script until the script runs out, after which the generator stops
//! accepting and the probabilistic generators take over.

use serde::{Deserialize, Serialize};

use super::{GenContext, GenRequest};
use crate::consts::NOMINAL_HEIGHT;
use crate::error::TrackError;
use crate::track::RibbonShape;

/// Which tutorial, and the level it teaches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TutorialKind {
    /// Level 1: hold to run
    Run,
    /// Level 2: release to jump over gaps
    Jump,
}

impl TutorialKind {
    pub fn level(&self) -> u32 {
        match self {
            TutorialKind::Run => 1,
            TutorialKind::Jump => 2,
        }
    }

    fn script(&self) -> &'static [[Piece; 2]] {
        match self {
            TutorialKind::Run => &RUN_SCRIPT,
            TutorialKind::Jump => &JUMP_SCRIPT,
        }
    }
}

/// One Segment of a tutorial step
#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece {
    /// Solid ribbon: part count and total yaw
    Ribbon(usize, f32),
    /// Gap of this many nominal parts
    Gap(usize),
}

const RUN_SCRIPT: [[Piece; 2]; 10] = [
    [Piece::Ribbon(12, 0.0), Piece::Ribbon(12, 0.0)],
    [Piece::Ribbon(10, 0.0), Piece::Ribbon(10, 0.1)],
    [Piece::Ribbon(10, -0.1), Piece::Ribbon(10, 0.0)],
    [Piece::Ribbon(12, 0.15), Piece::Ribbon(12, -0.15)],
    [Piece::Ribbon(10, 0.0), Piece::Ribbon(10, 0.0)],
    [Piece::Ribbon(12, 0.2), Piece::Ribbon(10, 0.0)],
    [Piece::Ribbon(10, -0.2), Piece::Ribbon(12, 0.0)],
    [Piece::Ribbon(10, 0.1), Piece::Ribbon(10, -0.1)],
    [Piece::Ribbon(12, 0.0), Piece::Ribbon(12, 0.0)],
    [Piece::Ribbon(14, 0.0), Piece::Ribbon(14, 0.0)],
];

// Every step starts solid, so gaps are never adjacent
const JUMP_SCRIPT: [[Piece; 2]; 8] = [
    [Piece::Ribbon(14, 0.0), Piece::Ribbon(10, 0.0)],
    [Piece::Ribbon(10, 0.0), Piece::Gap(3)],
    [Piece::Ribbon(10, 0.0), Piece::Gap(3)],
    [Piece::Ribbon(12, 0.1), Piece::Gap(4)],
    [Piece::Ribbon(10, -0.1), Piece::Gap(4)],
    [Piece::Ribbon(10, 0.0), Piece::Gap(5)],
    [Piece::Ribbon(12, 0.0), Piece::Gap(6)],
    [Piece::Ribbon(14, 0.0), Piece::Ribbon(12, 0.0)],
];

/// Scripted generator; `step` is the next script entry to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialGenerator {
    kind: TutorialKind,
    step: usize,
}

impl TutorialGenerator {
    pub fn new(kind: TutorialKind) -> Self {
        Self { kind, step: 0 }
    }

    pub fn kind(&self) -> TutorialKind {
        self.kind
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn steps(&self) -> usize {
        self.kind.script().len()
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn can_run(&self, req: &GenRequest) -> bool {
        req.level == self.kind.level() && self.step < self.steps()
    }

    pub fn generate(&mut self, req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
        let Some(pieces) = self.kind.script().get(self.step) else {
            return Ok(0);
        };
        let name = match self.kind {
            TutorialKind::Run => "TutorialRun",
            TutorialKind::Jump => "TutorialJump",
        };

        for piece in pieces {
            match *piece {
                Piece::Ribbon(parts, yaw) => {
                    let shape = RibbonShape {
                        yaw,
                        ..RibbonShape::straight(parts, NOMINAL_HEIGHT)
                    };
                    ctx.append_ribbon(name, req.level, &shape, "tutorial")?;
                }
                Piece::Gap(parts) => {
                    ctx.append_hole(name, req.level, parts)?;
                }
            }
        }

        self.step += 1;
        if self.step == self.steps() {
            log::info!("{:?} tutorial finished", self.kind);
        }
        Ok(pieces.len())
    }
}
