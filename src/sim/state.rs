//! Game state and core types
//!
//! Everything a turn decision depends on lives in `GameState`, owned by the
//! update loop and passed by reference to each subsystem.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::TowerBounds;
use super::layout::build_tower;
use crate::consts::*;
use crate::error::GameError;
use crate::settings::Settings;

/// Turn display text while a switch waits for the tower to settle
pub const STABILIZING_TEXT: &str = "Waiting for blocks to stabilize...";
/// Game over text for a tie
pub const TIE_TEXT: &str = "Tie!";

/// Stable block identity (equal to the block's index in creation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Identity of a pickable visual object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VisualId(pub u32);

/// One of the two players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Player {
    #[default]
    One,
    Two,
}

impl Player {
    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// How the game stands; anything but `InProgress` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    InProgress,
    PlayerLost(Player),
    Tie,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::InProgress
    }

    /// Game over banner text
    pub fn message(self) -> Option<String> {
        match self {
            Outcome::InProgress => None,
            Outcome::PlayerLost(p) => Some(format!("player {} lost", p.number())),
            Outcome::Tie => Some(TIE_TEXT.to_string()),
        }
    }
}

/// Pointer interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interaction {
    /// No block under the pointer
    #[default]
    Idle,
    /// A block follows the pointer until the next pointer-down
    Grabbed { block: BlockId },
}

/// Simulation body state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Zero mass makes the body static
    pub mass: f32,
    /// World-aligned half extents (already accounting for yaw)
    pub half_extents: Vec3,
    /// Rotation about the vertical axis (radians)
    pub yaw: f32,
    /// Following the pointer: no gravity, not pushed by neighbours
    #[serde(default)]
    pub held: bool,
}

impl Body {
    pub fn new(position: Vec3, half_extents: Vec3, yaw: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            half_extents,
            yaw,
            held: false,
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// Free to fall and be pushed around: neither static nor held
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.is_static() && !self.held
    }

    /// Zero linear and angular velocity
    pub fn halt(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.position.y - self.half_extents.y
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.position.y + self.half_extents.y
    }
}

/// Visual counterpart of a block, as the renderer sees it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    pub id: VisualId,
    pub block: BlockId,
    pub position: Vec3,
    pub yaw: f32,
    pub half_extents: Vec3,
    pub visible: bool,
}

/// A tower block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub visual: VisualId,
    pub body: Body,
    /// Taken out of the tower and parked
    pub removed: bool,
    /// Model failed to load; keeps its slot but takes no part in play
    #[serde(default)]
    pub missing: bool,
}

impl Block {
    /// Disable the block: static, still, parked far away
    pub fn park(&mut self) {
        self.body.mass = 0.0;
        self.body.halt();
        self.body.position = PARKING_POSITION;
    }
}

/// Turn switch waiting for the selected blocks to come to rest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSwitch {
    /// Frame time the switch was requested
    pub requested_ms: f64,
    /// Next frame time at which rest is polled
    pub next_poll_ms: f64,
}

/// Events for the presentation layer (drained by the host each frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BlockRemoved { block: BlockId, by: Player },
    Stabilizing,
    TurnChanged { player: Player },
    GameOver { outcome: Outcome, message: String },
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub settings: Settings,
    pub bounds: TowerBounds,
    /// Blocks in creation order (index == id)
    pub blocks: Vec<Block>,
    /// Visual objects in creation order (index == id)
    pub visuals: Vec<Visual>,
    /// Blocks any player has grabbed this game
    pub selection: BTreeSet<BlockId>,
    pub current_player: Player,
    /// One-shot latch: the current move may still switch the turn
    pub can_switch: bool,
    pub interaction: Interaction,
    /// Block the current move is about
    pub current_block: Option<BlockId>,
    /// Last pointer position in client pixels
    pub last_pointer: glam::Vec2,
    pub pending_switch: Option<PendingSwitch>,
    pub outcome: Outcome,
    /// Cleared on game over; pointer input is ignored afterwards
    pub interaction_enabled: bool,
    /// Latest frame time seen by `tick`
    pub now_ms: f64,
    /// Events not yet drained by the host
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Fresh game with a full tower and player one to move
    pub fn new(settings: Settings) -> Self {
        let (blocks, visuals) = build_tower(BLOCK_COUNT);
        let bounds = settings.tower_bounds();
        log::info!("Tower built with {} blocks", blocks.len());
        Self {
            settings,
            bounds,
            blocks,
            visuals,
            selection: BTreeSet::new(),
            current_player: Player::One,
            can_switch: false,
            interaction: Interaction::Idle,
            current_block: None,
            last_pointer: glam::Vec2::ZERO,
            pending_switch: None,
            outcome: Outcome::InProgress,
            interaction_enabled: true,
            now_ms: 0.0,
            events: Vec::new(),
        }
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, GameError> {
        self.blocks
            .get(id.0 as usize)
            .ok_or(GameError::UnknownBlock(id))
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, GameError> {
        self.blocks
            .get_mut(id.0 as usize)
            .ok_or(GameError::UnknownBlock(id))
    }

    /// Resolve a picked visual to its block
    pub fn block_for_visual(&self, visual: VisualId) -> Result<BlockId, GameError> {
        let block = self
            .visuals
            .get(visual.0 as usize)
            .filter(|v| v.id == visual)
            .map(|v| v.block)
            .ok_or(GameError::UnknownVisual(visual))?;
        let found = self.block(block)?;
        if found.missing {
            return Err(GameError::MissingBlock(block));
        }
        if found.removed {
            return Err(GameError::RemovedBlock(block));
        }
        Ok(block)
    }

    /// Is the block's footprint wholly outside the tower?
    pub fn is_outside(&self, id: BlockId) -> bool {
        self.block(id)
            .map(|b| self.bounds.is_outside(b.body.position, self.settings.bounds_footprint))
            .unwrap_or(false)
    }

    /// Blocks that take part in the simulation (loaded models only)
    pub fn physics_block_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.missing).count()
    }

    /// Record that a block's model failed to load. The block keeps its id
    /// but becomes static, hidden and unpickable.
    pub fn mark_load_failed(&mut self, id: BlockId) -> Result<(), GameError> {
        let block = self.block_mut(id)?;
        block.missing = true;
        block.park();
        let visual = block.visual;
        if let Some(v) = self.visuals.get_mut(visual.0 as usize) {
            v.visible = false;
        }
        log::error!("Block {} model failed to load; continuing without it", id.0);
        Ok(())
    }

    /// Copy body transforms onto the visuals
    pub fn sync_visuals(&mut self) {
        for block in &self.blocks {
            if let Some(visual) = self.visuals.get_mut(block.visual.0 as usize) {
                visual.position = block.body.position;
                visual.yaw = block.body.yaw;
            }
        }
    }

    /// Block currently following the pointer
    pub fn grabbed(&self) -> Option<BlockId> {
        match self.interaction {
            Interaction::Grabbed { block } => Some(block),
            Interaction::Idle => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Turn indicator text
    pub fn turn_display(&self) -> String {
        if self.pending_switch.is_some() {
            STABILIZING_TEXT.to_string()
        } else {
            format!("Player {}'s Turn", self.current_player.number())
        }
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game() {
        let state = GameState::default();
        assert_eq!(state.blocks.len(), BLOCK_COUNT as usize);
        assert_eq!(state.visuals.len(), BLOCK_COUNT as usize);
        assert_eq!(state.current_player, Player::One);
        assert_eq!(state.outcome, Outcome::InProgress);
        assert!(state.selection.is_empty());
        assert_eq!(state.turn_display(), "Player 1's Turn");
    }

    #[test]
    fn test_visual_mapping_is_bidirectional() {
        let state = GameState::default();
        for block in &state.blocks {
            let visual = &state.visuals[block.visual.0 as usize];
            assert_eq!(visual.block, block.id);
            assert_eq!(state.block_for_visual(visual.id).unwrap(), block.id);
        }
    }

    #[test]
    fn test_unknown_visual() {
        let state = GameState::default();
        let result = state.block_for_visual(VisualId(999));
        assert!(matches!(result, Err(GameError::UnknownVisual(VisualId(999)))));
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(Outcome::InProgress.message(), None);
        assert_eq!(
            Outcome::PlayerLost(Player::Two).message().as_deref(),
            Some("player 2 lost")
        );
        assert_eq!(Outcome::Tie.message().as_deref(), Some("Tie!"));
    }

    #[test]
    fn test_player_other() {
        assert_eq!(Player::One.other(), Player::Two);
        assert_eq!(Player::Two.other().number(), 1);
    }

    #[test]
    fn test_stabilizing_display() {
        let mut state = GameState::default();
        state.pending_switch = Some(PendingSwitch {
            requested_ms: 0.0,
            next_poll_ms: 100.0,
        });
        assert_eq!(state.turn_display(), STABILIZING_TEXT);
    }

    #[test]
    fn test_mark_load_failed() {
        let mut state = GameState::default();
        state.mark_load_failed(BlockId(4)).unwrap();

        let block = &state.blocks[4];
        assert!(block.missing);
        assert!(block.body.is_static());
        assert!(!state.visuals[4].visible);
        assert_eq!(state.physics_block_count(), BLOCK_COUNT as usize - 1);
        assert!(matches!(
            state.block_for_visual(VisualId(4)),
            Err(GameError::MissingBlock(BlockId(4)))
        ));
        assert!(matches!(
            state.mark_load_failed(BlockId(99)),
            Err(GameError::UnknownBlock(BlockId(99)))
        ));
    }

    #[test]
    fn test_removed_block_is_not_pickable() {
        let mut state = GameState::default();
        state.blocks[7].park();
        state.blocks[7].removed = true;
        assert!(matches!(
            state.block_for_visual(VisualId(7)),
            Err(GameError::RemovedBlock(BlockId(7)))
        ));
        assert_eq!(state.block_for_visual(VisualId(8)).unwrap(), BlockId(8));
    }

    #[test]
    fn test_state_serializes() {
        let state = GameState::default();
        let json = serde_json::to_string(&state).unwrap();
        let restored: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.blocks.len(), state.blocks.len());
        assert_eq!(restored.current_player, state.current_player);
    }
}
