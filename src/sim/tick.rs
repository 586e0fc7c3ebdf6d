//! Per-frame update loop
//!
//! One owner drives everything, in a fixed order each frame:
//! queued pointer input, physics step, visual sync, game-over evaluation,
//! then the pending turn-switch rest poll.

use glam::Vec2;

use super::camera::Camera;
use super::physics::PhysicsWorld;
use super::rest::all_at_rest;
use super::state::{
    BlockId, Body, GameEvent, GameState, Interaction, Outcome, PendingSwitch, VisualId,
};

/// Pointer input delivered by the host, queued until the next frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed at `pos` (client pixels). `target` is the pick result.
    PointerDown { pos: Vec2, target: Option<VisualId> },
    /// Pointer moved to `pos` (client pixels)
    PointerMove { pos: Vec2 },
}

/// Advance the game by one frame
pub fn tick(
    state: &mut GameState,
    world: &mut dyn PhysicsWorld,
    camera: &Camera,
    inputs: &[InputEvent],
    now_ms: f64,
) {
    state.now_ms = now_ms;

    for input in inputs {
        match *input {
            InputEvent::PointerDown { pos, target } => pointer_down(state, pos, target),
            InputEvent::PointerMove { pos } => pointer_move(state, camera, pos),
        }
    }

    step_physics(state, world);
    state.sync_visuals();
    evaluate_game_over(state);
    poll_turn_switch(state);
}

/// Step every block body through the physics world
fn step_physics(state: &mut GameState, world: &mut dyn PhysicsWorld) {
    let mut bodies: Vec<Body> = state.blocks.iter().map(|b| b.body).collect();
    world.step(&mut bodies, state.settings.physics_dt);
    for (block, body) in state.blocks.iter_mut().zip(bodies) {
        block.body = body;
    }
}

/// Pointer pressed: release the grabbed block, or try to grab the target
pub fn pointer_down(state: &mut GameState, pos: Vec2, target: Option<VisualId>) {
    if !state.interaction_enabled {
        return;
    }
    state.last_pointer = pos;

    if let Interaction::Grabbed { block } = state.interaction {
        release(state, block);
        return;
    }

    if state.pending_switch.is_some() {
        log::debug!("Ignoring pointer down while blocks settle");
        return;
    }

    let Some(visual) = target else {
        return;
    };
    let id = match state.block_for_visual(visual) {
        Ok(id) => id,
        Err(e) => {
            log::debug!("Ignoring pick: {}", e);
            return;
        }
    };

    // A move sticks to one block until that block is out of the tower
    match state.current_block {
        None => {
            state.current_block = Some(id);
            state.can_switch = true;
        }
        Some(current) if state.is_outside(current) => {
            state.current_block = Some(id);
            state.can_switch = true;
        }
        Some(current) if current == id => {}
        Some(current) => {
            log::debug!(
                "Block {} must leave the tower before block {} can be touched",
                current.0,
                id.0
            );
            return;
        }
    }

    state.interaction = Interaction::Grabbed { block: id };
    state.selection.insert(id);
    if let Ok(block) = state.block_mut(id) {
        block.body.halt();
        block.body.held = true;
    }
    log::debug!("Player {} grabbed block {}", state.current_player.number(), id.0);
}

/// Pointer moved: slide the grabbed block across the ground plane
pub fn pointer_move(state: &mut GameState, camera: &Camera, pos: Vec2) {
    if !state.interaction_enabled {
        return;
    }
    let delta = pos - state.last_pointer;
    state.last_pointer = pos;

    let Some(id) = state.grabbed() else {
        return;
    };
    let movement = camera.drag_movement(delta, state.settings.drag_sensitivity);

    let Ok(block) = state.block_mut(id) else {
        return;
    };
    block.body.position.x += movement.x;
    block.body.position.z += movement.z;
    let position = block.body.position;
    let visual = block.visual;

    if let Some(v) = state.visuals.get_mut(visual.0 as usize) {
        v.position = position;
    }
}

/// Let go of the grabbed block. Taking it fully out of the tower ends the move.
fn release(state: &mut GameState, id: BlockId) {
    state.interaction = Interaction::Idle;
    if let Ok(block) = state.block_mut(id) {
        block.body.held = false;
    }

    if !(state.can_switch && state.is_outside(id)) {
        return;
    }

    let visual = match state.block_mut(id) {
        Ok(block) => {
            block.park();
            block.removed = true;
            block.visual
        }
        Err(e) => {
            log::warn!("Release of unknown block: {}", e);
            return;
        }
    };
    if let Some(v) = state.visuals.get_mut(visual.0 as usize) {
        v.visible = false;
        v.position = crate::consts::PARKING_POSITION;
    }

    state.can_switch = false;
    log::info!("Player {} removed block {}", state.current_player.number(), id.0);
    state.events.push(GameEvent::BlockRemoved {
        block: id,
        by: state.current_player,
    });
    request_turn_switch(state);
}

/// Queue a turn switch; it completes once the touched blocks settle
fn request_turn_switch(state: &mut GameState) {
    state.pending_switch = Some(PendingSwitch {
        requested_ms: state.now_ms,
        next_poll_ms: state.now_ms + state.settings.rest_poll_interval_ms,
    });
    state.events.push(GameEvent::Stabilizing);
}

/// Rest poll for a pending turn switch (one-shot: cleared when it fires)
pub fn poll_turn_switch(state: &mut GameState) {
    let Some(pending) = state.pending_switch else {
        return;
    };
    if state.now_ms < pending.next_poll_ms {
        return;
    }

    if all_at_rest(&state.blocks, &state.selection, state.settings.rest_threshold) {
        switch_player(state);
        return;
    }

    if let Some(timeout) = state.settings.rest_timeout_ms {
        if state.now_ms - pending.requested_ms >= timeout {
            log::warn!("Blocks still moving after {:.0} ms, forcing turn switch", timeout);
            switch_player(state);
            return;
        }
    }

    state.pending_switch = Some(PendingSwitch {
        next_poll_ms: state.now_ms + state.settings.rest_poll_interval_ms,
        ..pending
    });
}

fn switch_player(state: &mut GameState) {
    state.pending_switch = None;
    state.current_player = state.current_player.other();
    log::info!("{}", state.turn_display());
    state.events.push(GameEvent::TurnChanged {
        player: state.current_player,
    });
}

/// Decide whether the game is over. No-op once an outcome is set.
///
/// Tie is checked first: every loaded block has been selected. Otherwise the
/// current player loses if any untouched block, other than the grabbed one,
/// has left the tower. The first such block in creation order decides.
pub fn evaluate_game_over(state: &mut GameState) {
    if state.outcome.is_terminal() {
        return;
    }

    let present = state.physics_block_count();
    let selected = state
        .selection
        .iter()
        .filter(|id| state.block(**id).map(|b| !b.missing).unwrap_or(false))
        .count();
    if present != 0 && selected == present {
        finish(state, Outcome::Tie);
        return;
    }

    let grabbed = state.grabbed();
    let fallen = state.blocks.iter().find(|b| {
        !b.missing
            && Some(b.id) != grabbed
            && !state.selection.contains(&b.id)
            && state
                .bounds
                .is_outside(b.body.position, state.settings.bounds_footprint)
    });

    if let Some(block) = fallen {
        log::info!("Block {} has fallen out of the tower", block.id.0);
        let loser = state.current_player;
        finish(state, Outcome::PlayerLost(loser));
    }
}

/// Enter a terminal outcome and freeze interaction
fn finish(state: &mut GameState, outcome: Outcome) {
    if let Some(id) = state.grabbed() {
        if let Ok(block) = state.block_mut(id) {
            block.body.held = false;
        }
    }
    state.outcome = outcome;
    state.interaction_enabled = false;
    state.interaction = Interaction::Idle;
    state.pending_switch = None;

    let message = outcome.message().unwrap_or_default();
    log::info!("Game over: {}", message);
    state.events.push(GameEvent::GameOver { outcome, message });
}
