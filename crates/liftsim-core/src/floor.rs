//! One floor's hall buttons and waiting queues.
//!
//! Buttons latch: pressing an already-lit button is a no-op, and a button
//! stays lit until a car opens its doors at the floor. Waiting passengers
//! queue in insertion order per direction; boarding takes from the front.

use std::collections::VecDeque;

use log::debug;

use crate::elevator::Direction;
use crate::id::PassengerId;

/// A single floor in the building.
#[derive(Debug, Clone)]
pub struct Floor {
    number: u32,
    up_pressed: bool,
    down_pressed: bool,
    /// First-waiting-first-boarded queues, one per direction. A passenger id
    /// appears in at most one of the two.
    up_queue: VecDeque<PassengerId>,
    down_queue: VecDeque<PassengerId>,
}

impl Floor {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            up_pressed: false,
            down_pressed: false,
            up_queue: VecDeque::new(),
            down_queue: VecDeque::new(),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn button_pressed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up_pressed,
            Direction::Down => self.down_pressed,
        }
    }

    pub fn queue(&self, direction: Direction) -> &VecDeque<PassengerId> {
        match direction {
            Direction::Up => &self.up_queue,
            Direction::Down => &self.down_queue,
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.up_queue.len() + self.down_queue.len()
    }

    // -- buttons ------------------------------------------------------------

    /// Latch the hall button for `direction`. Returns whether this press
    /// newly lit the button (an already-lit button is a no-op).
    pub fn press_button(&mut self, direction: Direction) -> bool {
        let pressed = match direction {
            Direction::Up => &mut self.up_pressed,
            Direction::Down => &mut self.down_pressed,
        };
        if *pressed {
            return false;
        }
        *pressed = true;
        debug!("floor {}: {direction:?} button pressed", self.number);
        true
    }

    /// Clear the hall button for `direction` (a car opened its doors here).
    pub fn clear_button(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up_pressed = false,
            Direction::Down => self.down_pressed = false,
        }
        debug!("floor {}: {direction:?} button cleared", self.number);
    }

    // -- queues -------------------------------------------------------------

    /// Append a passenger to the back of the matching queue. Rejects an id
    /// already waiting in either queue.
    pub fn enqueue(&mut self, passenger: PassengerId, direction: Direction) -> bool {
        if self.up_queue.contains(&passenger) || self.down_queue.contains(&passenger) {
            return false;
        }
        match direction {
            Direction::Up => self.up_queue.push_back(passenger),
            Direction::Down => self.down_queue.push_back(passenger),
        }
        debug!(
            "floor {}: passenger {passenger} waiting to go {direction:?}",
            self.number
        );
        true
    }

    /// Remove a passenger from whichever queue holds it. Returns false for
    /// an id not waiting here.
    pub fn remove_waiting(&mut self, passenger: PassengerId) -> bool {
        if let Some(pos) = self.up_queue.iter().position(|p| *p == passenger) {
            self.up_queue.remove(pos);
            return true;
        }
        if let Some(pos) = self.down_queue.iter().position(|p| *p == passenger) {
            self.down_queue.remove(pos);
            return true;
        }
        false
    }
}

// ===========================================================================
// Tests
// ===========================================================================
