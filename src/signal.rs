//! Switches → signalers → switchables (gates), per `spec.md` §4.7.
//!
//! Grounded in `original_source/src/switch.cpp`'s `Switch`/`Signaler`/
//! `Switchable` triangle, which threads raw pointers between the three
//! (`Switch::push_signaler`, `Signaler::push_switch`,
//! `Signaler::switchables_`). Per `spec.md` §9 Design Notes this is recast
//! as plain data addressed by id: a `Signaler` holds `ObjectId`s for its
//! switches/switchables, and `SignalNetwork` owns the `Signaler`s
//! themselves by a small dense id space of their own, breaking the cyclic
//! back-references the source has no clean lifetime story for.

use crate::delta::{Delta, DeltaFrame};
use crate::object::{GateData, ObjectId, PressSwitchData};
use crate::room_map::RoomMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalerId(pub u32);

#[derive(Debug, Clone)]
pub struct Signaler {
    pub threshold: u8,
    pub count: u8,
    pub persistent: bool,
    pub active: bool,
    pub switches: Vec<ObjectId>,
    pub switchables: Vec<ObjectId>,
}

/// Owns every `Signaler` in the room by a dense id space, separate from
/// `ObjectArena`: signalers have no position and are never pushed, drawn,
/// or placed on the map, so giving them `ObjectId`s would mean every
/// `RoomMap` lookup has to account for positionless entries.
#[derive(Debug, Default)]
pub struct SignalNetwork {
    signalers: Vec<Signaler>,
}

impl SignalNetwork {
    pub fn new() -> SignalNetwork {
        SignalNetwork { signalers: Vec::new() }
    }

    pub fn insert(&mut self, threshold: u8, persistent: bool, active: bool) -> SignalerId {
        let id = SignalerId(self.signalers.len() as u32);
        self.signalers.push(Signaler {
            threshold,
            count: 0,
            persistent,
            active,
            switches: Vec::new(),
            switchables: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: SignalerId) -> &Signaler {
        &self.signalers[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SignalerId) -> &mut Signaler {
        &mut self.signalers[id.0 as usize]
    }

    /// Registers both halves of the switch↔signaler edge, mirroring
    /// `Signaler::push_switch` calling `obj->push_signaler(this)`.
    pub fn link_switch(&mut self, signaler_id: SignalerId, switch: &mut PressSwitchData) {
        self.get_mut(signaler_id).switches.push(switch.id);
        switch.signalers.push(signaler_id);
    }

    pub fn link_switchable(&mut self, signaler_id: SignalerId, switchable: ObjectId) {
        self.get_mut(signaler_id).switchables.push(switchable);
    }

    /// A switch just flipped; adjust this signaler's `count` by one.
    pub fn adjust_count(&mut self, id: SignalerId, active: bool) {
        let s = self.get_mut(id);
        if active {
            s.count += 1;
        } else {
            s.count -= 1;
        }
    }

    /// `spec.md` §4.7: `new_active = count >= threshold`; if persistently
    /// latched active, never changes; otherwise toggles on any crossing.
    pub fn should_toggle(&self, id: SignalerId) -> bool {
        let s = self.get(id);
        !(s.active && s.persistent) && ((s.count >= s.threshold) != s.active)
    }

    /// Flips `active` in place. Self-inverse, so it doubles as the
    /// `SignalerToggle` delta's revert action.
    pub fn toggle(&mut self, id: SignalerId) {
        self.get_mut(id).active = !self.get_mut(id).active;
    }

    /// Every switchable referenced by any signaler, deduplicated. Used by
    /// `MoveProcessor` Phase G to revisit waiting gates after signals settle,
    /// without needing a way to enumerate the whole arena.
    pub fn all_switchables(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let mut seen = std::collections::HashSet::new();
        self.signalers
            .iter()
            .flat_map(|s| s.switchables.iter().copied())
            .filter(move |id| seen.insert(*id))
    }
}

/// `Gate::can_set_state`: closing is always legal; opening requires the
/// cell directly above the gate to be empty.
pub fn gate_can_set_state(gate: &GateData, desired_open: bool, map: &RoomMap) -> bool {
    !desired_open || map.occupant(gate.pos.above()).is_none()
}

/// `Switchable::receive_signal`. The early return when
/// `active ^ waiting == signal` is specified as a no-op by `spec.md` §9
/// (frozen decision, see `DESIGN.md`).
pub fn gate_receive_signal(gate: &mut GateData, signal: bool, map: &RoomMap, frame: &mut DeltaFrame) {
    if (gate.active ^ gate.waiting) == signal {
        return;
    }
    frame.push(Delta::SwitchableToggle {
        id: gate.id,
        old_active: gate.active,
        old_waiting: gate.waiting,
    });
    let desired_open = gate.default ^ signal;
    gate.waiting = !gate_can_set_state(gate, desired_open, map);
    gate.active = gate.waiting ^ signal;
}

/// Re-examines a waiting gate after the rest of a move's signals have
/// settled. Returns whether it actually changed.
pub fn gate_check_waiting(gate: &mut GateData, map: &RoomMap, frame: &mut DeltaFrame) -> bool {
    if !gate.waiting {
        return false;
    }
    let desired_open = !(gate.default ^ gate.active);
    if gate_can_set_state(gate, desired_open, map) {
        frame.push(Delta::SwitchableToggle {
            id: gate.id,
            old_active: gate.active,
            old_waiting: gate.waiting,
        });
        gate.waiting = false;
        gate.active = !gate.active;
        true
    } else {
        false
    }
}

/// `PressSwitch::should_toggle`: active iff exactly one of {currently
/// active, something sits on top} holds.
pub fn press_switch_should_toggle(switch: &PressSwitchData, map: &RoomMap) -> bool {
    switch.active ^ !map.occupant(switch.pos.above()).is_none()
}
