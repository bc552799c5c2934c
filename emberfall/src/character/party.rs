//! Parties: a leader plus followers sharing ally status.
//!
//! Membership drives shared targeting (a kill clears the lock-on of the
//! killer *and* every ally) and map transitions (allies who are not waiting
//! somewhere travel through portals with the leader).

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

pub type PartyId = u32;

/// Where a member was told to wait instead of following.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitingLocation {
    pub map: String,
    pub position: Vec2,
}

#[derive(Clone, Debug, Default)]
pub struct Party {
    pub leader: Option<ActorId>,
    members: HashSet<ActorId>,
    /// Members currently told to wait, by actor. Waiting members do not
    /// travel on portal traversal.
    waiting: HashMap<ActorId, WaitingLocation>,
}

impl Party {
    pub fn with_leader(leader: ActorId) -> Self {
        Self {
            leader: Some(leader),
            members: HashSet::new(),
            waiting: HashMap::new(),
        }
    }

    pub fn add_member(&mut self, member: ActorId) -> bool {
        if Some(member) == self.leader {
            return false;
        }
        self.members.insert(member)
    }

    pub fn remove_member(&mut self, member: ActorId) -> bool {
        self.waiting.remove(&member);
        self.members.remove(&member)
    }

    pub fn is_member(&self, actor: ActorId) -> bool {
        Some(actor) == self.leader || self.members.contains(&actor)
    }

    /// Everyone in the party, leader included.
    pub fn roster(&self) -> Vec<ActorId> {
        let mut all: Vec<ActorId> = self.leader.into_iter().collect();
        all.extend(self.members.iter().copied());
        all
    }

    /// Allies of `actor`: the rest of the roster.
    pub fn allies_of(&self, actor: ActorId) -> Vec<ActorId> {
        self.roster().into_iter().filter(|a| *a != actor).collect()
    }

    pub fn set_waiting(&mut self, member: ActorId, location: WaitingLocation) {
        if self.members.contains(&member) {
            self.waiting.insert(member, location);
        }
    }

    pub fn clear_waiting(&mut self, member: ActorId) {
        self.waiting.remove(&member);
    }

    pub fn waiting_location(&self, member: ActorId) -> Option<&WaitingLocation> {
        self.waiting.get(&member)
    }

    /// Members who travel with the leader (not waiting anywhere).
    pub fn traveling_members(&self) -> Vec<ActorId> {
        self.members
            .iter()
            .copied()
            .filter(|m| !self.waiting.contains_key(m))
            .collect()
    }
}

/// All live parties, owned by the scene (they outlive map swaps).
#[derive(Debug, Default)]
pub struct PartyRegistry {
    next_id: PartyId,
    parties: HashMap<PartyId, Party>,
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            parties: HashMap::new(),
        }
    }

    pub fn create(&mut self, leader: ActorId) -> PartyId {
        let id = self.next_id;
        self.next_id += 1;
        self.parties.insert(id, Party::with_leader(leader));
        id
    }

    pub fn get(&self, id: PartyId) -> Option<&Party> {
        self.parties.get(&id)
    }

    pub fn get_mut(&mut self, id: PartyId) -> Option<&mut Party> {
        self.parties.get_mut(&id)
    }

    /// Allies of an actor through its party, if it has one.
    pub fn allies_of(&self, party: Option<PartyId>, actor: ActorId) -> Vec<ActorId> {
        party
            .and_then(|id| self.parties.get(&id))
            .map(|p| p.allies_of(actor))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_and_allies() {
        let leader = ActorId::from_raw(1);
        let follower = ActorId::from_raw(2);
        let mut party = Party::with_leader(leader);
        assert!(party.add_member(follower));
        assert!(!party.add_member(leader), "leader is not a member twice");

        assert!(party.is_member(leader));
        assert!(party.is_member(follower));
        assert_eq!(party.allies_of(leader), vec![follower]);
    }

    #[test]
    fn waiting_members_do_not_travel() {
        let leader = ActorId::from_raw(1);
        let a = ActorId::from_raw(2);
        let b = ActorId::from_raw(3);
        let mut party = Party::with_leader(leader);
        party.add_member(a);
        party.add_member(b);
        party.set_waiting(
            a,
            WaitingLocation {
                map: "maps/inn.json".into(),
                position: Vec2::new(100.0, 50.0),
            },
        );

        let traveling = party.traveling_members();
        assert_eq!(traveling, vec![b]);
        assert!(party.waiting_location(a).is_some());

        party.clear_waiting(a);
        assert_eq!(party.traveling_members().len(), 2);
    }
}
