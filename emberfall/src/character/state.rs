//! Discrete animation/behavior states.
//!
//! Exactly one state is current per character per frame. Nothing sets the
//! state directly: `Character::determine_state` derives it from the flag set
//! and the body's velocity, every frame, in a fixed priority order.

/// All character states. `key()` names the matching animation clip in a
/// character definition file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterState {
    Idle,
    IdleSheathed,
    Running,
    RunningSheathed,
    RunningStart,
    RunningStop,
    Jumping,
    DoubleJumping,
    Falling,
    GettingUpFromFall,
    Crouching,
    SheathingWeapon,
    UnsheathingWeapon,
    Attacking,
    AttackingForward,
    AttackingCrouch,
    AttackingMidair,
    AttackingMidairDownward,
    AttackingUpward,
    SpellCasting,
    Blocking,
    HitWhileBlocking,
    DodgingBackward,
    DodgingForward,
    Intro,
    Stunned,
    TakingDamage,
    TakingDamageFromTrap,
    Killed,
}

impl CharacterState {
    pub fn key(self) -> &'static str {
        use CharacterState::*;
        match self {
            Idle => "idle",
            IdleSheathed => "idle_sheathed",
            Running => "running",
            RunningSheathed => "running_sheathed",
            RunningStart => "running_start",
            RunningStop => "running_stop",
            Jumping => "jumping",
            DoubleJumping => "double_jumping",
            Falling => "falling",
            GettingUpFromFall => "getting_up_from_fall",
            Crouching => "crouching",
            SheathingWeapon => "sheathing_weapon",
            UnsheathingWeapon => "unsheathing_weapon",
            Attacking => "attacking",
            AttackingForward => "attacking_forward",
            AttackingCrouch => "attacking_crouch",
            AttackingMidair => "attacking_midair",
            AttackingMidairDownward => "attacking_midair_downward",
            AttackingUpward => "attacking_upward",
            SpellCasting => "spell_casting",
            Blocking => "blocking",
            HitWhileBlocking => "hit_while_blocking",
            DodgingBackward => "dodging_backward",
            DodgingForward => "dodging_forward",
            Intro => "intro",
            Stunned => "stunned",
            TakingDamage => "taking_damage",
            TakingDamageFromTrap => "taking_damage_from_trap",
            Killed => "killed",
        }
    }

    /// Attack variants accepted by `Character::attack`. Anything else passed
    /// as the requested state is rejected outright.
    pub fn is_attack(self) -> bool {
        use CharacterState::*;
        matches!(
            self,
            Attacking
                | AttackingForward
                | AttackingCrouch
                | AttackingMidair
                | AttackingMidairDownward
                | AttackingUpward
        )
    }

    pub fn is_dodge(self) -> bool {
        matches!(
            self,
            CharacterState::DodgingBackward | CharacterState::DodgingForward
        )
    }

    /// States whose animation must run to completion before the cascade can
    /// fall through to movement-derived states.
    pub fn is_one_shot(self) -> bool {
        use CharacterState::*;
        matches!(
            self,
            RunningStart
                | RunningStop
                | GettingUpFromFall
                | SheathingWeapon
                | UnsheathingWeapon
                | HitWhileBlocking
                | Intro
                | TakingDamage
                | TakingDamageFromTrap
                | Killed
        ) || self.is_attack()
            || self.is_dodge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_variants_are_recognized() {
        assert!(CharacterState::Attacking.is_attack());
        assert!(CharacterState::AttackingMidairDownward.is_attack());
        assert!(!CharacterState::Blocking.is_attack());
        assert!(!CharacterState::Killed.is_attack());
    }

    #[test]
    fn clip_keys_are_unique() {
        use std::collections::HashSet;
        let states = [
            CharacterState::Idle,
            CharacterState::IdleSheathed,
            CharacterState::Running,
            CharacterState::RunningSheathed,
            CharacterState::RunningStart,
            CharacterState::RunningStop,
            CharacterState::Jumping,
            CharacterState::DoubleJumping,
            CharacterState::Falling,
            CharacterState::GettingUpFromFall,
            CharacterState::Crouching,
            CharacterState::SheathingWeapon,
            CharacterState::UnsheathingWeapon,
            CharacterState::Attacking,
            CharacterState::AttackingForward,
            CharacterState::AttackingCrouch,
            CharacterState::AttackingMidair,
            CharacterState::AttackingMidairDownward,
            CharacterState::AttackingUpward,
            CharacterState::SpellCasting,
            CharacterState::Blocking,
            CharacterState::HitWhileBlocking,
            CharacterState::DodgingBackward,
            CharacterState::DodgingForward,
            CharacterState::Intro,
            CharacterState::Stunned,
            CharacterState::TakingDamage,
            CharacterState::TakingDamageFromTrap,
            CharacterState::Killed,
        ];
        let keys: HashSet<_> = states.iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), states.len());
    }
}
