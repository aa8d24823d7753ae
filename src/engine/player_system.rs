use super::utils::player_step;
use super::*;

impl GameEngine {
    /// A pending turn is taken as soon as the tile in that direction is open; a
    /// blocked turn stays buffered.
    pub(super) fn resolve_intent(&mut self) {
        let desired = self.player.desired_dir;
        if desired == Direction::None {
            return;
        }
        if desired == self.player.view.dir {
            self.player.desired_dir = Direction::None;
            return;
        }
        if player_step(&self.world, self.player_pos(), desired).is_some() {
            self.player.view.dir = desired;
            self.player.desired_dir = Direction::None;
        }
    }

    pub(super) fn move_player(&mut self) {
        if let Some(next) = player_step(&self.world, self.player_pos(), self.player.view.dir) {
            self.player.view.x = next.x;
            self.player.view.y = next.y;
        }
    }

    pub(super) fn apply_player_pickups(&mut self) {
        let pos = self.player_pos();

        if self
            .bonus
            .as_ref()
            .is_some_and(|bonus| bonus.x == pos.x && bonus.y == pos.y)
        {
            if let Some(bonus) = self.bonus.take() {
                self.apply_bonus_effect(bonus.effect);
            }
        }

        match self.world.take_collectible(pos) {
            Some(CollectibleKind::Pellet) => {
                self.player.view.score += PELLET_POINTS;
                self.events.push(RuntimeEvent::PelletEaten { x: pos.x, y: pos.y });
            }
            Some(CollectibleKind::PowerPellet) => {
                self.player.view.score += PELLET_POINTS + POWER_PELLET_BONUS;
                self.events
                    .push(RuntimeEvent::PowerPelletEaten { x: pos.x, y: pos.y });
                self.activate_power_mode();
            }
            None => {}
        }
    }

    /// Re-activation restarts the countdown; there is only ever one pending expiry.
    pub(super) fn activate_power_mode(&mut self) {
        let until = self.elapsed_ms.saturating_add(self.config.power_duration_ms);
        self.power_until = Some(until);
        self.set_power_mode(true);
        self.timers.reschedule(until, DeferredAction::PowerExpiry);
        tracing::debug!(until, "Power mode active");
    }

    pub(super) fn end_power_mode(&mut self) {
        self.power_until = None;
        self.set_power_mode(false);
        self.events.push(RuntimeEvent::PowerModeEnded);
    }

    fn apply_bonus_effect(&mut self, effect: BonusEffect) {
        match effect {
            BonusEffect::ExtraLife => {
                self.player.view.lives = (self.player.view.lives + 1).min(MAX_LIVES);
            }
            BonusEffect::SlowGhosts => {
                let until = self.elapsed_ms.saturating_add(self.config.slow_duration_ms);
                self.slow_until = Some(until);
                self.timers.reschedule(until, DeferredAction::SlowExpiry);
            }
        }
        tracing::debug!(?effect, "Bonus collected");
        self.events.push(RuntimeEvent::BonusCollected { effect });
    }

    pub(super) fn end_slow_effect(&mut self) {
        self.slow_until = None;
        self.events.push(RuntimeEvent::SlowEffectEnded);
    }

    /// Drops a cherry on a random reachable tile that holds nothing and is not
    /// under the player. At most one is ever on the board.
    pub(super) fn spawn_bonus(&mut self) {
        if self.bonus.is_some() {
            return;
        }
        let player_pos = self.player_pos();
        let candidates: Vec<Vec2> = self
            .world
            .reachable
            .iter()
            .copied()
            .filter(|pos| *pos != player_pos && !self.world.collectibles.contains_key(pos))
            .collect();
        if candidates.is_empty() {
            return;
        }
        let pos = candidates[self.rng.pick_index(candidates.len())];
        let effect = if self.rng.bool(0.5) {
            BonusEffect::ExtraLife
        } else {
            BonusEffect::SlowGhosts
        };
        let bonus = BonusView {
            x: pos.x,
            y: pos.y,
            effect,
            spawned_at: self.elapsed_ms,
        };
        tracing::debug!(x = pos.x, y = pos.y, ?effect, "Bonus spawned");
        self.events.push(RuntimeEvent::BonusSpawned {
            bonus: bonus.clone(),
        });
        self.bonus = Some(bonus);
    }
}
