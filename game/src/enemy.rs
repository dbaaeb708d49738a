use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Minion,
    Core,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyUnit {
    kind: EnemyKind,
    max_hp: f32,
    hp: f32,
}

impl EnemyUnit {
    pub fn new(kind: EnemyKind, max_hp: f32) -> Self {
        Self {
            kind,
            max_hp,
            hp: max_hp,
        }
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn hp(&self) -> f32 {
        self.hp
    }

    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    pub fn is_suppressed(&self) -> bool {
        self.hp <= 0.0
    }

    /// 0 at full health, 100 once suppressed.
    pub fn suppression_percent(&self) -> f32 {
        if self.max_hp <= 0.0 {
            return 100.0;
        }
        ((self.max_hp - self.hp) / self.max_hp).clamp(0.0, 1.0) * 100.0
    }

    fn take(&mut self, amount: f32) -> f32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        before - self.hp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub minion_hp: Vec<f32>,
    pub core_hp: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            minion_hp: vec![100.0, 100.0],
            core_hp: 200.0,
        }
    }
}

impl EnemyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for &hp in self.minion_hp.iter().chain(std::iter::once(&self.core_hp)) {
            if !hp.is_finite() {
                return Err(ConfigError::InvalidNumber {
                    field: "enemies.hp",
                    value: f64::from(hp),
                });
            }
            if hp <= 0.0 {
                return Err(ConfigError::NonPositive { field: "enemies.hp" });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageReport {
    pub target: usize,
    pub dealt: f32,
    pub suppression: f32,
    pub suppressed: bool,
    pub cleared: bool,
}

/// Minions followed by a single core. The core stays locked until every
/// minion is suppressed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyRoster {
    units: Vec<EnemyUnit>,
    target: Option<usize>,
}

impl EnemyRoster {
    pub fn new(config: &EnemyConfig) -> Self {
        let mut units: Vec<EnemyUnit> = config
            .minion_hp
            .iter()
            .map(|&hp| EnemyUnit::new(EnemyKind::Minion, hp))
            .collect();
        units.push(EnemyUnit::new(EnemyKind::Core, config.core_hp));
        let mut roster = Self {
            units,
            target: None,
        };
        roster.target = roster.next_target();
        roster
    }

    pub fn units(&self) -> &[EnemyUnit] {
        &self.units
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn is_cleared(&self) -> bool {
        self.units.iter().all(EnemyUnit::is_suppressed)
    }

    fn core_index(&self) -> usize {
        self.units.len() - 1
    }

    fn minions_remaining(&self) -> bool {
        self.units[..self.core_index()]
            .iter()
            .any(|unit| !unit.is_suppressed())
    }

    pub fn is_targetable(&self, index: usize) -> bool {
        match self.units.get(index) {
            None => false,
            Some(unit) if unit.is_suppressed() => false,
            Some(unit) => unit.kind == EnemyKind::Minion || !self.minions_remaining(),
        }
    }

    /// Returns `false` (and keeps the current target) if the unit cannot be
    /// targeted.
    pub fn select_target(&mut self, index: usize) -> bool {
        if !self.is_targetable(index) {
            return false;
        }
        self.target = Some(index);
        true
    }

    fn next_target(&self) -> Option<usize> {
        (0..self.units.len()).find(|&i| self.is_targetable(i))
    }

    /// Damages the current target, retargeting once it is suppressed.
    /// `None` when nothing is left to hit.
    pub fn apply_damage(&mut self, amount: f32) -> Option<DamageReport> {
        let target = self.target?;
        let unit = &mut self.units[target];
        let dealt = unit.take(amount);
        let suppressed = unit.is_suppressed();
        let suppression = unit.suppression_percent();

        if suppressed {
            info!(target, kind = ?unit.kind, "enemy suppressed");
            self.target = self.next_target();
        }
        let cleared = self.is_cleared();
        if suppressed && cleared {
            info!("all enemies suppressed");
        }
        Some(DamageReport {
            target,
            dealt,
            suppression,
            suppressed,
            cleared,
        })
    }

    pub fn reset(&mut self) {
        for unit in &mut self.units {
            unit.hp = unit.max_hp;
        }
        self.target = self.next_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_percent_tracks_lost_health() {
        let mut unit = EnemyUnit::new(EnemyKind::Minion, 200.0);
        assert_eq!(unit.suppression_percent(), 0.0);
        unit.take(50.0);
        assert_eq!(unit.suppression_percent(), 25.0);
        unit.take(500.0);
        assert_eq!(unit.suppression_percent(), 100.0);
    }

    #[test]
    fn core_locked_until_minions_fall() {
        let mut roster = EnemyRoster::new(&EnemyConfig::default());
        assert_eq!(roster.target(), Some(0));
        assert!(!roster.select_target(2));
        assert!(roster.select_target(1));

        let report = roster.apply_damage(150.0).expect("target");
        assert_eq!(report.dealt, 100.0);
        assert!(report.suppressed);
        assert_eq!(roster.target(), Some(0));

        roster.apply_damage(100.0);
        assert_eq!(roster.target(), Some(2));
        let last = roster.apply_damage(200.0).expect("core");
        assert!(last.cleared);
        assert!(roster.is_cleared());
        assert_eq!(roster.apply_damage(10.0), None);

        roster.reset();
        assert_eq!(roster.target(), Some(0));
    }

    #[test]
    fn config_rejects_non_positive_hp() {
        let config = EnemyConfig {
            core_hp: 0.0,
            ..EnemyConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NonPositive { .. })));
    }
}
