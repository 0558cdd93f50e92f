//! Drain CollisionQueue → damage handlers → life-state mutations

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier3d::prelude::AdditionalMassProperties;

use super::dispatch::{dispatch, PairHandler};
use super::formulas;
use crate::collision::{classify_entity, CollisionEvent, CollisionQueue, KindFacets, ObjectKind};
use crate::components::{
    DamageOutcome, DamageRecord, IgnoreReason, LifeState, PlayerLife, PropDefinitionId, PropLife,
};
use crate::config::{GameMode, GameRules, NetworkRole, PhysboxConfig};
use crate::lifecycle::{DamageApplied, EntityKilled, FallImpact, HitConfirmed, RoundState};
use crate::ownership::{ClearReason, OwnershipCleared, OwnershipRecord};
use crate::timer::Scheduler;

/// Writers для результата применения урона
#[derive(SystemParam)]
pub struct DamageReport<'w> {
    applied: EventWriter<'w, DamageApplied>,
    killed: EventWriter<'w, EntityKilled>,
}

impl DamageReport<'_> {
    /// Публикует события по outcome (Ignored → ничего)
    pub fn report(
        &mut self,
        victim: Entity,
        kind: ObjectKind,
        record: DamageRecord,
        outcome: DamageOutcome,
    ) {
        match outcome {
            DamageOutcome::Ignored(_) => {}
            DamageOutcome::Damaged { remaining } => {
                self.applied.write(DamageApplied {
                    victim,
                    kind,
                    record,
                    remaining,
                });
            }
            DamageOutcome::Killed => {
                self.applied.write(DamageApplied {
                    victim,
                    kind,
                    record,
                    remaining: 0,
                });
                self.killed.write(EntityKilled {
                    entity: victim,
                    kind,
                    cause: record,
                });
            }
        }
    }
}

/// Урон игроку с учётом god mode
pub fn damage_player(player: &PlayerLife, life: &mut LifeState, record: &DamageRecord) -> DamageOutcome {
    if player.god_mode {
        return DamageOutcome::Ignored(IgnoreReason::GodMode);
    }
    life.apply_damage(record)
}

/// Масса из rigid-body override (нет override → 0)
pub fn mass_override(mass: Option<&AdditionalMassProperties>) -> f32 {
    match mass {
        Some(AdditionalMassProperties::Mass(mass)) => *mass,
        Some(AdditionalMassProperties::MassProperties(props)) => props.mass,
        None => 0.0,
    }
}

/// Всё, что handler'ам нужно читать и мутировать
#[derive(SystemParam)]
pub struct CollisionResolver<'w, 's> {
    config: Res<'w, PhysboxConfig>,
    rules: Res<'w, GameRules>,
    scheduler: ResMut<'w, Scheduler>,
    facets: Query<'w, 's, KindFacets>,
    lives: Query<'w, 's, &'static mut LifeState>,
    props: Query<'w, 's, &'static PropLife>,
    players: Query<'w, 's, &'static PlayerLife>,
    ownership: Query<'w, 's, &'static mut OwnershipRecord>,
    masses: Query<'w, 's, &'static AdditionalMassProperties>,
    report: DamageReport<'w>,
    hits: EventWriter<'w, HitConfirmed>,
    falls: EventWriter<'w, FallImpact>,
    cleared: EventWriter<'w, OwnershipCleared>,
}

impl CollisionResolver<'_, '_> {
    pub fn kind_of(&self, entity: Entity) -> ObjectKind {
        classify_entity(&self.facets, entity)
    }

    fn mass_of(&self, entity: Entity) -> f32 {
        mass_override(self.masses.get(entity).ok())
    }

    fn definition_of(&self, prop: Entity) -> Option<PropDefinitionId> {
        self.props.get(prop).ok().map(|p| p.definition.id)
    }

    /// Применить урон entity с LifeState; нет LifeState (stale / статика) → None
    fn apply(&mut self, victim: Entity, kind: ObjectKind, record: DamageRecord) -> Option<DamageOutcome> {
        let Ok(mut life) = self.lives.get_mut(victim) else {
            return None;
        };

        let outcome = match self.players.get(victim) {
            Ok(player) if kind == ObjectKind::Player => damage_player(player, &mut life, &record),
            _ => life.apply_damage(&record),
        };

        self.report.report(victim, kind, record, outcome);
        Some(outcome)
    }

    /// Обработать одно событие; false → пара без handler'а
    pub fn resolve(&mut self, event: &CollisionEvent) -> bool {
        let kind_a = self.kind_of(event.a);
        let kind_b = self.kind_of(event.b);

        let Some(route) = dispatch(kind_a, kind_b) else {
            return false;
        };

        let (first, second) = route.order(event.a, event.b);

        if self.config.verbose_collision_logging {
            let (first_kind, second_kind) = route.order(kind_a, kind_b);
            crate::logger::log(&format!(
                "CollisionProcessor - event: ({:?}: {:?}, {:?}: {:?}) speed {:.1}",
                first_kind, first, second_kind, second, event.speed
            ));
        }

        match route.handler {
            PairHandler::PropWorld => self.prop_and_world(first, second, event.speed),
            PairHandler::PropProp => self.prop_and_prop(first, second, event.speed),
            PairHandler::PlayerWorld => self.player_and_world(first, event.speed),
            PairHandler::PlayerProp => self.player_and_prop(first, second, event.speed),
        }

        true
    }

    fn prop_and_world(&mut self, prop: Entity, world: Entity, speed: f32) {
        if !(speed > self.config.damage_speed_threshold) {
            return;
        }

        if self.rules.mode.is_instant_elimination() {
            // Dodgeball: проп коснулся мира → бросивший больше не владелец
            if let Ok(mut record) = self.ownership.get_mut(prop) {
                if record.held_by.is_some() {
                    record.clear(&mut self.scheduler);
                    self.cleared.write(OwnershipCleared {
                        prop,
                        reason: ClearReason::WorldTouch,
                    });
                }
            }
            return;
        }

        let damage = formulas::prop_world_damage(speed, self.config.damage_speed_threshold);
        let definition = self.definition_of(prop);

        self.apply(
            prop,
            ObjectKind::Prop,
            DamageRecord {
                attacker: None,
                victim: prop,
                prop: definition,
                amount: damage,
            },
        );

        // World mesh без LifeState (обычная геометрия) просто пропускается
        self.apply(
            world,
            ObjectKind::World,
            DamageRecord {
                attacker: None,
                victim: world,
                prop: definition,
                amount: damage,
            },
        );
    }

    fn prop_and_prop(&mut self, prop_a: Entity, prop_b: Entity, speed: f32) {
        if !(speed > self.config.damage_speed_threshold) {
            return;
        }

        let (Some(definition_a), Some(definition_b)) =
            (self.definition_of(prop_a), self.definition_of(prop_b))
        else {
            return;
        };

        let threshold = self.config.damage_speed_threshold;
        let to_b = formulas::prop_prop_damage(speed, self.mass_of(prop_a), threshold);
        let to_a = formulas::prop_prop_damage(speed, self.mass_of(prop_b), threshold);

        self.apply(
            prop_b,
            ObjectKind::Prop,
            DamageRecord {
                attacker: None,
                victim: prop_b,
                prop: Some(definition_a),
                amount: to_b,
            },
        );
        self.apply(
            prop_a,
            ObjectKind::Prop,
            DamageRecord {
                attacker: None,
                victim: prop_a,
                prop: Some(definition_b),
                amount: to_a,
            },
        );
    }

    fn player_and_world(&mut self, player: Entity, speed: f32) {
        if !self.rules.use_fall_damage {
            return;
        }
        if !(speed >= self.config.fall_speed_threshold) {
            return;
        }

        if !self.players.contains(player) {
            return;
        }

        let damage = formulas::fall_damage(speed, self.config.fall_speed_threshold);
        self.apply(
            player,
            ObjectKind::Player,
            DamageRecord::environmental(player, damage),
        );
        self.falls.write(FallImpact { player, speed });
    }

    fn player_and_prop(&mut self, victim: Entity, prop: Entity, speed: f32) {
        if !(speed > self.config.damage_speed_threshold) {
            return;
        }

        let Some(definition) = self.definition_of(prop) else {
            return;
        };

        // Нет владельца → idle проп игроков не ранит (и сам не получает урон)
        let Some(attacker) = self.ownership.get(prop).ok().and_then(|record| record.held_by) else {
            return;
        };

        let Ok(attacker_life) = self.players.get(attacker) else {
            return;
        };
        let attacker_team = attacker_life.team;
        let attacker_is_human = attacker_life.is_human();

        let Ok(victim_life) = self.players.get(victim) else {
            return;
        };
        let victim_team = victim_life.team;

        if self.lives.get(victim).is_ok_and(|life| life.damage_immune) {
            return;
        }

        if self.rules.vetoes_team_damage(attacker_team, victim_team) {
            return;
        }

        let threshold = self.config.damage_speed_threshold;
        let player_damage = match self.rules.mode {
            GameMode::Dodgeball => self.config.instant_elimination_damage,
            GameMode::Deathmatch => formulas::player_impact_damage(speed, self.mass_of(prop), threshold),
            // Tutorial: игроки не ранят друг друга, проп урон получает
            GameMode::Tutorial => 0,
        };

        let outcome = if player_damage > 0 {
            self.apply(
                victim,
                ObjectKind::Player,
                DamageRecord {
                    attacker: Some(attacker),
                    victim,
                    prop: Some(definition),
                    amount: player_damage,
                },
            )
        } else {
            None
        };

        let prop_damage = formulas::prop_impact_damage(speed, threshold);
        self.apply(
            prop,
            ObjectKind::Prop,
            DamageRecord {
                attacker: None,
                victim: prop,
                prop: Some(definition),
                amount: prop_damage,
            },
        );

        if attacker_is_human && outcome.is_some_and(|o| o.was_applied()) {
            self.hits.write(HitConfirmed {
                attacker,
                victim,
                amount: player_damage,
            });
        }
    }
}

/// Система: drain + dispatch всех collision events этого tick
///
/// Только authority. Когда раунд окончен, очередь очищается без урона.
/// События, порождённые обработкой, попадут в очередь уже на следующем tick.
pub fn drain_and_process(
    role: Res<NetworkRole>,
    round: Res<RoundState>,
    mut queue: ResMut<CollisionQueue>,
    mut resolver: CollisionResolver,
) {
    if !role.is_authority() {
        return;
    }

    if round.over {
        queue.clear();
        return;
    }

    let mut iterations = 0;
    while let Some(event) = queue.pop() {
        resolver.resolve(&event);
        iterations += 1;
    }

    if iterations > 0 && resolver.config.print_collision_iterations {
        crate::logger::log_info(&format!(
            "CollisionProcessor - processed {} events this tick",
            iterations
        ));
    }
}
