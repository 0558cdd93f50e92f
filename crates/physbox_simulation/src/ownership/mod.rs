//! Ownership tracker: кто последним держал/бросил проп
//!
//! `held_by`: attribution для Player×Prop урона. После release через
//! `ownership_expiry_seconds` attribution сбрасывается. Повторный захват
//! до истечения отменяет pending сброс.

use bevy::prelude::*;
use serde::Serialize;

use crate::components::tags::{Tags, TAG_HELD};
use crate::components::{LifeState, PlayerLife, PropLife};
use crate::config::{NetworkRole, PhysboxConfig};
use crate::timer::{Scheduler, TimerFired, TimerHandle, TimerKey, TimerKind};
use crate::PhysboxSet;

/// Ownership record пропа
///
/// Инвариант: не больше одного holder одновременно.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct OwnershipRecord {
    pub held_by: Option<Entity>,
    /// Проп сейчас физически в руках `held_by`
    pub in_hand: bool,
    pub expiry: Option<TimerHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    PickedUp {
        /// Тот же holder до истечения expiry: attribution не прерывалась
        regrab: bool,
    },
    AlreadyHeld,
    /// Проп в руках другого holder
    Rejected,
}

impl OwnershipRecord {
    pub fn pick_up(&mut self, holder: Entity, scheduler: &mut Scheduler) -> PickupOutcome {
        if self.in_hand {
            let second_holder = self.held_by != Some(holder);
            debug_assert!(
                !second_holder,
                "prop already held by {:?}, pickup by {:?}",
                self.held_by,
                holder
            );

            if !second_holder {
                return PickupOutcome::AlreadyHeld;
            }

            crate::logger::log_error(&format!(
                "❌ Ownership: prop already held by {:?}, pickup by {:?} ignored",
                self.held_by, holder
            ));
            return PickupOutcome::Rejected;
        }

        // Pending expiry относится к предыдущему release: новый захват его снимает
        let regrab = self.held_by == Some(holder) && self.expiry.is_some();
        self.cancel_expiry(scheduler);

        self.held_by = Some(holder);
        self.in_hand = true;

        PickupOutcome::PickedUp { regrab }
    }

    /// Arm expiry таймера; None если проп не был в руках
    pub fn release(
        &mut self,
        prop: Entity,
        scheduler: &mut Scheduler,
        expiry_secs: f32,
    ) -> Option<TimerHandle> {
        if !self.in_hand {
            return None;
        }

        self.in_hand = false;
        let handle = scheduler.arm(TimerKey::new(prop, TimerKind::OwnershipExpiry), expiry_secs);
        self.expiry = Some(handle);
        Some(handle)
    }

    /// Сброс attribution + отмена pending expiry (idempotent)
    pub fn clear(&mut self, scheduler: &mut Scheduler) {
        self.cancel_expiry(scheduler);
        self.held_by = None;
    }

    fn cancel_expiry(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.expiry.take() {
            scheduler.cancel_handle(handle);
        }
    }
}

/// Запрос: holder берёт проп
#[derive(Event, Debug, Clone, Copy)]
pub struct PickupRequested {
    pub prop: Entity,
    pub holder: Entity,
}

/// Запрос: holder бросает/отпускает то, что держит
#[derive(Event, Debug, Clone, Copy)]
pub struct ReleaseRequested {
    pub holder: Entity,
}

/// Событие: проп взят
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropPickedUp {
    pub prop: Entity,
    pub holder: Entity,
}

/// Событие: проп отпущен (expiry armed)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropReleased {
    pub prop: Entity,
    pub holder: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClearReason {
    /// `ownership_expiry_seconds` после release
    Expired,
    /// Instant elimination: брошенный проп коснулся мира
    WorldTouch,
}

/// Событие: attribution сброшена (`held_by` → None)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipCleared {
    pub prop: Entity,
    pub reason: ClearReason,
}

/// Props, которые можно держать: record + теги (для `TAG_HELD`)
pub type HeldProps<'w, 's> =
    Query<'w, 's, (&'static mut OwnershipRecord, &'static mut Tags), With<PropLife>>;

/// Отпускает `holder.held_object` (death hook, round end, throw)
///
/// Возвращает отпущенный проп. Despawned проп просто забывается.
pub fn release_held(
    holder: &mut PlayerLife,
    props: &mut HeldProps,
    scheduler: &mut Scheduler,
    expiry_secs: f32,
) -> Option<Entity> {
    let prop = holder.held_object.take()?;

    let Ok((mut record, mut tags)) = props.get_mut(prop) else {
        return None;
    };

    tags.remove(TAG_HELD);
    record.release(prop, scheduler, expiry_secs)?;
    Some(prop)
}

/// Система: обработка PickupRequested
///
/// Отказ если holder мёртв, ему запрещено поднимать, руки заняты,
/// проп уже сломан или в чужих руках.
pub fn handle_pickup_requests(
    mut requests: EventReader<PickupRequested>,
    role: Res<NetworkRole>,
    mut scheduler: ResMut<Scheduler>,
    mut holders: Query<(&mut PlayerLife, &LifeState)>,
    mut props: Query<(&mut OwnershipRecord, &mut Tags, &LifeState), With<PropLife>>,
    mut picked_up: EventWriter<PropPickedUp>,
) {
    if !role.is_authority() {
        requests.clear();
        return;
    }

    for request in requests.read() {
        let Ok((mut holder, holder_life)) = holders.get_mut(request.holder) else {
            continue;
        };

        if !holder_life.is_alive() || !holder.can_pickup || holder.held_object.is_some() {
            continue;
        }

        let Ok((mut record, mut tags, prop_life)) = props.get_mut(request.prop) else {
            continue;
        };

        // Проп в чужих руках (TAG_HELD) поднять нельзя
        if !prop_life.is_alive() || record.in_hand {
            continue;
        }

        match record.pick_up(request.holder, &mut scheduler) {
            PickupOutcome::PickedUp { regrab } => {
                tags.insert(TAG_HELD);
                holder.held_object = Some(request.prop);
                picked_up.write(PropPickedUp {
                    prop: request.prop,
                    holder: request.holder,
                });

                if regrab {
                    crate::logger::log(&format!(
                        "Ownership: {:?} re-grabbed {:?}, attribution kept",
                        request.holder, request.prop
                    ));
                }
            }
            PickupOutcome::AlreadyHeld | PickupOutcome::Rejected => {}
        }
    }
}

/// Система: обработка ReleaseRequested
pub fn handle_release_requests(
    mut requests: EventReader<ReleaseRequested>,
    role: Res<NetworkRole>,
    config: Res<PhysboxConfig>,
    mut scheduler: ResMut<Scheduler>,
    mut holders: Query<&mut PlayerLife>,
    mut props: HeldProps,
    mut released: EventWriter<PropReleased>,
) {
    if !role.is_authority() {
        requests.clear();
        return;
    }

    for request in requests.read() {
        let Ok(mut holder) = holders.get_mut(request.holder) else {
            continue;
        };

        if let Some(prop) = release_held(
            &mut holder,
            &mut props,
            &mut scheduler,
            config.ownership_expiry_seconds,
        ) {
            released.write(PropReleased {
                prop,
                holder: request.holder,
            });
        }
    }
}

/// Система: сброс attribution по `TimerKind::OwnershipExpiry`
pub fn expire_ownership(
    mut timers: EventReader<TimerFired>,
    scheduler: Res<Scheduler>,
    mut records: Query<&mut OwnershipRecord>,
    mut cleared: EventWriter<OwnershipCleared>,
) {
    for fired in timers.read() {
        if fired.key.kind != TimerKind::OwnershipExpiry || !scheduler.is_current(fired) {
            continue;
        }

        let Ok(mut record) = records.get_mut(fired.key.subject) else {
            continue;
        };

        record.expiry = None;
        if record.in_hand {
            continue;
        }

        record.held_by = None;
        cleared.write(OwnershipCleared {
            prop: fired.key.subject,
            reason: ClearReason::Expired,
        });
    }
}

/// Ownership Plugin
///
/// Порядок выполнения (Requests, после lifecycle spawn):
/// 1. expire_ownership: сброс по таймеру этого tick
/// 2. handle_pickup_requests
/// 3. handle_release_requests
pub struct OwnershipPlugin;

impl Plugin for OwnershipPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PickupRequested>()
            .add_event::<ReleaseRequested>()
            .add_event::<PropPickedUp>()
            .add_event::<PropReleased>()
            .add_event::<OwnershipCleared>();

        app.add_systems(
            FixedUpdate,
            (expire_ownership, handle_pickup_requests, handle_release_requests)
                .chain()
                // Round boundaries и Spawn() этого tick уже применены (can_pickup, held_object)
                .after(crate::lifecycle::spawn::process_spawns)
                .in_set(PhysboxSet::Requests),
        );
    }
}
