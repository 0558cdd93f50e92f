//! Cancellable deferred callbacks (respawn, immunity, ownership expiry, gibs)
//!
//! Все отложенные переходы регистрируются в одном `Scheduler` против
//! глобального fixed clock. Re-arm того же `TimerKey` инвалидирует предыдущий
//! generation: старая запись в heap остаётся, но при срабатывании
//! распознаётся как stale и игнорируется.
//!
//! Scheduler не знает, что делать по таймеру: он только публикует
//! `TimerFired`, а реакции живут в системах соответствующих модулей.

use bevy::prelude::*;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// Что именно запланировано для subject entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Отложенный `Spawn()` игрока
    Respawn,
    /// Конец grace window после spawn
    DamageImmunity,
    /// Сброс `OwnershipRecord::held_by` после release
    OwnershipExpiry,
    /// Gib creation delay → debris + despawn пропа
    BreakApart,
    /// Cooldown записи в recently-hit set listener'а
    RecentHit(Entity),
}

/// Логический subject таймера: (entity, kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub subject: Entity,
    pub kind: TimerKind,
}

impl TimerKey {
    pub fn new(subject: Entity, kind: TimerKind) -> Self {
        Self { subject, kind }
    }
}

/// Handle, возвращаемый `arm()`
///
/// Валиден, пока никто не сделал re-arm/cancel того же key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub key: TimerKey,
    generation: u64,
}

impl TimerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Событие: таймер истёк (генерация совпала, не отменён)
///
/// Consumer проверяет `Scheduler::is_current`: re-arm или cancel того же key
/// в этом же tick делает событие stale.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub key: TimerKey,
    pub generation: u64,
}

impl TimerFired {
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            key: self.key,
            generation: self.generation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueuedTimer {
    deadline: Duration,
    // generation монотонна → детерминированный tie-break при равных deadline
    generation: u64,
    key: TimerKey,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: Duration,
    generation: u64,
}

/// Глобальный scheduler (один на World, мутируется только в FixedUpdate)
#[derive(Resource, Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_generation: u64,
    pending: HashMap<TimerKey, Pending>,
    queue: BinaryHeap<Reverse<QueuedTimer>>,
    // Сработавшие на последнем advance_to и ещё не перекрытые
    fired: HashMap<TimerKey, u64>,
}

impl Scheduler {
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Armed таймер для key через `delay_secs` секунд от текущего clock.
    ///
    /// Предыдущий pending таймер того же key инвалидируется ДО создания нового.
    pub fn arm(&mut self, key: TimerKey, delay_secs: f32) -> TimerHandle {
        self.cancel(key);

        self.next_generation += 1;
        let generation = self.next_generation;
        let deadline = self.now + seconds(delay_secs);

        self.pending.insert(key, Pending { deadline, generation });
        self.queue.push(Reverse(QueuedTimer {
            deadline,
            generation,
            key,
        }));

        TimerHandle { key, generation }
    }

    /// Отменяет pending таймер. Повторный cancel безопасен (возвращает false).
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.fired.remove(&key);
        self.pending.remove(&key).is_some()
    }

    /// Отменяет только если handle всё ещё текущий для своего key
    pub fn cancel_handle(&mut self, handle: TimerHandle) -> bool {
        if self.is_pending(handle) {
            self.pending.remove(&handle.key);
            true
        } else if self.fired.get(&handle.key) == Some(&handle.generation) {
            self.fired.remove(&handle.key);
            false
        } else {
            false
        }
    }

    /// Отменяет все pending таймеры заданного вида (round end → все respawn)
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        self.fired.retain(|key, _| key.kind != kind);
        let before = self.pending.len();
        self.pending.retain(|key, _| key.kind != kind);
        before - self.pending.len()
    }

    /// Отменяет все таймеры subject'а (entity уничтожен)
    pub fn cancel_subject(&mut self, subject: Entity) -> usize {
        self.fired.retain(|key, _| key.subject != subject);
        let before = self.pending.len();
        self.pending.retain(|key, _| key.subject != subject);
        before - self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending
            .get(&handle.key)
            .is_some_and(|pending| pending.generation == handle.generation)
    }

    /// Сработавшее событие всё ещё актуально (ни re-arm, ни cancel после него)
    pub fn is_current(&self, fired: &TimerFired) -> bool {
        self.fired.get(&fired.key) == Some(&fired.generation)
    }

    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Абсолютное время срабатывания pending таймера
    pub fn deadline(&self, key: TimerKey) -> Option<Duration> {
        self.pending.get(&key).map(|pending| pending.deadline)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Продвигает clock и возвращает сработавшие таймеры в порядке deadline.
    ///
    /// Clock монотонен: значение меньше текущего игнорируется.
    pub fn advance_to(&mut self, now: Duration) -> Vec<TimerKey> {
        self.advance(now).into_iter().map(|fired| fired.key).collect()
    }

    fn advance(&mut self, now: Duration) -> Vec<TimerFired> {
        if now > self.now {
            self.now = now;
        }

        // События прошлого tick уже прочитаны
        self.fired.clear();
        let mut fired = Vec::new();

        while let Some(Reverse(top)) = self.queue.peek().copied() {
            if top.deadline > self.now {
                break;
            }
            self.queue.pop();

            // Stale запись: key был cancel/re-arm после постановки в heap
            let current = self
                .pending
                .get(&top.key)
                .is_some_and(|pending| pending.generation == top.generation);

            if current {
                self.pending.remove(&top.key);
                self.fired.insert(top.key, top.generation);
                fired.push(TimerFired {
                    key: top.key,
                    generation: top.generation,
                });
            }
        }

        fired
    }
}

/// `f32` секунды → `Duration` (NaN/отрицательные → 0)
pub fn seconds(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

/// Система: продвинуть Scheduler до fixed clock и опубликовать `TimerFired`
pub fn tick_scheduler(
    time: Res<Time<Fixed>>,
    mut scheduler: ResMut<Scheduler>,
    mut fired_events: EventWriter<TimerFired>,
) {
    for fired in scheduler.advance(time.elapsed()) {
        fired_events.write(fired);
    }
}
