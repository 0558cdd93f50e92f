//! Lifecycle integration test
//!
//! Spawn / death hooks / debris / ownership expiry / round boundaries
//! через полный SimulationPlugin, headless, фиксированный шаг 60Hz.

use bevy::prelude::*;
use physbox_simulation::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn create_physbox_app(config: ConfigFile) -> App {
    let mut app = create_headless_app(42);
    app.add_plugins(SimulationPlugin::new(config, NetworkRole::Host));
    app
}

fn spawn_test_player(app: &mut App, life: PlayerLife) -> (Entity, Entity) {
    let world = app.world_mut();
    let ids = {
        let mut commands = world.commands();
        spawn_player(&mut commands, life)
    };
    world.flush();
    ids
}

fn spawn_prop(app: &mut App, definition: PropDefinition) -> Entity {
    app.world_mut()
        .spawn((prop_bundle(definition), Transform::from_xyz(0.0, 1.0, 0.0)))
        .id()
}

fn tick(app: &mut App) {
    run_for(app, 1.0 / 60.0);
}

fn collect<E: Event + Clone>(app: &App) -> Vec<E> {
    let events = app.world().resource::<Events<E>>();
    events.get_cursor().read(events).cloned().collect()
}

fn life(app: &App, entity: Entity) -> &LifeState {
    app.world().get::<LifeState>(entity).unwrap()
}

fn kill(app: &mut App, player: Entity) {
    app.world_mut().send_event(SuicideRequested { player });
    tick(app);
}

fn debris_transforms(app: &mut App) -> Vec<Vec3> {
    let world = app.world_mut();
    let mut query = world.query_filtered::<&Transform, With<Debris>>();
    let mut positions: Vec<Vec3> = query.iter(world).map(|t| t.translation).collect();
    positions.sort_by(|a, b| a.x.total_cmp(&b.x));
    positions
}

#[test]
fn test_suicide_runs_player_death_hooks() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (player, hitbox) = spawn_test_player(&mut app, PlayerLife::bot("bot"));
    app.world_mut().entity_mut(player).insert(BotTasks {
        pickup_attempts_remaining: 0,
        ..Default::default()
    });

    kill(&mut app, player);

    assert!(!life(&app, player).is_alive());
    assert!(app.world().get::<Dead>(player).is_some());
    assert!(!app.world().get::<CollisionListener>(hitbox).unwrap().enabled);
    assert_eq!(
        app.world().get::<BotTasks>(player).unwrap().pickup_attempts_remaining,
        3
    );

    let died = collect::<PlayerDied>(&app);
    assert_eq!(died.len(), 1);
    assert!(died[0].cause.is_suicide());
    assert_eq!(died[0].cause.amount, 9999);

    // Ragdoll placeholder живёт 8s
    let world = app.world_mut();
    assert_eq!(world.query::<&Ragdoll>().iter(world).count(), 1);
    run_for(&mut app, 8.1);
    let world = app.world_mut();
    assert_eq!(world.query::<&Ragdoll>().iter(world).count(), 0);
}

#[test]
fn test_second_respawn_request_supersedes_first() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (player, hitbox) = spawn_test_player(&mut app, PlayerLife::new("p"));
    kill(&mut app, player);

    app.world_mut().send_event(RespawnRequested { player });
    run_for(&mut app, 1.0);
    app.world_mut().send_event(RespawnRequested { player });

    // Первый таймер (3s) уже истёк бы
    run_for(&mut app, 2.5);
    assert!(collect::<PlayerSpawned>(&app).is_empty());
    assert!(!life(&app, player).is_alive());

    run_for(&mut app, 1.0);
    assert_eq!(collect::<PlayerSpawned>(&app).len(), 1);

    let state = life(&app, player);
    assert_eq!(state.health, 100);
    assert!(state.damage_immune);
    assert!(app.world().get::<Dead>(player).is_none());
    assert!(app.world().get::<CollisionListener>(hitbox).unwrap().enabled);

    run_for(&mut app, 5.0);
    assert_eq!(collect::<PlayerSpawned>(&app).len(), 1);
}

#[test]
fn test_spawn_immunity_expires() {
    let mut app = create_physbox_app(ConfigFile::default());
    let ground = app.world_mut().spawn(world_geometry_bundle()).id();
    let (player, _) = spawn_test_player(&mut app, PlayerLife::new("p"));

    app.world_mut().send_event(SpawnRequested { entity: player });
    tick(&mut app);
    assert!(life(&app, player).damage_immune);

    // Падение во время grace window: cue есть, урона нет
    app.world_mut().send_event(LandingReport {
        player,
        ground,
        fall_distance: 400.0,
        impact_speed: 600.0,
    });
    tick(&mut app);
    assert_eq!(life(&app, player).health, 100);
    assert_eq!(collect::<FallImpact>(&app).len(), 1);

    run_for(&mut app, 3.1);
    assert!(!life(&app, player).damage_immune);
}

#[test]
fn test_prop_breaks_into_debris() {
    let mut app = create_physbox_app(ConfigFile::default());
    let wall = app.world_mut().spawn(world_geometry_bundle()).id();
    let prop = spawn_prop(&mut app, PropDefinition::new(7, "crate", 50.0, 10).with_gibs(4));
    run_for(&mut app, 1.1);

    app.world_mut().send_event(ContactReport {
        listener: prop,
        other: wall,
        closing_speed: 300.0,
    });
    tick(&mut app);

    assert!(!life(&app, prop).is_alive());
    assert!(app.world().get::<Dead>(prop).is_some());

    // Gib delay 0.15s
    run_for(&mut app, 0.05);
    assert!(app.world().get_entity(prop).is_ok());

    run_for(&mut app, 0.2);
    assert!(app.world().get_entity(prop).is_err());

    let broken = collect::<PropBroken>(&app);
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].definition, PropDefinitionId(7));
    assert_eq!(broken[0].debris, 4);
    assert_eq!(debris_transforms(&mut app).len(), 4);

    run_for(&mut app, 3.1);
    assert!(debris_transforms(&mut app).is_empty());
}

#[test]
fn test_prop_broken_in_hand_frees_holder() {
    let mut app = create_physbox_app(ConfigFile::default());
    let wall = app.world_mut().spawn(world_geometry_bundle()).id();
    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("holder"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "vase", 5.0, 5));
    run_for(&mut app, 1.1);

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    assert_eq!(app.world().get::<PlayerLife>(holder).unwrap().held_object, Some(prop));

    // Held проп всё ещё слушает мир
    app.world_mut().send_event(ContactReport {
        listener: prop,
        other: wall,
        closing_speed: 300.0,
    });
    run_for(&mut app, 0.3);

    assert!(app.world().get_entity(prop).is_err());
    assert_eq!(app.world().get::<PlayerLife>(holder).unwrap().held_object, None);
}

#[test]
fn test_world_mesh_destroyed() {
    let mut app = create_physbox_app(ConfigFile::default());
    let window = app.world_mut().spawn(world_mesh_bundle("window", 10)).id();
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "brick", 50.0, 100));
    run_for(&mut app, 1.1);

    app.world_mut().send_event(ContactReport {
        listener: prop,
        other: window,
        closing_speed: 300.0,
    });
    tick(&mut app);

    assert!(app.world().get_entity(window).is_err());
    assert_eq!(
        collect::<WorldMeshDestroyed>(&app),
        vec![WorldMeshDestroyed {
            entity: window,
            name: "window".to_string(),
        }]
    );
    assert_eq!(life(&app, prop).health, 85);
}

#[test]
fn test_ownership_expires_after_release() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("thrower"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "ball", 1.0, 100));

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    app.world_mut().send_event(ReleaseRequested { holder });
    tick(&mut app);

    let record = app.world().get::<OwnershipRecord>(prop).unwrap();
    assert_eq!(record.held_by, Some(holder));
    assert!(!record.in_hand);
    assert!(!app.world().get::<Tags>(prop).unwrap().contains(TAG_HELD));
    assert_eq!(collect::<PropReleased>(&app).len(), 1);

    run_for(&mut app, 4.5);
    assert_eq!(
        app.world().get::<OwnershipRecord>(prop).unwrap().held_by,
        Some(holder)
    );

    run_for(&mut app, 0.6);
    assert_eq!(app.world().get::<OwnershipRecord>(prop).unwrap().held_by, None);
}

#[test]
fn test_regrab_keeps_attribution() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("juggler"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "ball", 1.0, 100));

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    app.world_mut().send_event(ReleaseRequested { holder });
    run_for(&mut app, 2.0);

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    app.world_mut().send_event(ReleaseRequested { holder });

    // Первый expiry отменён, второй ещё не наступил
    run_for(&mut app, 4.0);
    assert_eq!(
        app.world().get::<OwnershipRecord>(prop).unwrap().held_by,
        Some(holder)
    );

    run_for(&mut app, 1.2);
    assert_eq!(app.world().get::<OwnershipRecord>(prop).unwrap().held_by, None);
}

#[test]
fn test_pickup_refused_for_dead_holder() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("ghost"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "ball", 1.0, 100));
    kill(&mut app, holder);

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);

    assert_eq!(app.world().get::<OwnershipRecord>(prop).unwrap().held_by, None);
    assert!(collect::<PropPickedUp>(&app).is_empty());
}

#[test]
fn test_round_end_cancels_respawns_and_drops_props() {
    let mut app = create_physbox_app(ConfigFile::default());
    let wall = app.world_mut().spawn(world_geometry_bundle()).id();
    let (dead, _) = spawn_test_player(&mut app, PlayerLife::new("dead"));
    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("holder"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "crate", 50.0, 100));
    run_for(&mut app, 1.1);

    kill(&mut app, dead);
    app.world_mut().send_event(RespawnRequested { player: dead });
    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);

    app.world_mut().send_event(RoundEnded);
    tick(&mut app);

    assert!(app.world().resource::<RoundState>().over);
    let holder_life = app.world().get::<PlayerLife>(holder).unwrap();
    assert!(!holder_life.can_pickup);
    assert_eq!(holder_life.held_object, None);

    // Attribution на границе раунда не сбрасывается
    let record = app.world().get::<OwnershipRecord>(prop).unwrap();
    assert!(!record.in_hand);
    assert_eq!(record.held_by, Some(holder));

    // Урон после конца раунда не наносится
    app.world_mut().send_event(ContactReport {
        listener: prop,
        other: wall,
        closing_speed: 900.0,
    });
    run_for(&mut app, 4.0);

    assert!(collect::<PlayerSpawned>(&app).is_empty());
    assert!(!life(&app, dead).is_alive());
    assert_eq!(life(&app, prop).health, 100);

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    assert_eq!(collect::<PropPickedUp>(&app).len(), 1);
}

#[test]
fn test_round_start_spawns_team_players() {
    let config = ConfigFile {
        rules: GameRules {
            use_teams: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut app = create_physbox_app(config);
    let (red, _) = spawn_test_player(&mut app, PlayerLife::new("red").with_team(Team::Red));
    let (spectator, _) = spawn_test_player(&mut app, PlayerLife::new("spectator"));
    kill(&mut app, red);
    kill(&mut app, spectator);

    app.world_mut().send_event(RoundEnded);
    tick(&mut app);
    app.world_mut().send_event(RoundStarted);
    tick(&mut app);

    let round = app.world().resource::<RoundState>();
    assert!(!round.over);
    assert_eq!(round.rounds_played, 1);

    assert_eq!(collect::<PlayerSpawned>(&app), vec![PlayerSpawned { player: red }]);
    assert!(life(&app, red).is_alive());
    assert!(!life(&app, spectator).is_alive());
    assert!(app.world().get::<PlayerLife>(spectator).unwrap().can_pickup);
}

#[test]
fn test_respawn_on_expiry_tick_keeps_new_grace_window() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (player, _) = spawn_test_player(&mut app, PlayerLife::new("p"));
    app.world_mut().send_event(SpawnRequested { entity: player });
    tick(&mut app);

    // Доходим до tick, на котором истекает старый grace window
    let key = TimerKey::new(player, TimerKind::DamageImmunity);
    let dt = Duration::from_secs_f64(1.0 / 60.0);
    loop {
        let scheduler = app.world().resource::<Scheduler>();
        let deadline = scheduler.deadline(key).unwrap();
        if deadline <= scheduler.now() + dt {
            break;
        }
        tick(&mut app);
    }

    app.world_mut().send_event(SpawnRequested { entity: player });
    tick(&mut app);

    assert!(app.world().resource::<Scheduler>().is_armed(key));
    assert!(life(&app, player).damage_immune);

    run_for(&mut app, 3.1);
    assert!(!life(&app, player).damage_immune);
}

#[test]
fn test_spawn_releases_held_prop() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (alice, _) = spawn_test_player(&mut app, PlayerLife::new("alice"));
    let (bob, _) = spawn_test_player(&mut app, PlayerLife::new("bob"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "ball", 1.0, 100));

    app.world_mut().send_event(PickupRequested { prop, holder: alice });
    tick(&mut app);
    app.world_mut().send_event(SpawnRequested { entity: alice });
    tick(&mut app);

    assert_eq!(app.world().get::<PlayerLife>(alice).unwrap().held_object, None);
    let record = app.world().get::<OwnershipRecord>(prop).unwrap();
    assert!(!record.in_hand);
    assert_eq!(record.held_by, Some(alice));
    assert!(!app.world().get::<Tags>(prop).unwrap().contains(TAG_HELD));
    assert_eq!(
        collect::<PropReleased>(&app),
        vec![PropReleased { prop, holder: alice }]
    );

    app.world_mut().send_event(PickupRequested { prop, holder: bob });
    tick(&mut app);
    assert_eq!(app.world().get::<PlayerLife>(bob).unwrap().held_object, Some(prop));
    assert_eq!(app.world().get::<OwnershipRecord>(prop).unwrap().held_by, Some(bob));
}

#[test]
fn test_round_start_cancels_respawn_and_clears_queue() {
    let mut app = create_physbox_app(ConfigFile::default());
    let wall = app.world_mut().spawn(world_geometry_bundle()).id();
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "crate", 50.0, 100));
    let (player, _) = spawn_test_player(&mut app, PlayerLife::new("p"));

    kill(&mut app, player);
    app.world_mut().send_event(RespawnRequested { player });
    tick(&mut app);
    run_for(&mut app, 1.1);

    app.world_mut()
        .resource_mut::<CollisionQueue>()
        .register(prop, wall, 900.0);
    app.world_mut().send_event(RoundStarted);
    tick(&mut app);

    assert!(app.world().resource::<CollisionQueue>().is_empty());
    assert_eq!(life(&app, prop).health, 100);
    assert_eq!(collect::<PlayerSpawned>(&app).len(), 1);
    assert!(life(&app, player).is_alive());
    assert!(!app
        .world()
        .resource::<Scheduler>()
        .is_armed(TimerKey::new(player, TimerKind::Respawn)));

    // Старый deadline respawn'а прошёл: второго Spawn() нет
    run_for(&mut app, 3.0);
    assert_eq!(collect::<PlayerSpawned>(&app).len(), 1);
}

#[test]
fn test_flush_events_drops_old_events() {
    let mut app = create_physbox_app(ConfigFile::default());
    let (player, _) = spawn_test_player(&mut app, PlayerLife::new("p"));
    app.world_mut().send_event(SpawnRequested { entity: player });
    tick(&mut app);
    assert_eq!(collect::<PlayerSpawned>(&app).len(), 1);

    flush_events(&mut app);
    flush_events(&mut app);
    assert!(collect::<PlayerSpawned>(&app).is_empty());
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<LifecycleBroadcast>>>);

impl Broadcaster for Recorder {
    fn broadcast(&self, message: &LifecycleBroadcast) {
        self.0.lock().unwrap().push(message.clone());
    }
}

#[test]
fn test_lifecycle_events_are_broadcast() {
    let mut app = create_physbox_app(ConfigFile::default());
    let recorder = Recorder::default();
    app.insert_resource(BroadcastSink::new(Box::new(recorder.clone())));

    let (player, _) = spawn_test_player(&mut app, PlayerLife::new("p"));
    kill(&mut app, player);
    app.world_mut().send_event(SpawnRequested { entity: player });
    tick(&mut app);

    let sent = recorder.0.lock().unwrap();
    let id = player.to_bits();
    assert_eq!(
        *sent,
        vec![
            LifecycleBroadcast::Damaged {
                victim: id,
                kind: ObjectKind::Player,
                amount: 9999,
                remaining: 0,
            },
            LifecycleBroadcast::PlayerDied {
                player: id,
                attacker: Some(id),
                suicide: true,
            },
            LifecycleBroadcast::PlayerSpawned { player: id },
        ]
    );
}

#[test]
fn test_debris_scatter_is_deterministic() {
    fn break_crate(seed: u64) -> Vec<Vec3> {
        let mut app = create_headless_app(seed);
        app.add_plugins(SimulationPlugin::default());
        let wall = app.world_mut().spawn(world_geometry_bundle()).id();
        let prop = spawn_prop(&mut app, PropDefinition::new(1, "crate", 50.0, 10).with_gibs(6));
        run_for(&mut app, 1.1);

        app.world_mut().send_event(ContactReport {
            listener: prop,
            other: wall,
            closing_speed: 300.0,
        });
        run_for(&mut app, 0.3);
        debris_transforms(&mut app)
    }

    let first = break_crate(42);
    assert_eq!(first.len(), 6);
    assert_eq!(first, break_crate(42));
    assert_ne!(first, break_crate(7));
}

#[test]
fn test_ownership_changes_are_broadcast() {
    let mut app = create_physbox_app(ConfigFile::default());
    let recorder = Recorder::default();
    app.insert_resource(BroadcastSink::new(Box::new(recorder.clone())));

    let (holder, _) = spawn_test_player(&mut app, PlayerLife::new("thrower"));
    let prop = spawn_prop(&mut app, PropDefinition::new(1, "ball", 1.0, 100));

    app.world_mut().send_event(PickupRequested { prop, holder });
    tick(&mut app);
    app.world_mut().send_event(ReleaseRequested { holder });
    tick(&mut app);

    let prop_id = prop.to_bits();
    let holder_id = holder.to_bits();
    let held = LifecycleBroadcast::PropHeld {
        prop: prop_id,
        holder: holder_id,
    };
    let released = LifecycleBroadcast::PropReleased {
        prop: prop_id,
        holder: holder_id,
    };
    assert_eq!(*recorder.0.lock().unwrap(), vec![held.clone(), released.clone()]);

    run_for(&mut app, 5.1);
    assert_eq!(app.world().get::<OwnershipRecord>(prop).unwrap().held_by, None);
    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![
            held,
            released,
            LifecycleBroadcast::OwnershipCleared {
                prop: prop_id,
                reason: ClearReason::Expired,
            },
        ]
    );
}
