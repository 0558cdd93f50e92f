//! Headless симуляция Physbox
//!
//! Запускает Bevy App без рендера: стена, два пропа, два игрока.
//! Контакты вбрасываются вручную вместо физического step.

use physbox_simulation::*;
use std::time::Duration;

fn main() {
    let seed = 42;
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "physbox.toml".to_string());

    let config = ConfigFile::load_or_default(&config_path);
    println!(
        "Starting Physbox headless simulation (seed: {}, mode: {:?})",
        seed, config.rules.mode
    );

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin::new(config, NetworkRole::Host));

    let world = app.world_mut();
    let wall = world.spawn(world_geometry_bundle()).id();
    let crate_prop = world
        .spawn(prop_bundle(PropDefinition::new(1, "wooden_crate", 50.0, 40).with_gibs(4)))
        .id();
    let barrel = world
        .spawn(prop_bundle(PropDefinition::new(2, "barrel", 80.0, 60)))
        .id();

    let (alice, bob, bob_hitbox) = {
        let mut commands = world.commands();
        let (alice, _) = spawn_player(&mut commands, PlayerLife::new("Alice"));
        let (bob, bob_hitbox) = spawn_player(&mut commands, PlayerLife::bot("Bob"));
        (alice, bob, bob_hitbox)
    };
    world.flush();

    world.send_event(RoundStarted);

    let dt = Duration::from_secs_f64(1.0 / 60.0);

    // Запускаем 600 тиков симуляции (10 sec при 60Hz)
    for tick in 0..600 {
        let world = app.world_mut();

        match tick {
            // Grace window пропов (1s) прошёл: ломаем ящик об стену
            90 => {
                world.send_event(ContactReport {
                    listener: crate_prop,
                    other: wall,
                    closing_speed: 300.0,
                });
            }
            120 => {
                world.send_event(ContactReport {
                    listener: barrel,
                    other: crate_prop,
                    closing_speed: 150.0,
                });
            }
            // Alice бросает бочку в Bob (после player immunity 3s)
            200 => {
                world.send_event(PickupRequested {
                    prop: barrel,
                    holder: alice,
                });
            }
            201 => {
                world.send_event(ReleaseRequested { holder: alice });
            }
            202 => {
                world.send_event(ContactReport {
                    listener: bob_hitbox,
                    other: barrel,
                    closing_speed: 400.0,
                });
            }
            300 => {
                world.send_event(LandingReport {
                    player: bob,
                    ground: wall,
                    fall_distance: 400.0,
                    impact_speed: 600.0,
                });
            }
            _ => {}
        }

        step_fixed(&mut app, dt);
        flush_events(&mut app);

        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            println!("Tick {}: {} entities", tick, entity_count);
        }
    }

    for (name, entity) in [("Alice", alice), ("Bob", bob), ("barrel", barrel)] {
        match app.world().get::<LifeState>(entity) {
            Some(life) => println!("{}: {}/{} HP", name, life.health, life.max_health),
            None => println!("{}: gone", name),
        }
    }

    println!("Simulation complete!");
}
