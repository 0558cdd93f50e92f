//! Формулы урона от столкновений
//!
//! Все функции чистые: порог + скорость (+ масса) → целый урон.
//! `sqrt` от отрицательного / нулевого аргумента даёт 0.

fn rounded_sqrt(value: f32, scale: f32) -> u32 {
    if !(value > 0.0) {
        return 0;
    }
    (value.sqrt() * scale).round() as u32
}

/// Prop × World: `round(sqrt(S * 0.8))` при `S > threshold`
pub fn prop_world_damage(speed: f32, threshold: f32) -> u32 {
    if !(speed > threshold) {
        return 0;
    }
    rounded_sqrt(speed * 0.8, 1.0)
}

/// Prop × Prop: урон ОДНОЙ стороне, `other_mass`: масса второй стороны
pub fn prop_prop_damage(speed: f32, other_mass: f32, threshold: f32) -> u32 {
    if !(speed > threshold) {
        return 0;
    }
    rounded_sqrt(speed + other_mass, 1.0)
}

/// Player × World (fall damage): `round(sqrt(S) * 0.35)` при `S ≥ fall_threshold`
pub fn fall_damage(speed: f32, fall_threshold: f32) -> u32 {
    if !(speed >= fall_threshold) {
        return 0;
    }
    rounded_sqrt(speed, 0.35)
}

/// Player × Prop: урон пропу `round(sqrt(S))`
pub fn prop_impact_damage(speed: f32, threshold: f32) -> u32 {
    if !(speed > threshold) {
        return 0;
    }
    rounded_sqrt(speed, 1.0)
}

/// Player × Prop: урон игроку `round(sqrt(S + prop_mass))`
pub fn player_impact_damage(speed: f32, prop_mass: f32, threshold: f32) -> u32 {
    if !(speed > threshold) {
        return 0;
    }
    rounded_sqrt(speed + prop_mass, 1.0)
}
