//! Built-in world themes.

/// Themes picked from when the caller does not supply one.
pub const WORLD_THEMES: [&str; 10] = [
    "a bioluminescent cave beneath a frozen sea",
    "a derelict orbital greenhouse overgrown with vines",
    "a floating market of lanterns above a misty canyon",
    "an abandoned brutalist library flooded with sunlight",
    "a desert of glass dunes under two moons",
    "a sunken cathedral reclaimed by coral",
    "a cyberpunk alley in monsoon rain",
    "a moss-covered temple deep in a cloud forest",
    "a clockwork observatory at the edge of the world",
    "a quiet Japanese garden in late autumn",
];

/// Picks a theme uniformly at random.
pub fn random_theme() -> &'static str {
    // v4 UUIDs carry 122 random bits; the modulo bias over ten is negligible.
    let n = uuid::Uuid::new_v4().as_u128();
    WORLD_THEMES[(n % WORLD_THEMES.len() as u128) as usize]
}
