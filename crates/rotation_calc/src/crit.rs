use rand::Rng;

/// How a hit turns crit rate and crit damage into a damage factor.
pub trait CritModel {
    fn crit_factor(&mut self, crit_rate: f64, crit_damage: f64) -> f64;
}

/// Expected value over many hits: `1 + min(cr, 100)/100 * cd/100`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedCrit;

impl CritModel for ExpectedCrit {
    fn crit_factor(&mut self, crit_rate: f64, crit_damage: f64) -> f64 {
        1.0 + crit_rate.clamp(0.0, 100.0) / 100.0 * (crit_damage / 100.0)
    }
}

/// Each hit either crits (factor `1 + cd/100`) or does not (factor 1).
pub struct RolledCrit<R> {
    rng: R,
    crits: u64,
    hits: u64,
}

impl<R: Rng> RolledCrit<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            crits: 0,
            hits: 0,
        }
    }

    pub fn crits(&self) -> u64 {
        self.crits
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl<R: Rng> CritModel for RolledCrit<R> {
    fn crit_factor(&mut self, crit_rate: f64, crit_damage: f64) -> f64 {
        self.hits += 1;
        let chance = (crit_rate / 100.0).clamp(0.0, 1.0);
        if self.rng.gen_bool(chance) {
            self.crits += 1;
            1.0 + crit_damage / 100.0
        } else {
            1.0
        }
    }
}
