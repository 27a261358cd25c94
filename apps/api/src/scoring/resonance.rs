//! Symmetric compatibility coefficients between categorical states.

use std::collections::{BTreeSet, HashMap};

use crate::scoring::TableError;

/// Returned when either state is missing from the table.
pub const NEUTRAL_RESONANCE: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ResonanceTable {
    states: BTreeSet<String>,
    values: HashMap<(String, String), f64>,
}

impl ResonanceTable {
    /// Builds the table from declared states and unordered pairs. Each pair is
    /// stored in both directions and every state resonates 1.0 with itself.
    pub fn from_pairs(states: &[&str], pairs: &[(&str, &str, f64)]) -> Result<Self, TableError> {
        let states: BTreeSet<String> = states.iter().map(|s| normalize(s)).collect();
        let mut values = HashMap::new();

        for state in &states {
            values.insert((state.clone(), state.clone()), 1.0);
        }

        for (a, b, value) in pairs {
            let (a, b) = (normalize(a), normalize(b));
            for state in [&a, &b] {
                if !states.contains(state) {
                    return Err(TableError::UnknownState(state.clone()));
                }
            }
            if !(0.0..=1.0).contains(value) {
                return Err(TableError::ResonanceOutOfRange {
                    a,
                    b,
                    value: *value,
                });
            }
            if a == b {
                if *value != 1.0 {
                    return Err(TableError::SelfResonance {
                        state: a,
                        value: *value,
                    });
                }
                continue;
            }
            if let Some(first) = values.get(&(a.clone(), b.clone())) {
                if first != value {
                    return Err(TableError::AsymmetricPair {
                        a,
                        b,
                        first: *first,
                        second: *value,
                    });
                }
            }
            values.insert((a.clone(), b.clone()), *value);
            values.insert((b, a), *value);
        }

        Ok(Self { states, values })
    }

    /// Work-style archetype table used by the work-style module.
    pub fn work_styles() -> Result<Self, TableError> {
        Self::from_pairs(
            &[
                "autonomous",
                "collaborative",
                "structured",
                "adaptive",
                "analytical",
                "visionary",
            ],
            &[
                ("autonomous", "collaborative", 0.45),
                ("autonomous", "structured", 0.35),
                ("autonomous", "adaptive", 0.80),
                ("autonomous", "analytical", 0.70),
                ("autonomous", "visionary", 0.75),
                ("collaborative", "structured", 0.65),
                ("collaborative", "adaptive", 0.85),
                ("collaborative", "analytical", 0.55),
                ("collaborative", "visionary", 0.70),
                ("structured", "adaptive", 0.40),
                ("structured", "analytical", 0.85),
                ("structured", "visionary", 0.30),
                ("adaptive", "analytical", 0.60),
                ("adaptive", "visionary", 0.80),
                ("analytical", "visionary", 0.50),
            ],
        )
    }

    /// Case-insensitive lookup. Unknown states and undeclared pairs yield
    /// [`NEUTRAL_RESONANCE`].
    pub fn lookup(&self, a: &str, b: &str) -> f64 {
        self.values
            .get(&(normalize(a), normalize(b)))
            .copied()
            .unwrap_or(NEUTRAL_RESONANCE)
    }

    pub fn contains(&self, state: &str) -> bool {
        self.states.contains(&normalize(state))
    }

    #[cfg(test)]
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(String::as_str)
    }
}

fn normalize(state: &str) -> String {
    state.trim().to_lowercase()
}
