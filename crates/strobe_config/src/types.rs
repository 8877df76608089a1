//! Configuration types deserialized from `strobe.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use strobe_common::{Frequency, TimeUnit};

/// Default convergence cap per scheduling region.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// The top-level configuration parsed from `strobe.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata.
    pub project: ProjectMeta,
    /// Evaluation engine settings.
    #[serde(default)]
    pub sim: SimSection,
    /// Clock and time scale.
    #[serde(default)]
    pub clock: ClockSection,
    /// Change trace output.
    #[serde(default)]
    pub trace: TraceSection,
    /// Randomized stream stimulus.
    #[serde(default)]
    pub stimulus: StimulusSection,
}

impl ProjectConfig {
    /// Creates a configuration with every section at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            project: ProjectMeta {
                name: name.into(),
                description: String::new(),
            },
            sim: SimSection::default(),
            clock: ClockSection::default(),
            trace: TraceSection::default(),
            stimulus: StimulusSection::default(),
        }
    }
}

/// Project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name, used for default output file names.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Evaluation engine settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimSection {
    /// Iteration cap for each of the ico, act and nba regions.
    pub max_iterations: u32,
    /// Report assignments that overflow a signal's declared width.
    pub debug_checks: bool,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            debug_checks: false,
        }
    }
}

/// Clock frequency and declared time scale.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Clock frequency, e.g. `"100MHz"` or a number of Hz.
    #[serde(deserialize_with = "deserialize_frequency")]
    pub frequency: Frequency,
    /// Declared time unit.
    pub time_unit: TimeUnit,
    /// Declared time precision; simulation time counts steps of this size.
    pub time_precision: TimeUnit,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            frequency: Frequency::new(100e6),
            time_unit: TimeUnit::Ns,
            time_precision: TimeUnit::Ps,
        }
    }
}

/// Change trace output.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraceSection {
    /// Whether to write a trace file.
    pub enabled: bool,
    /// Output path; defaults to `out/<project>.jsonl` when unset.
    pub path: Option<String>,
}

/// Randomized producer/consumer stimulus for `strobe run`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StimulusSection {
    /// RNG seed.
    pub seed: u64,
    /// Number of producer/consumer rounds.
    pub transactions: u32,
    /// Chance the producer offers a word in a round.
    pub send_probability: f64,
    /// Chance the consumer accepts when it decides to take a word.
    pub accept_probability: f64,
    /// Clock cycles spent draining the stage after the last round.
    pub drain_cycles: u32,
}

impl Default for StimulusSection {
    fn default() -> Self {
        Self {
            seed: 1,
            transactions: 200,
            send_probability: 0.85,
            accept_probability: 0.65,
            drain_cycles: 20,
        }
    }
}

/// Accepts either a frequency string (`"100MHz"`) or a bare number of Hz.
fn deserialize_frequency<'de, D>(deserializer: D) -> Result<Frequency, D::Error>
where
    D: Deserializer<'de>,
{
    struct FrequencyVisitor;

    impl Visitor<'_> for FrequencyVisitor {
        type Value = Frequency;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a frequency string like \"100MHz\" or a number of Hz")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v as f64))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v as f64))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v))
        }
    }

    deserializer.deserialize_any(FrequencyVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_defaults() {
        let sim = SimSection::default();
        assert_eq!(sim.max_iterations, 100);
        assert!(!sim.debug_checks);

        let clock = ClockSection::default();
        assert_eq!(clock.frequency.mhz(), 100.0);
        assert_eq!(clock.time_unit, TimeUnit::Ns);
        assert_eq!(clock.time_precision, TimeUnit::Ps);

        let stim = StimulusSection::default();
        assert_eq!(stim.transactions, 200);
        assert_eq!(stim.send_probability, 0.85);
    }

    #[test]
    fn named_uses_defaults() {
        let config = ProjectConfig::named("valid_ready");
        assert_eq!(config.project.name, "valid_ready");
        assert_eq!(config.sim.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.stimulus.seed, 1);
    }

    #[test]
    fn frequency_from_string_or_number() {
        #[derive(Deserialize)]
        struct Wrap {
            #[serde(deserialize_with = "deserialize_frequency")]
            f: Frequency,
        }
        let a: Wrap = toml::from_str("f = \"50MHz\"").unwrap();
        assert_eq!(a.f.hz(), 50e6);
        let b: Wrap = toml::from_str("f = 1000").unwrap();
        assert_eq!(b.f.hz(), 1000.0);
        let c: Wrap = toml::from_str("f = 2.5e6").unwrap();
        assert_eq!(c.f.hz(), 2.5e6);
        assert!(toml::from_str::<Wrap>("f = \"quick\"").is_err());
    }
}
