// Variants: the engine configured as concrete kinds of counterpoint.
//
// A variant is nothing but a `GeneratorConfig` built by a free function:
// the beat grid, the voices (free, frozen or seeded), the interval tables,
// the predicate pipeline, the budgets and the parameter draw. Variants that
// depend on other material (a cantus firmus, a theme) run a nested
// `Generator` first on a forked random stream and freeze its best line.
//
// Architecture:
// - cantus_firmus: single whole-note line, also the nested engine for the
//   species
// - species: first to fourth species against a cantus firmus
// - fifth_species: florid counterpoint; its rule set is shared with the duet
//   and free counterpoint
// - multi_part: first species in three to six voices
// - imitation: theme and duet
// - free_counterpoint: two florid voices without a cantus firmus
//
// `build_config` dispatches a `Variant` chosen on the command line.

pub mod cantus_firmus;
pub mod fifth_species;
pub mod free_counterpoint;
pub mod imitation;
pub mod multi_part;
pub mod species;

use crate::error::{GenerateError, Result};
use crate::generator::GeneratorConfig;
use crate::mode::Mode;
use jeppesen_prng::SeededRng;
use species::Species;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    CantusFirmus,
    FirstSpecies,
    SecondSpecies,
    ThirdSpecies,
    FourthSpecies,
    FifthSpecies,
    MultiPart,
    Theme,
    Duet,
    FreeCounterpoint,
}

impl Variant {
    pub const ALL: [Variant; 10] = [
        Variant::CantusFirmus,
        Variant::FirstSpecies,
        Variant::SecondSpecies,
        Variant::ThirdSpecies,
        Variant::FourthSpecies,
        Variant::FifthSpecies,
        Variant::MultiPart,
        Variant::Theme,
        Variant::Duet,
        Variant::FreeCounterpoint,
    ];

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Variant::CantusFirmus => "cantus-firmus",
            Variant::FirstSpecies => "first-species",
            Variant::SecondSpecies => "second-species",
            Variant::ThirdSpecies => "third-species",
            Variant::FourthSpecies => "fourth-species",
            Variant::FifthSpecies => "fifth-species",
            Variant::MultiPart => "multi-part",
            Variant::Theme => "theme",
            Variant::Duet => "duet",
            Variant::FreeCounterpoint => "free-counterpoint",
        }
    }

    /// Length in bars when none is requested.
    pub fn default_length(self) -> usize {
        match self {
            Variant::MultiPart | Variant::FreeCounterpoint => 8,
            Variant::Theme => 4,
            _ => 10,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.replace('_', "-");
        Variant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
                format!("unknown variant '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub mode: Mode,
    /// Bars, closing bar included.
    pub length: usize,
    /// Number of voices; only multi-part counterpoint takes it.
    pub voices: usize,
}

/// Build the configuration for `variant`. Variants that need a cantus
/// firmus or a theme generate it here, so this may itself fail with
/// `NoSolution`.
pub fn build_config(
    variant: Variant,
    request: &Request,
    rng: &mut SeededRng,
) -> Result<GeneratorConfig> {
    let Request { mode, length, voices } = *request;
    match variant {
        Variant::CantusFirmus => cantus_firmus::build_cantus_firmus_config(mode, length, false),
        Variant::FirstSpecies => species::build_species_config(Species::First, mode, length, rng),
        Variant::SecondSpecies => species::build_species_config(Species::Second, mode, length, rng),
        Variant::ThirdSpecies => species::build_species_config(Species::Third, mode, length, rng),
        Variant::FourthSpecies => species::build_species_config(Species::Fourth, mode, length, rng),
        Variant::FifthSpecies => fifth_species::build_fifth_species_config(mode, length, rng),
        Variant::MultiPart => multi_part::build_multi_part_config(mode, length, voices),
        Variant::Theme => imitation::build_theme_config(mode, length),
        Variant::Duet => imitation::build_duet_config(mode, length, rng),
        Variant::FreeCounterpoint => free_counterpoint::build_free_counterpoint_config(mode, length),
    }
}

/// Reject lengths a variant cannot be built with.
pub(crate) fn check_length(
    what: &str,
    length: usize,
    allowed: RangeInclusive<usize>,
) -> Result<()> {
    if allowed.contains(&length) {
        Ok(())
    } else {
        Err(GenerateError::InvalidConfig(format!(
            "{what} needs {} to {} bars, got {length}",
            allowed.start(),
            allowed.end()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>(), Ok(variant));
        }
        assert_eq!("FIFTH_SPECIES".parse::<Variant>(), Ok(Variant::FifthSpecies));
        assert!("sixth-species".parse::<Variant>().is_err());
    }

    #[test]
    fn test_default_lengths_are_buildable() {
        let mut rng = SeededRng::new(1);
        for variant in [
            Variant::CantusFirmus,
            Variant::MultiPart,
            Variant::Theme,
            Variant::FreeCounterpoint,
        ] {
            let request = Request {
                mode: Mode::Dorian,
                length: variant.default_length(),
                voices: 4,
            };
            assert!(build_config(variant, &request, &mut rng).is_ok(), "{variant}");
        }
    }

    #[test]
    fn test_length_errors_name_the_variant() {
        let request = Request {
            mode: Mode::Ionian,
            length: 40,
            voices: 4,
        };
        let err = build_config(Variant::CantusFirmus, &request, &mut SeededRng::new(2)).unwrap_err();
        assert!(err.to_string().contains("cantus firmus"), "{err}");
        let err = build_config(Variant::Duet, &request, &mut SeededRng::new(2)).unwrap_err();
        assert!(err.to_string().contains("duet"), "{err}");
    }
}
