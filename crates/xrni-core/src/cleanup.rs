//! Pre-save normalisation: note range clamping and modulation set deduplication.
//!
//! Conversion gives every zone its own modulation set. Most of them end up
//! identical, so before saving, equal sets are merged and the samples
//! pointing at them are repointed.

use crate::sample::{ModulationSet, Sample};
use crate::tree::equals;

/// Highest note the engine can map.
pub const MAX_NOTE: i32 = 119;

/// Clamp note ranges, then merge structurally equal modulation sets.
///
/// Afterwards no two modulation sets are equal and every sample's
/// modulation set index lies in `0..modulation_sets.len()`, provided it
/// did before. Running it twice changes nothing the second time.
pub fn cleanup(samples: &mut [Sample], modulation_sets: &mut Vec<ModulationSet>) {
    clamp_note_ranges(samples);

    let mut i = 0;
    while i < modulation_sets.len() {
        let mut j = i + 1;
        while j < modulation_sets.len() {
            if equals(modulation_sets[i].element(), modulation_sets[j].element()) {
                replace_modulation_set(samples, modulation_sets, j, i);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}

/// Keep note ranges within `0..=MAX_NOTE`.
pub fn clamp_note_ranges(samples: &mut [Sample]) {
    for sample in samples.iter_mut() {
        let end = sample.note_end();
        if end > MAX_NOTE {
            sample.set_note_end(MAX_NOTE);
        }
        let start = sample.note_start();
        if start < 0 {
            sample.set_note_start(0);
        }
    }
}

/// Repoint samples from set `from` to set `to`, then remove `from`.
fn replace_modulation_set(
    samples: &mut [Sample],
    modulation_sets: &mut Vec<ModulationSet>,
    from: usize,
    to: usize,
) {
    for sample in samples.iter_mut() {
        let index = sample.modulation_set_index();
        if index > from {
            sample.set_modulation_set_index(index - 1);
        } else if index == from {
            sample.set_modulation_set_index(to);
        }
    }
    log::trace!("Merged modulation set {} into {}", from, to);
    modulation_sets.remove(from);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Element;

    fn set_with_attack(attack: f64) -> ModulationSet {
        let mut set = ModulationSet(Element::new("ModulationSet"));
        set.set_attack(attack);
        set.set_sustain(1.0);
        set
    }

    fn sample_using(index: usize) -> Sample {
        let mut sample = Sample(Element::new("Sample"));
        sample.set_modulation_set_index(index);
        sample.set_note_range(0, 119);
        sample
    }

    fn indices(samples: &[Sample]) -> Vec<usize> {
        samples.iter().map(Sample::modulation_set_index).collect()
    }

    fn assert_no_equal_sets(sets: &[ModulationSet]) {
        for i in 0..sets.len() {
            for j in i + 1..sets.len() {
                assert!(!equals(sets[i].element(), sets[j].element()));
            }
        }
    }

    #[test]
    fn test_identical_sets_merge_to_one() {
        let mut samples = vec![sample_using(0), sample_using(1), sample_using(2)];
        let mut sets = vec![
            set_with_attack(0.3),
            set_with_attack(0.3),
            set_with_attack(0.3),
        ];

        cleanup(&mut samples, &mut sets);

        assert_eq!(sets.len(), 1);
        assert_eq!(indices(&samples), vec![0, 0, 0]);
    }

    #[test]
    fn test_indices_stay_dense_after_merge() {
        // Sets: A B A C B
        let mut samples = (0..5).map(sample_using).collect::<Vec<_>>();
        let mut sets = vec![
            set_with_attack(0.1),
            set_with_attack(0.2),
            set_with_attack(0.1),
            set_with_attack(0.3),
            set_with_attack(0.2),
        ];

        cleanup(&mut samples, &mut sets);

        assert_eq!(sets.len(), 3);
        assert_no_equal_sets(&sets);
        assert_eq!(indices(&samples), vec![0, 1, 0, 2, 1]);
        assert_eq!(sets[2].attack(), Some(0.3));
        assert!(samples
            .iter()
            .all(|s| s.modulation_set_index() < sets.len()));
    }

    #[test]
    fn test_shared_set_survives_merge() {
        let mut samples = vec![sample_using(0), sample_using(1), sample_using(1), sample_using(2)];
        let mut sets = vec![
            set_with_attack(0.5),
            set_with_attack(0.7),
            set_with_attack(0.5),
        ];

        cleanup(&mut samples, &mut sets);

        assert_eq!(sets.len(), 2);
        assert_eq!(indices(&samples), vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_note_ranges_are_clamped() {
        let mut wide = sample_using(0);
        wide.set_note_range(-12, 127);
        let mut narrow = sample_using(0);
        narrow.set_note_range(24, 36);
        let mut samples = vec![wide, narrow];
        let mut sets = vec![set_with_attack(0.0)];

        cleanup(&mut samples, &mut sets);

        assert_eq!((samples[0].note_start(), samples[0].note_end()), (0, 119));
        assert_eq!((samples[1].note_start(), samples[1].note_end()), (24, 36));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut samples = (0..4).map(sample_using).collect::<Vec<_>>();
        samples[3].set_note_range(100, 140);
        let mut sets = vec![
            set_with_attack(0.1),
            set_with_attack(0.1),
            set_with_attack(0.9),
            set_with_attack(0.9),
        ];

        cleanup(&mut samples, &mut sets);
        let (once_samples, once_sets) = (samples.clone(), sets.clone());
        cleanup(&mut samples, &mut sets);

        assert_eq!(samples, once_samples);
        assert_eq!(sets, once_sets);
    }
}
