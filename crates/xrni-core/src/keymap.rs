//! Keyzone expansion.
//!
//! Source instruments often map only part of the keyboard. For every
//! velocity, the lowest and highest zones that respond to it are stretched
//! so that the whole playable range sounds.

use crate::cleanup::MAX_NOTE;
use crate::sample::Sample;

/// Highest velocity examined. Wider than MIDI so that out-of-range
/// velocity ends written by sloppy sources are still covered.
const MAX_VELOCITY: i32 = 255;

/// Extend note ranges so that every velocity layer covers `0..=MAX_NOTE`.
///
/// For each velocity, the zones whose note start equals the lowest start
/// among the zones responding to that velocity get their start moved to 0,
/// and those whose end equals the highest end get their end moved to
/// [`MAX_NOTE`]. Ties are all extended. Layers that already cover the full
/// range are left alone, which makes the pass idempotent.
pub fn expand_keymap(samples: &mut [Sample]) {
    let mut layer: Vec<usize> = Vec::new();

    for velocity in 0..=MAX_VELOCITY {
        layer.clear();
        layer.extend(
            samples
                .iter()
                .enumerate()
                .filter(|(_, s)| s.responds_to_velocity(velocity))
                .map(|(idx, _)| idx),
        );
        if layer.is_empty() {
            continue;
        }

        let min_start = layer
            .iter()
            .map(|&idx| samples[idx].note_start())
            .min()
            .unwrap_or(0);
        let max_end = layer
            .iter()
            .map(|&idx| samples[idx].note_end())
            .max()
            .unwrap_or(MAX_NOTE);

        if min_start == 0 && max_end >= MAX_NOTE {
            continue;
        }

        log::debug!(
            "Velocity {} covers notes {}..={}, extending to 0..={}",
            velocity,
            min_start,
            max_end,
            MAX_NOTE
        );

        for &idx in &layer {
            let sample = &mut samples[idx];
            if sample.note_start() == min_start {
                sample.set_note_start(0);
            }
            if sample.note_end() == max_end {
                sample.set_note_end(MAX_NOTE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Element;

    fn zone(notes: (i32, i32), velocities: (i32, i32)) -> Sample {
        let mut sample = Sample(Element::new("Sample"));
        sample.set_note_range(notes.0, notes.1);
        sample.set_velocity_range(velocities.0, velocities.1);
        sample
    }

    fn ranges(samples: &[Sample]) -> Vec<(i32, i32)> {
        samples
            .iter()
            .map(|s| (s.note_start(), s.note_end()))
            .collect()
    }

    #[test]
    fn test_extremal_zones_extended() {
        let mut samples = vec![
            zone((40, 50), (0, 127)),
            zone((51, 60), (0, 127)),
            zone((61, 80), (0, 127)),
        ];

        expand_keymap(&mut samples);

        assert_eq!(ranges(&samples), vec![(0, 50), (51, 60), (61, 119)]);
    }

    #[test]
    fn test_single_velocity_layer_with_gaps() {
        let mut samples = vec![
            zone((40, 50), (64, 64)),
            zone((55, 65), (64, 64)),
            zone((70, 80), (64, 64)),
        ];

        expand_keymap(&mut samples);

        assert_eq!(ranges(&samples), vec![(0, 50), (55, 65), (70, 119)]);
        assert!(samples.iter().all(|s| s.velocity_start() == 64 && s.velocity_end() == 64));
    }

    #[test]
    fn test_layers_are_expanded_independently() {
        let mut samples = vec![
            zone((40, 60), (0, 63)),
            zone((61, 80), (0, 63)),
            zone((30, 90), (64, 127)),
        ];

        expand_keymap(&mut samples);

        assert_eq!(ranges(&samples), vec![(0, 60), (61, 119), (0, 119)]);
    }

    #[test]
    fn test_ties_are_all_extended() {
        let mut samples = vec![zone((40, 80), (0, 127)), zone((40, 80), (0, 127))];

        expand_keymap(&mut samples);

        assert_eq!(ranges(&samples), vec![(0, 119), (0, 119)]);
    }

    #[test]
    fn test_every_layer_covers_full_range() {
        let mut samples = vec![
            zone((20, 40), (0, 40)),
            zone((41, 70), (20, 100)),
            zone((60, 100), (90, 127)),
        ];

        expand_keymap(&mut samples);

        for velocity in 0..=255 {
            let layer: Vec<&Sample> = samples
                .iter()
                .filter(|s| s.responds_to_velocity(velocity))
                .collect();
            if layer.is_empty() {
                continue;
            }
            assert_eq!(layer.iter().map(|s| s.note_start()).min(), Some(0));
            assert!(layer.iter().map(|s| s.note_end()).max().unwrap() >= MAX_NOTE);
        }
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let mut samples = vec![
            zone((20, 40), (0, 64)),
            zone((41, 70), (32, 127)),
            zone((50, 60), (100, 127)),
        ];

        expand_keymap(&mut samples);
        let once = samples.clone();
        expand_keymap(&mut samples);

        assert_eq!(samples, once);
    }

    #[test]
    fn test_full_layer_untouched() {
        let mut samples = vec![zone((0, 60), (0, 127)), zone((30, 119), (0, 127))];
        let before = samples.clone();

        expand_keymap(&mut samples);

        assert_eq!(samples, before);
    }
}
