//! Proportional Text Redistribution.
//!
//! Splits a replacement string across the positions of a paragraph's original
//! runs so that each run keeps roughly the same share of the text it had
//! before. This is an approximation: formatting boundaries will not line up
//! with words or punctuation of the new text.

/// One piece of the new text and the original run whose style it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSlice {
    /// Index into the original run list; `None` when the paragraph had no runs at all
    pub source: Option<usize>,
    pub text: String,
}

/// Partition `new_text` over runs of the given lengths (in characters).
///
/// Run `i` receives `floor(len_i / total * new_len)` characters. Runs whose
/// share rounds to zero are skipped. Characters left over from truncation are
/// appended to the last produced slice, so the concatenation of the returned
/// slices always equals `new_text`.
pub fn redistribute(original_run_lengths: &[usize], new_text: &str) -> Vec<RunSlice> {
    let new_len = new_text.chars().count();
    if new_len == 0 {
        return Vec::new();
    }

    let last_source = original_run_lengths.len().checked_sub(1);
    let total: usize = original_run_lengths.iter().sum();
    if total == 0 {
        return vec![RunSlice {
            source: last_source,
            text: new_text.to_string(),
        }];
    }

    // Byte offset of every char boundary, including the end of the string.
    let boundaries: Vec<usize> = new_text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(new_text.len()))
        .collect();

    let mut slices: Vec<RunSlice> = Vec::new();
    let mut cursor = 0usize;

    for (index, &run_len) in original_run_lengths.iter().enumerate() {
        let share = (run_len as u128 * new_len as u128 / total as u128) as usize;
        if share == 0 {
            continue;
        }
        let end = cursor + share;
        slices.push(RunSlice {
            source: Some(index),
            text: new_text[boundaries[cursor]..boundaries[end]].to_string(),
        });
        cursor = end;
    }

    if cursor < new_len {
        let rest = &new_text[boundaries[cursor]..];
        match slices.last_mut() {
            Some(last) => last.text.push_str(rest),
            None => slices.push(RunSlice {
                source: last_source,
                text: rest.to_string(),
            }),
        }
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(slices: &[RunSlice]) -> String {
        slices.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_two_runs_split_proportionally_with_remainder_on_last() {
        let slices = redistribute(&[6, 5], "Hi there friend");

        assert_eq!(
            slices,
            vec![
                RunSlice {
                    source: Some(0),
                    text: "Hi there".to_string()
                },
                RunSlice {
                    source: Some(1),
                    text: " friend".to_string()
                },
            ]
        );
        let lengths: Vec<_> = slices.iter().map(|s| s.text.chars().count()).collect();
        assert_eq!(lengths, [8, 7]);
    }

    #[test]
    fn test_empty_new_text_yields_no_runs() {
        assert!(redistribute(&[3, 4], "").is_empty());
        assert!(redistribute(&[], "").is_empty());
        assert!(redistribute(&[0, 0], "").is_empty());
    }

    #[test]
    fn test_all_zero_lengths_keep_text_in_trailing_slot() {
        let slices = redistribute(&[0, 0, 0], "Rust engineer");
        assert_eq!(
            slices,
            vec![RunSlice {
                source: Some(2),
                text: "Rust engineer".to_string()
            }]
        );
    }

    #[test]
    fn test_no_original_runs_keeps_text_unstyled() {
        let slices = redistribute(&[], "New content");
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].source, None);
        assert_eq!(slices[0].text, "New content");
    }

    #[test]
    fn test_tiny_runs_are_skipped() {
        // 1/101 of 10 chars rounds to zero for the first run.
        let slices = redistribute(&[1, 100], "0123456789");
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].source, Some(1));
        assert_eq!(slices[0].text, "0123456789");
    }

    #[test]
    fn test_short_text_falls_back_to_last_style_when_every_share_rounds_to_zero() {
        // Each share is floor(1/3 * 2) = 0.
        let slices = redistribute(&[1, 1, 1], "ok");
        assert_eq!(
            slices,
            vec![RunSlice {
                source: Some(2),
                text: "ok".to_string()
            }]
        );
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "Café — naïve 日本語 résumé";
        let slices = redistribute(&[2, 3, 5], text);
        assert_eq!(joined(&slices), text);
        let total: usize = slices.iter().map(|s| s.text.chars().count()).sum();
        assert_eq!(total, text.chars().count());
    }

    #[test]
    fn test_concatenation_always_equals_new_text() {
        let cases: &[(&[usize], &str)] = &[
            (&[1], "a"),
            (&[7, 0, 3], "Built distributed systems in Rust"),
            (&[0, 9], "x"),
            (&[5, 5, 5, 5], "abc"),
            (&[100], "short"),
            (&[2, 2], "a much longer replacement than the original two runs"),
        ];

        for (lengths, text) in cases {
            let slices = redistribute(lengths, text);
            assert_eq!(joined(&slices), *text, "lengths {lengths:?}");
            assert!(slices.iter().all(|s| !s.text.is_empty()));
            let mut sources: Vec<_> = slices.iter().filter_map(|s| s.source).collect();
            let before = sources.clone();
            sources.sort_unstable();
            assert_eq!(sources, before, "slices follow original run order");
        }
    }
}
