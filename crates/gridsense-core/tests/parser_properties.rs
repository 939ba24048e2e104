//! Property-based tests for sanitizing and matrix parsing
//!
//! Invariants that should hold for all inputs:
//! - Placement: token `i * 8 + j` lands at `[i][j]`, whatever the decoration
//! - Shape: fewer than 64 tokens never produces a matrix
//! - Truncation: tokens after the 64th are ignored
//! - Idempotence: sanitize(sanitize(x)) == sanitize(x)

use gridsense_core::{parse_matrix, sanitize, Error, Matrix, GRID_CELLS, GRID_SIZE};
use gridsense_core::parser::parse_line_into;
use proptest::prelude::*;

fn values(count: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0e4f32..1.0e4f32, count)
}

/// Render values as nested rows with arbitrary whitespace around each token
fn decorated(values: &[f32], pads: &[(u8, u8)]) -> String {
    let pad = |n: u8| match n % 4 {
        0 => "",
        1 => " ",
        2 => "\t",
        _ => "  ",
    };

    let rows: Vec<String> = values
        .chunks(GRID_SIZE)
        .enumerate()
        .map(|(r, row)| {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, v)| {
                    let (before, after) = pads[(r * GRID_SIZE + c) % pads.len()];
                    format!("{}{}{}", pad(before), v, pad(after))
                })
                .collect();
            format!("[{}]", cells.join(","))
        })
        .collect();
    format!("[{}]\r\n", rows.join(", "))
}

proptest! {
    #[test]
    fn prop_parsed_matrix_matches_tokens(
        vals in values(GRID_CELLS),
        pads in prop::collection::vec((any::<u8>(), any::<u8>()), 1..16),
    ) {
        let matrix = parse_matrix(&sanitize(&decorated(&vals, &pads))).unwrap();
        for i in 0..GRID_SIZE {
            for j in 0..GRID_SIZE {
                prop_assert_eq!(matrix.get(i, j), vals[i * GRID_SIZE + j]);
            }
        }
    }

    #[test]
    fn prop_short_input_is_insufficient_and_target_unchanged(
        count in 1usize..GRID_CELLS,
        seed in any::<u8>(),
    ) {
        let stream: Vec<String> = (0..count).map(|i| format!("{}.5", i)).collect();
        let mut target = Matrix::from_row_major(&[f32::from(seed); GRID_CELLS]);
        let before = target;

        let err = parse_line_into(&stream.join(","), &mut target).unwrap_err();
        let is_insufficient = matches!(
            err,
            Error::InsufficientValues { expected, found } if expected == GRID_CELLS && found == count
        );
        prop_assert!(is_insufficient);
        prop_assert_eq!(target, before);
    }

    #[test]
    fn prop_extra_tokens_ignored(vals in values(GRID_CELLS + 12)) {
        let stream: Vec<String> = vals.iter().map(|v| v.to_string()).collect();
        let matrix = parse_matrix(&stream.join(",")).unwrap();
        let expected: [f32; GRID_CELLS] = vals[..GRID_CELLS].try_into().unwrap();
        prop_assert_eq!(matrix.flatten(), expected);
    }

    #[test]
    fn prop_empty_token_is_malformed(position in 0usize..GRID_CELLS) {
        let mut tokens: Vec<String> = (0..GRID_CELLS).map(|i| i.to_string()).collect();
        tokens[position].clear();
        let err = parse_matrix(&tokens.join(",")).unwrap_err();
        let is_malformed = matches!(err, Error::MalformedToken { index } if index == position);
        prop_assert!(is_malformed);
    }

    #[test]
    fn prop_sanitize_idempotent(line in "[\\[\\]{}0-9.,\\- \t\r\n]{0,200}") {
        let once = sanitize(&line);
        prop_assert_eq!(sanitize(&once), once.clone());
        let stripped = "[]{} \t\r\n";
        prop_assert!(!once.contains(|c: char| stripped.contains(c)));
    }
}
