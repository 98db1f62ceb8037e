pub type Square = usize;

pub fn rank_of(sq: Square) -> usize {
    sq / 8
}
pub fn file_of(sq: Square) -> usize {
    sq % 8
}
pub fn square_at(file: usize, rank: usize) -> Square {
    rank * 8 + file
}

/// Parses a square from its algebraic representation.
/// ```
/// use ponder::square::parse_square;
/// assert_eq!(parse_square("e4"), Some(28));
/// assert_eq!(parse_square("a1"), Some(0));
/// assert_eq!(parse_square("k9"), None);
/// ```
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = match chars.next()? {
        c @ 'a'..='h' => c as usize - 'a' as usize,
        _ => return None,
    };
    let rank = match chars.next()?.to_digit(10) {
        Some(d) if (1..=8).contains(&d) => d as usize - 1,
        _ => return None,
    };
    Some(square_at(file, rank))
}

/// Returns the algebraic representation of a square.
/// ```
/// use ponder::square::square_representation;
/// assert_eq!(square_representation(28), Some(String::from("e4")));
/// assert_eq!(square_representation(65), None);
/// ```
pub fn square_representation(sq: Square) -> Option<String> {
    let file = ('a'..='h').nth(file_of(sq))?;
    let rank = ('1'..='8').nth(rank_of(sq))?;
    let mut repr = file.to_string();
    repr.push(rank);
    Some(repr)
}

/// Checks whether a given square index is in bounds (0..64)
pub fn is_valid(sq: Square) -> bool {
    sq < 64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_square() {
        for sq in 0..64 {
            let text = square_representation(sq).unwrap();
            assert_eq!(parse_square(&text), Some(sq));
        }
    }

    #[test]
    fn file_and_rank_decomposition() {
        let sq = parse_square("c7").unwrap();
        assert_eq!(file_of(sq), 2);
        assert_eq!(rank_of(sq), 6);
        assert_eq!(square_at(2, 6), sq);
    }
}
