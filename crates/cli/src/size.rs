//! Human-readable byte sizes for `--buffer-size`.
//!
//! Accepts a plain decimal count (`32768`) or a count followed by an SI
//! (`KB` = 1000) or IEC (`KiB` = 1024) suffix, up to exa. The result must be
//! positive and fit in an `i64`.

/// Why a size string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    #[error("invalid size syntax")]
    Syntax,

    #[error("number out of range")]
    OutOfRange,

    #[error("negative or zero value")]
    NotPositive,

    #[error("value too big to fit in i64")]
    Overflow,
}

/// Suffix letters in increasing powers: K = 1, M = 2, ... E = 6.
const POWERS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Parse a size string into a byte count.
pub fn parse_size(input: &str) -> Result<u64, SizeError> {
    let Some(without_b) = input.strip_suffix('B') else {
        return positive(parse_count(input)?).map(|n| n as u64);
    };

    let (rest, base) = match without_b.strip_suffix('i') {
        Some(rest) => (rest, 1024i64),
        None => (without_b, 1000i64),
    };

    let (digits, power) = match rest.chars().last().and_then(|c| POWERS.iter().position(|&p| p == c)) {
        Some(index) => (&rest[..rest.len() - 1], index as u32 + 1),
        None => (rest, 0),
    };

    let count = positive(parse_count(digits)?)?;
    let multiplier = base.checked_pow(power).ok_or(SizeError::Overflow)?;
    let bytes = count.checked_mul(multiplier).ok_or(SizeError::Overflow)?;
    Ok(bytes as u64)
}

/// Parse a size string into an in-memory buffer length.
pub fn parse_buffer_size(input: &str) -> Result<usize, SizeError> {
    let bytes = parse_size(input)?;
    usize::try_from(bytes).map_err(|_| SizeError::Overflow)
}

fn parse_count(digits: &str) -> Result<i64, SizeError> {
    digits.parse::<i64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            SizeError::OutOfRange
        }
        _ => SizeError::Syntax,
    })
}

fn positive(count: i64) -> Result<i64, SizeError> {
    if count <= 0 {
        Err(SizeError::NotPositive)
    } else {
        Ok(count)
    }
}
