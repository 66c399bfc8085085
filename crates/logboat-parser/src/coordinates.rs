use std::fmt;

use crate::errors::CoordinateError;

const DEGREE_SIGNS: [char; 2] = ['\u{00B0}', '\u{00BA}'];
const MINUTE_SIGN: char = '\'';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn sign(&self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::North => "N",
            Hemisphere::South => "S",
            Hemisphere::East => "E",
            Hemisphere::West => "W",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Hemisphere {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "N" => Ok(Hemisphere::North),
            "S" => Ok(Hemisphere::South),
            "E" => Ok(Hemisphere::East),
            "W" => Ok(Hemisphere::West),
            other => Err(format!("unknown hemisphere '{other}'")),
        }
    }
}

/// Converts a degree-minute coordinate such as `48°36.05' N` into signed decimal degrees.
///
/// Southern and western hemispheres are negative. A missing hemisphere letter is read as
/// positive.
pub fn parse_coordinate(text: &str) -> Result<f64, CoordinateError> {
    let malformed = || CoordinateError::Malformed {
        input: text.to_string(),
    };

    let parts: Vec<&str> = text
        .split(|c: char| DEGREE_SIGNS.contains(&c) || c == MINUTE_SIGN)
        .collect();
    let [degrees, minutes, direction] = parts.as_slice() else {
        return Err(malformed());
    };

    let degrees = parse_part(text, "degrees", degrees)?;
    let minutes = parse_part(text, "minutes", minutes)?;

    let direction: String = direction.chars().filter(|c| !c.is_whitespace()).collect();
    let sign = if direction.is_empty() {
        1.0
    } else {
        Hemisphere::try_from(direction.as_str())
            .map_err(|_| CoordinateError::UnknownDirection {
                input: text.to_string(),
                direction: direction.clone(),
            })?
            .sign()
    };

    Ok((degrees + minutes / 60.0) * sign)
}

fn parse_part(input: &str, part: &'static str, value: &str) -> Result<f64, CoordinateError> {
    let trimmed = value.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| CoordinateError::InvalidNumber {
            input: input.to_string(),
            part,
            value: trimmed.to_string(),
        })
}
