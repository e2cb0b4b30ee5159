//! Text form `{run lengths}:{values}`, e.g. `{3,1,2}:{0,33,NVP}`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use eyre::{Report, Result, WrapErr};
use itertools::Itertools;

use rlevec_core_rs::{value_from_raw, value_to_raw, Element, ElementType, RleError, Value};

use crate::rle_vec::RleVec;

const NVP_TOKENS: [&str; 3] = ["NVP", "null", "NULL"];

fn fmt_runs<T: Element>(rle: &RleVec, f: &mut Formatter<'_>) -> fmt::Result {
    let values = rle
        .raw_runs()
        .map(|(value, _)| T::read_le(value))
        .join(",");
    write!(f, "{{{}}}:{{{}}}", rle.run_lengths().join(","), values)
}

impl Display for RleVec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.dtype {
            ElementType::Char => fmt_runs::<i8>(self, f),
            ElementType::Int2 => fmt_runs::<i16>(self, f),
            ElementType::Int4 => fmt_runs::<i32>(self, f),
            ElementType::Int8 => fmt_runs::<i64>(self, f),
            ElementType::Float4 => fmt_runs::<f32>(self, f),
            ElementType::Float8 => {
                let values = self
                    .raw_runs()
                    .map(|(value, _)| match value_from_raw(f64::read_le(value)) {
                        Some(x) => x.to_string(),
                        None => NVP_TOKENS[0].to_string(),
                    })
                    .join(",");
                write!(f, "{{{}}}:{{{}}}", self.run_lengths().join(","), values)
            }
        }
    }
}

fn parse_list<'a>(text: &'a str, what: &str) -> Result<Vec<&'a str>> {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|x| x.strip_suffix('}'))
        .ok_or_else(|| RleError::malformed(format!("{what} must be enclosed in braces: {text}")))?
        .trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(str::trim).collect())
}

fn parse_value(token: &str) -> Result<Value> {
    if NVP_TOKENS.contains(&token) {
        return Ok(None);
    }
    let value = token
        .parse::<f64>()
        .map_err(|_| RleError::malformed(format!("invalid value '{token}'")))?;
    Ok(Some(value))
}

impl FromStr for RleVec {
    type Err = Report;

    /// Parses a float vector.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (runs, values) = text
            .split_once(':')
            .ok_or_else(|| RleError::malformed(format!("missing ':' separator in {text}")))?;

        let lengths = parse_list(runs, "run lengths")?
            .into_iter()
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| RleError::malformed(format!("invalid run length '{token}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let values = parse_list(values, "values")?
            .into_iter()
            .map(parse_value)
            .collect::<Result<Vec<_>>>()?;

        let raw = values
            .into_iter()
            .map(value_to_raw)
            .collect::<Vec<_>>();
        RleVec::from_runs(&raw, &lengths).wrap_err_with(|| format!("failed to parse {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() -> Result<()> {
        for (rle, expected) in [
            (
                RleVec::from_runs(&[0.0, 33.0, 0.0, 12.0, 22.0], &[1, 1, 40000, 1, 1])?,
                "{1,1,40000,1,1}:{0,33,0,12,22}",
            ),
            (RleVec::from_values(&[Some(1.5), None, None]), "{1,2}:{1.5,NVP}"),
            (RleVec::default(), "{}:{}"),
            (RleVec::uncompressed(&[-3i16, 4]), "{1,1}:{-3,4}"),
        ] {
            assert_eq!(rle.to_string(), expected);
        }
        Ok(())
    }

    #[test]
    fn test_from_str() -> Result<()> {
        for (text, expected) in [
            (
                "{1,1,40000,1,1}:{0,33,0,12,22}",
                vec![(Some(0.0), 1), (Some(33.0), 1), (Some(0.0), 40000), (Some(12.0), 1), (Some(22.0), 1)],
            ),
            ("{ 2 , 1 }:{ NVP , -1.5 }", vec![(None, 2), (Some(-1.5), 1)]),
            ("{1,1}:{null,NULL}", vec![(None, 1), (None, 1)]),
            ("{}:{}", vec![]),
        ] {
            let rle = text.parse::<RleVec>()?;
            assert_eq!(rle.value_runs()?.collect::<Vec<_>>(), expected, "{text}");
        }
        Ok(())
    }

    #[test]
    fn test_from_str_errors() {
        for text in [
            "",
            "{1}",
            "1:{1}",
            "{1,2}:{1}",
            "{0}:{1}",
            "{x}:{1}",
            "{1}:{abc}",
            "{-1}:{1}",
        ] {
            let err = text.parse::<RleVec>().unwrap_err();
            assert!(
                matches!(err.downcast_ref::<RleError>(), Some(RleError::Malformed { .. })),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_text_roundtrip() -> Result<()> {
        let rle = RleVec::from_values(&[Some(0.1), Some(0.1), None, Some(-7.25), Some(1e300)]);
        let parsed = rle.to_string().parse::<RleVec>()?;
        assert!(parsed.equals(&rle));
        Ok(())
    }
}
