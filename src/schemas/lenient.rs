use serde::{de::Error as _, Deserialize, Deserializer};

/// The backend stores numbers typed into forms, so `"10"` and `10` both occur.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn parse_number<E: serde::de::Error>(raw: NumberOrText) -> Result<f64, E> {
    match raw {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => {
            let trimmed = text.trim();
            trimmed.parse::<f64>().map_err(|_| E::custom(format!("expected a number, got '{trimmed}'")))
        }
    }
}

pub(super) fn minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = parse_number::<D::Error>(NumberOrText::deserialize(deserializer)?)?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!("duration must be a whole number of minutes, got {value}")));
    }
    Ok(value as u32)
}

pub(super) fn score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(0.0),
        Some(raw) => parse_number::<D::Error>(raw),
        None => Ok(0.0),
    }
}

pub(super) fn optional_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(raw) => parse_number::<D::Error>(raw).map(Some),
        None => Ok(None),
    }
}
