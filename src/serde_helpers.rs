use serde::Deserialize as _;

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

/// Accepts `round: 1000`, `round: 10e12` and `round: "1000"` alike.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("Invalid number: {:?}", s))
        }),
    }
}
