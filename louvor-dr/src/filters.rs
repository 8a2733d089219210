//! Condition parsing for the `find` subcommand

use anyhow::{bail, Result};
use louvor_common::store::Conditions;
use serde_json::Value;

/// Parse repeated `CAMPO=VALOR` arguments into an equality condition map
///
/// Values are parsed as JSON first, so `bpm=72` matches the number 72 and
/// `compartilhada=true` matches a boolean. Anything that is not valid
/// JSON is taken as a bare string, which keeps plain text conditions free
/// of shell-hostile quoting. A repeated field keeps the last value.
pub fn parse_conditions(pairs: &[String]) -> Result<Conditions> {
    let mut conditions = Conditions::new();
    for pair in pairs {
        let (field, raw) = match pair.split_once('=') {
            Some(split) => split,
            None => bail!("Invalid condition '{}': expected CAMPO=VALOR", pair),
        };
        if field.is_empty() {
            bail!("Invalid condition '{}': empty field name", pair);
        }
        conditions.insert(field.to_string(), parse_value(raw));
    }
    Ok(conditions)
}

/// JSON scalar if the text parses as one, bare string otherwise
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
