use crate::runoff::*;

use runoff_engine::Candidate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    /// Relative to the directory of the configuration file.
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub winner: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulesConfig {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    _random_seed: Option<JSValue>,
    #[serde(rename = "rankValidation")]
    pub rank_validation: Option<String>,
}

impl RulesConfig {
    #[cfg(test)]
    pub fn new(
        tiebreak_mode: Option<&str>,
        random_seed: Option<JSValue>,
        rank_validation: Option<&str>,
    ) -> RulesConfig {
        RulesConfig {
            tiebreak_mode: tiebreak_mode.map(|s| s.to_string()),
            _random_seed: random_seed,
            rank_validation: rank_validation.map(|s| s.to_string()),
        }
    }

    /// The seed, if provided as a number or as a string holding a number.
    pub fn random_seed(&self) -> RunoffResult<Option<u32>> {
        if self._random_seed.is_some() {
            read_js_int(&self._random_seed).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// A snapshot of one election, as stored by the voting application.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub rules: Option<RulesConfig>,
}

pub fn read_config(path: &str) -> RunoffResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!(
        "read_config: {} candidates, rules: {:?}",
        config.candidates.len(),
        config.rules
    );
    Ok(config)
}

pub fn read_summary(path: &str) -> RunoffResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    ensure_whatever!(
        js["results"].is_object(),
        "The reference summary {} has no results section",
        path
    );
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> RunoffResult<u32> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .and_then(|x| u32::try_from(x).ok())
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<u32>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeds_are_numbers_or_strings() {
        let r = RulesConfig::new(Some("deterministicRandom"), Some(json!(42)), None);
        assert_eq!(r.random_seed().unwrap(), Some(42));
        let r = RulesConfig::new(Some("deterministicRandom"), Some(json!("7")), None);
        assert_eq!(r.random_seed().unwrap(), Some(7));
        let r = RulesConfig::new(None, Some(json!("seven")), None);
        assert!(matches!(
            r.random_seed(),
            Err(RunoffError::ParsingJsonNumber {})
        ));
        assert_eq!(RulesConfig::default().random_seed().unwrap(), None);
    }

    #[test]
    fn rules_section_is_optional() {
        let config: ElectionConfig = serde_json::from_value(json!({
            "outputSettings": {"contestName": "Test"},
            "candidates": [{
                "id": "00000000-0000-0000-0000-000000000001",
                "createdAt": "2024-02-01T09:00:00Z"
            }]
        }))
        .unwrap();
        assert_eq!(config.rules, None);
        assert_eq!(config.output_settings.contest_date, None);
        assert!(config.candidates[0].votes.is_empty());
    }
}
