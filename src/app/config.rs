use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::error::AppError;
use crate::coordinator::{AreaSpec, DecodeErrorMode, RunSettings};
use crate::domain::{DateRules, LAYOUT_V1, names};
use crate::pipeline::{DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_FROZEN_RECORD_TYPE, DEFAULT_QUEUE_ROUTING_CODE};

fn default_max_age_hours() -> u64 {
    36
}

fn default_checkpoint_interval() -> usize {
    DEFAULT_CHECKPOINT_INTERVAL
}

fn default_decode_error_samples() -> usize {
    10
}

fn default_queue_routing_code() -> String {
    DEFAULT_QUEUE_ROUTING_CODE.to_string()
}

fn default_frozen_record_type() -> String {
    DEFAULT_FROZEN_RECORD_TYPE.to_string()
}

/// One `[[area]]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    pub name: String,
    pub primary: PathBuf,
    pub secondary: PathBuf,
    #[serde(default)]
    pub on_decode_error: DecodeErrorMode,
}

/// Run configuration, usually read from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default = "default_decode_error_samples")]
    pub decode_error_samples: usize,
    #[serde(default = "default_queue_routing_code")]
    pub queue_routing_code: String,
    #[serde(default = "default_frozen_record_type")]
    pub frozen_record_type: String,
    #[serde(default)]
    pub date_rules: DateRules,
    /// JSON-lines audit file; audit entries are logged when absent
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    #[serde(default, rename = "area")]
    pub areas: Vec<AreaConfig>,
}

impl Config {
    /// Configuration for a single area given on the command line
    pub fn single_area(
        name: impl Into<String>,
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
            max_age_hours: default_max_age_hours(),
            checkpoint_interval: default_checkpoint_interval(),
            decode_error_samples: default_decode_error_samples(),
            queue_routing_code: default_queue_routing_code(),
            frozen_record_type: default_frozen_record_type(),
            date_rules: DateRules::default(),
            audit_log: None,
            areas: vec![AreaConfig {
                name: name.into(),
                primary: primary.into(),
                secondary: secondary.into(),
                on_decode_error: DecodeErrorMode::default(),
            }],
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(contents)?)
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject configurations that cannot start a run
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: String| Err(AppError::Config(msg));

        if self.work_dir.as_os_str().is_empty() {
            return invalid("work_dir is required".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            return invalid("output_dir is required".to_string());
        }
        if self.areas.is_empty() {
            return invalid("at least one [[area]] is required".to_string());
        }
        if self.checkpoint_interval == 0 {
            return invalid("checkpoint_interval must be positive".to_string());
        }

        let routing_len = LAYOUT_V1
            .field(names::ROUTING_CODE)
            .map(|f| f.span.len)
            .unwrap_or_default();
        if self.queue_routing_code.len() != routing_len {
            return invalid(format!(
                "queue_routing_code must be {routing_len} characters"
            ));
        }
        let record_type_len = LAYOUT_V1
            .field(names::RECORD_TYPE)
            .map(|f| f.span.len)
            .unwrap_or_default();
        if self.frozen_record_type.len() != record_type_len {
            return invalid(format!(
                "frozen_record_type must be {record_type_len} characters"
            ));
        }

        let mut seen = HashSet::new();
        for area in &self.areas {
            if area.name.is_empty() {
                return invalid("area name is required".to_string());
            }
            if !area
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return invalid(format!(
                    "area name {:?} may only contain letters, digits, '-' and '_'",
                    area.name
                ));
            }
            if area.primary.as_os_str().is_empty() {
                return invalid(format!("area {} is missing its primary extract", area.name));
            }
            if area.secondary.as_os_str().is_empty() {
                return invalid(format!("area {} is missing its secondary extract", area.name));
            }
            if !seen.insert(area.name.as_str()) {
                return invalid(format!("area {} is configured twice", area.name));
            }
        }

        Ok(())
    }

    pub fn settings(&self) -> RunSettings {
        let mut settings = RunSettings::new(&self.work_dir, &self.output_dir);
        settings.rules = self.date_rules;
        settings.max_age = Duration::from_secs(self.max_age_hours * 3600);
        settings.checkpoint_interval = self.checkpoint_interval;
        settings.decode_error_samples = self.decode_error_samples;
        settings.queue_routing_code = self.queue_routing_code.clone();
        settings.frozen_record_type = self.frozen_record_type.clone();
        settings
    }

    /// Areas to run, restricted to `only` when it is non-empty
    pub fn area_specs(&self, only: &[String]) -> Result<Vec<AreaSpec>, AppError> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.areas.iter().any(|a| &a.name == *name))
        {
            return Err(AppError::Config(format!("unknown area {unknown}")));
        }

        Ok(self
            .areas
            .iter()
            .filter(|a| only.is_empty() || only.contains(&a.name))
            .map(|a| {
                AreaSpec::new(&a.name, &a.primary, &a.secondary)
                    .with_decode_errors(a.on_decode_error)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"
work_dir = "/var/casefile/work"
output_dir = "/var/casefile/out"
max_age_hours = 48
checkpoint_interval = 500

[date_rules]
fallback_year = 1950

[[area]]
name = "north"
primary = "/in/north.a.dat"
secondary = "/in/north.b.dat"

[[area]]
name = "south"
primary = "/in/south.a.dat"
secondary = "/in/south.b.dat"
on_decode_error = "abort"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.max_age_hours, 48);
        assert_eq!(config.checkpoint_interval, 500);
        assert_eq!(config.decode_error_samples, 10);
        assert_eq!(config.queue_routing_code, "99");
        assert_eq!(config.frozen_record_type, "05");
        assert_eq!(config.date_rules.fallback_year, 1950);
        assert_eq!(
            config.date_rules.epoch,
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
        );
        assert_eq!(config.areas.len(), 2);
        assert_eq!(config.areas[1].on_decode_error, DecodeErrorMode::Abort);
    }

    #[test]
    fn date_rules_override_epoch_and_leap_substitution() {
        use crate::domain::LeapSubstitution;
        use crate::domain::decode::{decode_date8, decode_period};

        let toml = r#"
work_dir = "w"
output_dir = "o"

[date_rules]
epoch = "1899-12-31"
fallback_month = 6
leap_substitution = { year = 2000, february_days = 28 }

[[area]]
name = "north"
primary = "a.dat"
secondary = "b.dat"
"#;
        let settings = Config::from_toml_str(toml).unwrap().settings();
        let rules = settings.rules;

        let epoch = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
        assert_eq!(rules.epoch, epoch);
        assert_eq!(rules.fallback_year, 1900);
        assert_eq!(
            rules.leap_substitution,
            Some(LeapSubstitution {
                year: 2000,
                february_days: 28,
            })
        );

        assert_eq!(decode_date8("csed", "00000000", &rules).unwrap(), epoch);
        assert_eq!(decode_period("tax_period", "200002", &rules).unwrap().end_day, 28);
        assert_eq!(decode_period("tax_period", "190002", &rules).unwrap().end_day, 29);
        assert_eq!(decode_period("tax_period", "202400", &rules).unwrap().month, 6);
    }

    #[test]
    fn settings_carry_configured_values() {
        let settings = Config::from_toml_str(SAMPLE).unwrap().settings();
        assert_eq!(settings.max_age, Duration::from_secs(48 * 3600));
        assert_eq!(settings.checkpoint_interval, 500);
        assert_eq!(settings.work_dir, PathBuf::from("/var/casefile/work"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Config::from_toml_str("work_dir = \"w\"\noutput_dir = \"o\"\ncolour = 1\n");
        assert!(matches!(result, Err(AppError::ConfigParse(_))));
    }

    #[test]
    fn missing_output_dir_is_rejected() {
        let result = Config::from_toml_str("work_dir = \"w\"\n");
        assert!(matches!(result, Err(AppError::ConfigParse(_))));
    }

    #[test]
    fn validation_rejects_bad_areas() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.areas[1].name = "north".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(m)) if m.contains("twice")));

        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.areas[0].secondary = PathBuf::new();
        assert!(matches!(config.validate(), Err(AppError::Config(m)) if m.contains("secondary")));

        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.areas[0].name = "../etc".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.areas.clear();
        assert!(config.validate().is_err());

        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.queue_routing_code = "9".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn area_filter_selects_subset() {
        let config = Config::from_toml_str(SAMPLE).unwrap();

        let all = config.area_specs(&[]).unwrap();
        assert_eq!(all.len(), 2);

        let south = config.area_specs(&["south".to_string()]).unwrap();
        assert_eq!(south.len(), 1);
        assert_eq!(south[0].on_decode_error, DecodeErrorMode::Abort);

        assert!(matches!(
            config.area_specs(&["east".to_string()]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn single_area_is_valid() {
        let config = Config::single_area("adhoc", "a.dat", "b.dat", "work", "out");
        config.validate().unwrap();
        assert_eq!(config.area_specs(&[]).unwrap()[0].name, "adhoc");
    }
}
