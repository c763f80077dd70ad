use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use dotenvy::dotenv;

use crate::extract::{DayFallbacks, ExtractorConfig};
use crate::payroll::PayrollRules;
use crate::payroll::aggregate::{PresencePolicy, ShiftDefinition};
use crate::utils::time_format::UnqualifiedTimePolicy;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// Without one the service keeps everything in memory.
    pub database_url: Option<String>,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_per_min: u32,

    // Payroll rules
    pub rules_path: Option<PathBuf>,
    pub default_scheme: Option<String>,
    pub year_end_month: u32,
    pub shift: ShiftDefinition,
    pub presence: PresencePolicy,

    // Extraction
    pub day_fallbacks: DayFallbacks,
    pub unqualified_time: UnqualifiedTimePolicy,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let year_end_month: u32 = var_or("YEAR_END_MONTH", "12")
            .parse()
            .context("YEAR_END_MONTH must be a number")?;
        if !(1..=12).contains(&year_end_month) {
            bail!("YEAR_END_MONTH must be between 1 and 12, got {year_end_month}");
        }

        let day_fallbacks = match optional_var("DAY_FALLBACKS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid DAY_FALLBACKS '{raw}'"))?,
            None => DayFallbacks::default(),
        };

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: optional_var("DATABASE_URL"),
            api_prefix: var_or("API_PREFIX", "/api"),
            log_dir: var_or("LOG_DIR", "logs"),

            rate_per_min: var_or("RATE_PER_MIN", "600")
                .parse()
                .context("RATE_PER_MIN must be a number")?,

            rules_path: optional_var("PAYROLL_RULES_PATH").map(PathBuf::from),
            default_scheme: optional_var("DEFAULT_DEDUCTION_SCHEME"),
            year_end_month,
            shift: var_or("SHIFT_WINDOW", "08:00-12:00,13:00-17:00")
                .parse()
                .context("invalid SHIFT_WINDOW")?,
            presence: var_or("PRESENCE_POLICY", "both_arrivals")
                .parse()
                .context("PRESENCE_POLICY must be both_arrivals, any_arrival or full_day")?,

            day_fallbacks,
            unqualified_time: var_or("UNQUALIFIED_TIME_POLICY", "as_authored")
                .parse()
                .context("UNQUALIFIED_TIME_POLICY must be as_authored or reject")?,
        })
    }

    /// Built-in schemes, overridden by the rules file when one is configured.
    pub fn payroll_rules(&self) -> anyhow::Result<PayrollRules> {
        let mut rules = PayrollRules::default();
        if let Some(path) = &self.rules_path {
            rules = rules.with_schemes_from_file(path)?;
        }

        if let Some(name) = &self.default_scheme {
            if rules.scheme(name).is_none() {
                bail!("DEFAULT_DEDUCTION_SCHEME '{name}' is not a known scheme");
            }
            rules.default_scheme = name.clone();
        }
        rules.year_end_month = self.year_end_month;
        rules.shift = self.shift;
        rules.presence = self.presence;

        Ok(rules)
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            day_fallbacks: self.day_fallbacks.clone(),
            unqualified_time: self.unqualified_time,
        }
    }
}
