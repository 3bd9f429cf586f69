// SPDX-License-Identifier: MIT

//! Optional TOML description of the emulated card and the bring-up tunables.
//!
//! ```toml
//! [card]
//! kind = "sdhc"        # sdhc | sdsc | legacy
//! busy_polls = 2
//! response_delay = 1
//!
//! [bring_up]
//! init_retries = 20
//! speed_hz = 20_000_000
//! ```

use anyhow::Context;
use cardio::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Sdhc,
    Sdsc,
    Legacy,
}

impl CardKind {
    pub fn base_profile(self) -> CardProfile {
        match self {
            CardKind::Sdhc => CardProfile::sdhc(),
            CardKind::Sdsc => CardProfile::sdsc_v2(),
            CardKind::Legacy => CardProfile::legacy(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CardSection {
    pub kind: CardKind,
    pub busy_polls: Option<usize>,
    pub response_delay: Option<usize>,
    pub voltage_window: Option<u32>,
    pub start_token: Option<u8>,
    /// Refuse clock changes.
    pub fixed_clock: bool,
    pub reject_ocr: bool,
    pub silent_if_cond: bool,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BringUpSection {
    pub warmup_bytes: Option<usize>,
    pub reset_retries: Option<usize>,
    pub init_retries: Option<usize>,
    pub response_retries: Option<usize>,
    pub speed_hz: Option<u32>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileFile {
    pub card: CardSection,
    pub bring_up: BringUpSection,
}

impl ProfileFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read profile {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid profile {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn card_profile(&self) -> CardProfile {
        let card = &self.card;
        let mut profile = card.kind.base_profile();
        if let Some(n) = card.busy_polls {
            profile = profile.with_busy_polls(n);
        }
        if let Some(n) = card.response_delay {
            profile = profile.with_response_delay(n);
        }
        if let Some(window) = card.voltage_window {
            profile = profile.with_voltage_window(window);
        }
        if let Some(token) = card.start_token {
            profile = profile.with_start_token(token);
        }
        if card.fixed_clock {
            profile = profile.with_fixed_clock();
        }
        if card.reject_ocr {
            profile = profile.with_ocr_rejected();
        }
        if card.silent_if_cond {
            profile = profile.with_silent_if_cond();
        }
        profile
    }

    /// Bring-up settings; `speed_hz` from the command line wins over the file.
    pub fn bring_up(&self, speed_hz: Option<u32>) -> BringUpConfig {
        let section = &self.bring_up;
        let mut config = BringUpConfig::default();
        if let Some(n) = section.warmup_bytes {
            config = config.with_warmup_bytes(n);
        }
        if let Some(n) = section.reset_retries {
            config = config.with_reset_retries(n);
        }
        if let Some(n) = section.init_retries {
            config = config.with_init_retries(n);
        }
        if let Some(n) = section.response_retries {
            config = config.with_response_retries(n);
        }
        match speed_hz.or(section.speed_hz) {
            Some(hz) => config.with_speed_up(hz),
            None => config,
        }
    }
}
