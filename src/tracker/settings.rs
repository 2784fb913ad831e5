/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::time::Duration;

use log::warn;
#[cfg(feature = "async-daemonize")]
use structopt::StructOpt;

/// Shortest poll or confirmation interval the tracker runs with.
/// A zero interval would spin without ever yielding to the executor.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Tracker timing settings
#[derive(Clone, Debug)]
pub struct TrackerSettings {
    /// Interval between two status refreshes while attached
    pub poll_interval: Duration,
    /// Interval between two receipt lookups while a claim is pending
    pub confirmation_interval: Duration,
    /// Give up waiting for a claim receipt after this long, `None` waits forever
    pub confirmation_timeout: Option<Duration>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            confirmation_interval: Duration::from_secs(4),
            confirmation_timeout: None,
        }
    }
}

impl TrackerSettings {
    /// Raise intervals below [`MIN_INTERVAL`] to it.
    pub fn clamped(mut self) -> Self {
        for (name, interval) in [
            ("poll_interval", &mut self.poll_interval),
            ("confirmation_interval", &mut self.confirmation_interval),
        ] {
            if *interval < MIN_INTERVAL {
                warn!(
                    target: "tracker::settings",
                    "{name} of {interval:?} is too short, using {MIN_INTERVAL:?}",
                );
                *interval = MIN_INTERVAL;
            }
        }

        self
    }
}

// The following is used so we can have tracker settings configurable
// from TOML files.

/// Defines the tracker settings.
#[cfg(feature = "async-daemonize")]
#[derive(Clone, Debug, serde::Deserialize, StructOpt, structopt_toml::StructOptToml)]
#[structopt()]
pub struct TrackerSettingsOpt {
    /// Seconds between two file status refreshes (at least 1)
    #[structopt(long)]
    pub poll_interval: Option<u64>,

    /// Seconds between two receipt lookups while a claim is pending (at least 1)
    #[structopt(long)]
    pub confirmation_interval: Option<u64>,

    /// Seconds to wait for a claim confirmation (waits forever if unset)
    #[structopt(long)]
    pub confirmation_timeout: Option<u64>,
}

#[cfg(feature = "async-daemonize")]
impl From<TrackerSettingsOpt> for TrackerSettings {
    fn from(opt: TrackerSettingsOpt) -> Self {
        let def = TrackerSettings::default();
        let secs = |s: u64| Duration::from_secs(s.max(1));

        Self {
            poll_interval: opt.poll_interval.map(secs).unwrap_or(def.poll_interval),
            confirmation_interval: opt
                .confirmation_interval
                .map(secs)
                .unwrap_or(def.confirmation_interval),
            confirmation_timeout: opt
                .confirmation_timeout
                .map(Duration::from_secs)
                .or(def.confirmation_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_intervals_are_raised() {
        let settings = TrackerSettings {
            poll_interval: Duration::ZERO,
            confirmation_interval: Duration::from_millis(1),
            confirmation_timeout: Some(Duration::ZERO),
        }
        .clamped();
        assert_eq!(settings.poll_interval, MIN_INTERVAL);
        assert_eq!(settings.confirmation_interval, MIN_INTERVAL);
        assert_eq!(settings.confirmation_timeout, Some(Duration::ZERO));

        let settings = TrackerSettings::default().clamped();
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
    }

    #[cfg(feature = "async-daemonize")]
    #[test]
    fn zero_seconds_from_config() {
        let opt = TrackerSettingsOpt {
            poll_interval: Some(0),
            confirmation_interval: Some(0),
            confirmation_timeout: Some(0),
        };
        let settings: TrackerSettings = opt.into();
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.confirmation_interval, Duration::from_secs(1));
        assert_eq!(settings.confirmation_timeout, Some(Duration::ZERO));
    }

    #[cfg(feature = "async-daemonize")]
    #[test]
    fn args_parse_without_toml() {
        let opt = TrackerSettingsOpt::from_iter(["dlpwatch", "--poll-interval", "5"]);
        let settings: TrackerSettings = opt.into();
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.confirmation_interval, Duration::from_secs(4));
    }

    #[cfg(feature = "async-daemonize")]
    #[test]
    fn opt_falls_back_to_defaults() {
        let opt = TrackerSettingsOpt {
            poll_interval: None,
            confirmation_interval: Some(1),
            confirmation_timeout: Some(120),
        };
        let settings: TrackerSettings = opt.into();
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.confirmation_interval, Duration::from_secs(1));
        assert_eq!(settings.confirmation_timeout, Some(Duration::from_secs(120)));
    }
}
