use crate::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One step of the virtual-worker ramp: move linearly towards `target`
/// workers over `duration`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }

    /// Parses `DURATION:TARGET`, e.g. `1m:10` or `30s:0`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Stage {
            stage: s.to_string(),
            reason,
        };

        let (duration, target) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| invalid("expected DURATION:TARGET".to_string()))?;
        let duration = humantime::parse_duration(duration.trim())
            .map_err(|e| invalid(format!("bad duration: {e}")))?;
        let target = target
            .trim()
            .parse()
            .map_err(|e| invalid(format!("bad target: {e}")))?;

        Ok(Self { duration, target })
    }

    /// Parses a comma separated list of stages.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, ConfigError> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty() {
            Err(ConfigError::NoStages)
        } else {
            Ok(stages)
        }
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

pub fn total_duration(stages: &[Stage]) -> Duration {
    stages.iter().map(|s| s.duration).sum()
}

/// Number of workers that should be active `elapsed` into the run, or `None`
/// once every stage has completed. The ramp starts from zero workers.
pub fn target_at(stages: &[Stage], elapsed: Duration) -> Option<usize> {
    let mut start = Duration::ZERO;
    let mut from = 0usize;

    for stage in stages {
        let end = start + stage.duration;
        if elapsed < end {
            let progress = (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
            let delta = stage.target as f64 - from as f64;
            return Some((from as f64 + delta * progress).round().max(0.) as usize);
        }
        start = end;
        from = stage.target;
    }

    None
}
