//! Worker and step phase enums as the single source of truth for their strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The subsystem that emitted a step event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Worker {
    Maestro,
    Mtc,
    #[default]
    Som,
}

impl Worker {
    /// Attributes a step-start line to a worker by its text.
    ///
    /// `maestro` wins over `mtc`; anything else belongs to `som`.
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        if line.contains("maestro") {
            Self::Maestro
        } else if line.contains("mtc") {
            Self::Mtc
        } else {
            Self::Som
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Maestro => "maestro",
            Self::Mtc => "mtc",
            Self::Som => "som",
        }
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Worker {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maestro" => Ok(Self::Maestro),
            "mtc" => Ok(Self::Mtc),
            "som" => Ok(Self::Som),
            _ => Err(UnknownValue {
                what: "worker",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether a step event opens or closes a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepPhase {
    Start,
    End,
}

impl StepPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepPhase {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            _ => Err(UnknownValue {
                what: "step phase",
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! string_serde {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(Worker);
string_serde!(StepPhase);

/// Error type for unrecognized worker or phase strings.
#[derive(Debug, Clone)]
pub struct UnknownValue {
    what: &'static str,
    value: String,
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.what, self.value)
    }
}

impl std::error::Error for UnknownValue {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_workers() {
        for worker in [Worker::Maestro, Worker::Mtc, Worker::Som] {
            let parsed: Worker = worker.to_string().parse().expect("should parse");
            assert_eq!(parsed, worker, "roundtrip failed for {worker:?}");
        }
    }

    #[test]
    fn worker_attribution_prefers_maestro() {
        assert_eq!(
            Worker::from_line("wait for maestro to complete undocking"),
            Worker::Maestro
        );
        assert_eq!(
            Worker::from_line("maestro relays mtc command"),
            Worker::Maestro
        );
        assert_eq!(Worker::from_line("wait for mtc task"), Worker::Mtc);
        assert_eq!(Worker::from_line("move arm to home"), Worker::Som);
    }

    #[test]
    fn unknown_worker_errors() {
        let err = "robot".parse::<Worker>().unwrap_err();
        assert_eq!(err.to_string(), "unknown worker: robot");
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&StepPhase::End).unwrap();
        assert_eq!(json, "\"end\"");
        let parsed: StepPhase = serde_json::from_str("\"start\"").unwrap();
        assert_eq!(parsed, StepPhase::Start);
    }
}
