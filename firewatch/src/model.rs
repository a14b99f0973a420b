use serde::Serialize;

/// One sensor sample. The timestamp is unix seconds, assigned by the server
/// at the moment the sample is accepted, never by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub smoke: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: i64,
}

/// Three-tier safety classification. The wire labels are fixed: dashboards
/// key badge and row styling off these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Safe,
    Warning,
    Danger,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Safe => "SAFE",
            Status::Warning => "WARNING",
            Status::Danger => "DANGER",
        }
    }

    /// Numeric severity carried alongside the label, 1 = safe through 3 = danger.
    pub fn level(&self) -> u8 {
        match self {
            Status::Safe => 1,
            Status::Warning => 2,
            Status::Danger => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "SAFE" => Some(Status::Safe),
            "WARNING" => Some(Status::Warning),
            "DANGER" => Some(Status::Danger),
            _ => None,
        }
    }
}

/// A reading plus its classification. The status is persisted with the
/// reading but must always equal `classify(reading)` recomputed fresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedReading {
    pub reading: Reading,
    pub status: Status,
}

/// Wire shape of one classified sample, used by both the history list and
/// the current view.
#[derive(Debug, Clone, Serialize)]
pub struct SampleView {
    pub smoke: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub status: Status,
    pub level: u8,
    pub timestamp: i64,
}

impl From<ClassifiedReading> for SampleView {
    fn from(c: ClassifiedReading) -> Self {
        Self {
            smoke: c.reading.smoke,
            temperature: c.reading.temperature,
            humidity: c.reading.humidity,
            status: c.status,
            level: c.status.level(),
            timestamp: c.reading.timestamp,
        }
    }
}

/// Current-snapshot response. Before the first ingest the sample fields are
/// absent and only `online: false` is serialized.
#[derive(Debug, Serialize)]
pub struct CurrentView {
    #[serde(flatten)]
    pub sample: Option<SampleView>,
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub ok: bool,
    pub items: Vec<SampleView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in [Status::Safe, Status::Warning, Status::Danger] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("UNKNOWN"), None);
    }

    #[test]
    fn status_serializes_as_fixed_labels() {
        assert_eq!(
            serde_json::to_string(&Status::Danger).unwrap(),
            "\"DANGER\""
        );
    }

    #[test]
    fn absent_current_view_is_offline_only() {
        let view = CurrentView {
            sample: None,
            online: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({"online": false}));
    }
}
