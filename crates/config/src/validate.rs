//! Semantic checks that serde cannot express.

use crate::{
    error::{Error, Result},
    schema::ChorusConfig,
};

impl ChorusConfig {
    /// Reject values that would make the relay misbehave at runtime.
    ///
    /// Every problem is reported, not just the first.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.relay.marker.is_empty() {
            problems.push("relay.marker must not be empty".to_string());
        }
        if !self.polling.slack.is_finite() || self.polling.slack < 0.0 {
            problems.push(format!(
                "polling.slack must be a non-negative number, got {}",
                self.polling.slack
            ));
        }
        if self.polling.buffer == 0 {
            problems.push("polling.buffer must be at least 1".to_string());
        }
        if self.outbound.queue_capacity == 0 {
            problems.push("outbound.queue_capacity must be at least 1".to_string());
        }
        if self.outbound.max_in_flight == 0 {
            problems.push("outbound.max_in_flight must be at least 1".to_string());
        }
        if !is_http_url(&self.youtube.api_base) {
            problems.push(format!(
                "youtube.api_base must be an http(s) URL, got {:?}",
                self.youtube.api_base
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid { problems })
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ChorusConfig::default().validate().unwrap();
    }

    #[test]
    fn reports_every_problem() {
        let mut cfg = ChorusConfig::default();
        cfg.relay.marker.clear();
        cfg.polling.slack = -0.2;
        cfg.outbound.max_in_flight = 0;

        let Err(Error::Invalid { problems }) = cfg.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("relay.marker"));
        assert!(problems[1].contains("polling.slack"));
        assert!(problems[2].contains("max_in_flight"));
    }

    #[test]
    fn rejects_nan_slack_and_bad_api_base() {
        let mut cfg = ChorusConfig::default();
        cfg.polling.slack = f64::NAN;
        cfg.youtube.api_base = "googleapis.com".into();
        let err = cfg.validate().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("polling.slack"));
        assert!(text.contains("youtube.api_base"));
    }
}
