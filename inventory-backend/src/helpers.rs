use chrono::{DateTime, Utc};
use rand::distr::{Alphanumeric, SampleString};
use rand::rng;

/// Random signing secret for when none is configured.
pub fn generate_secret() -> String {
  Alphanumeric.sample_string(&mut rng(), 64)
}

pub fn now() -> DateTime<Utc> {
  Utc::now()
}
