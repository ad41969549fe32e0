use serde::Deserialize;

use crate::error::Error;
use crate::error::Result;
use crate::sim::Page;

/// The canned classroom sequence used when no reference sequence is
/// supplied. Defaulting is a caller-side policy, the simulator core
/// never sees it.
pub const DEFAULT_SEQUENCE: &[Page] = &[7, 0, 1, 2, 0, 3, 0, 4];

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    /// Comma-delimited page references, empty for the canned default.
    pub sequence: String,
    pub frame_count: usize,
    /// The period of one simulated time unit.
    pub tick_interval_ms: u64,
    pub log_level: String,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("sequence", "")?
            .set_default("frame_count", 3)?
            .set_default("tick_interval_ms", 1000)?
            .set_default("log_level", "info")?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGESIM"));
        Ok(cfg.build()?.try_deserialize()?)
    }

    pub fn parse_sequence(&self) -> Result<Vec<Page>> {
        parse_sequence(&self.sequence)
    }
}

/// Split a delimited text field into page references, falling back to
/// the canned sequence when the field is blank.
pub fn parse_sequence(input: &str) -> Result<Vec<Page>> {
    if input.trim().is_empty() {
        return Ok(DEFAULT_SEQUENCE.to_vec());
    }
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<Page>()
                .map_err(|_| Error::value(format!("invalid page reference {:?}", token)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!(3, cfg.frame_count);
        assert_eq!(1000, cfg.tick_interval_ms);
        assert_eq!(DEFAULT_SEQUENCE.to_vec(), cfg.parse_sequence()?);
        Ok(())
    }

    #[test]
    fn test_parse_sequence() -> Result<()> {
        assert_eq!(vec![7, 0, 1], parse_sequence("7,0,1")?);
        assert_eq!(vec![7, 0, 1], parse_sequence(" 7 , 0 , 1 ")?);
        assert_eq!(DEFAULT_SEQUENCE.to_vec(), parse_sequence("  ")?);
        assert!(matches!(parse_sequence("7,x,1"), Err(Error::Value(_))));
        assert!(matches!(parse_sequence("7,,1"), Err(Error::Value(_))));
        Ok(())
    }
}
