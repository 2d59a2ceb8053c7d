use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use wallclock_core::authority::MemoryConnector;
use wallclock_core::{ClockRegistry, Template, Tsn, WallClock};
use wallclock_etc::ClockConfig;

pub(crate) struct CommandIssue {
    clock: String,
    count: usize,
    config: Option<PathBuf>,
    memory: bool,
}

impl CommandIssue {
    pub(crate) fn new(clock: String, count: usize, config: Option<PathBuf>, memory: bool) -> Self {
        Self {
            clock,
            count,
            config,
            memory,
        }
    }

    fn registry(&self) -> Result<ClockRegistry> {
        if self.memory {
            let template = Template::new("memory://$database$", "$database$")?;
            return Ok(ClockRegistry::new(
                template,
                Arc::new(MemoryConnector::new()),
            ));
        }

        let c = match &self.config {
            Some(path) => ClockConfig::load(path)?,
            None => ClockConfig::from_env(),
        };
        c.validate()?;

        Ok(ClockRegistry::from_config(&c)?)
    }
}

#[async_trait]
impl super::Executable for CommandIssue {
    async fn execute(&self, shutdown: Arc<Notify>) -> Result<()> {
        let registry = self.registry()?;
        let clock = registry.obtain(&self.clock).await?;

        let begin = Instant::now();

        tokio::select! {
            res = issue(&clock, self.count) => {
                let last = res?;
                info!(
                    "{} x new tsn from wall clock '{}' in {:?}, last={:?}",
                    self.count,
                    clock.name(),
                    begin.elapsed(),
                    last
                );
            }
            _ = shutdown.notified() => {
                info!("issuing from wall clock '{}' is stopped", clock.name());
            }
        }

        Ok(())
    }
}

async fn issue(clock: &WallClock, count: usize) -> Result<Option<Tsn>> {
    let mut prev: Option<Tsn> = None;
    for _ in 0..count {
        let next = clock.new_tsn().await?;
        if let Some(prev) = prev {
            if next <= prev {
                bail!("tsn {} is not greater than previous {}", next, prev);
            }
        }
        println!("{}", next);
        prev.replace(next);
    }
    Ok(prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_memory() -> Result<()> {
        pretty_env_logger::try_init_timed().ok();

        let c = CommandIssue::new("rainer".into(), 3, None, true);
        let registry = c.registry()?;
        let clock = registry.obtain("rainer").await?;
        assert_eq!(Some(3), issue(&clock, 3).await?);
        assert_eq!(Some(4), issue(&clock, 1).await?);
        assert_eq!(None, issue(&clock, 0).await?);

        Ok(())
    }
}
