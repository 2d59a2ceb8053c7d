use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use wallclock_core::authority::CLOCK_SCHEMA;

pub(crate) struct CommandSchema;

#[async_trait]
impl super::Executable for CommandSchema {
    async fn execute(&self, _shutdown: Arc<Notify>) -> Result<()> {
        print!("{}", CLOCK_SCHEMA);
        Ok(())
    }
}
