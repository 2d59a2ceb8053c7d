use std::sync::Arc;

use wallclock_core::authority::MemoryConnector;
use wallclock_core::{
    default_registry, install_default_registry, obtain_clock, ClockRegistry, Template,
};

#[tokio::test]
async fn test_obtain_clock() -> anyhow::Result<()> {
    pretty_env_logger::try_init_timed().ok();

    let c = MemoryConnector::new();
    let template = Template::new("mem://$database$", "$database$")?;
    let installed = install_default_registry(ClockRegistry::new(template, Arc::new(Clone::clone(&c))));
    assert!(installed.is_ok());

    let clock = obtain_clock("rainer").await?;
    let v1 = clock.new_tsn().await?;
    let again = obtain_clock("rainer").await?;
    assert!(clock.same_authority(&again));
    assert!(again.new_tsn().await? > v1);

    assert!(default_registry()?.contains("rainer"));
    assert_eq!(1, c.connects());

    // the default registry can only be installed once
    let template = Template::new("mem://other_$database$", "$database$")?;
    let second = install_default_registry(ClockRegistry::new(template, Arc::new(c)));
    assert!(second.is_err());

    Ok(())
}
