use std::sync::Arc;

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::RwLock;

use wallclock_etc::ClockConfig;

use crate::authority::{Connector, PostgresConnector};
use crate::clock::WallClock;
use crate::name::{ClockName, Template};
use crate::{boundary, Result, TsnError};

/// Keeps one published [`WallClock`] per name for the lifetime of the registry.
///
/// Entries are never removed. A failed construction leaves no trace, so the
/// same name can be tried again later.
pub struct ClockRegistry {
    template: Template,
    connector: Arc<dyn Connector>,
    clocks: RwLock<HashMap<ClockName, Arc<WallClock>>>,
}

enum Published {
    Fresh(Arc<WallClock>),
    Raced(Arc<WallClock>),
}

impl ClockRegistry {
    pub fn new(template: Template, connector: Arc<dyn Connector>) -> Self {
        Self {
            template,
            connector,
            clocks: Default::default(),
        }
    }

    /// Creates a registry backed by PostgreSQL authorities.
    pub fn from_config(c: &ClockConfig) -> Result<Self> {
        c.validate()?;
        let template = Template::from_config(c)?;
        let connector = PostgresConnector::from_config(c);
        Ok(Self::new(template, Arc::new(connector)))
    }

    /// Gets the clock of the given name, or creates and publishes it.
    ///
    /// Construction runs outside of the lock. When several callers race on the
    /// same unseen name, the first one to publish wins and the others close
    /// what they built and return the winner.
    pub async fn get(&self, name: &str) -> Result<Arc<WallClock>> {
        if let Some(exist) = self.lookup(name) {
            debug!("get wall clock '{}' ok", name);
            return Ok(exist);
        }

        let name = ClockName::parse(name)?;
        let clock = self.build(&name).await?;

        let published = {
            let mut w = self.clocks.write();
            match w.entry(name) {
                Entry::Occupied(ent) => Published::Raced(Clone::clone(ent.get())),
                Entry::Vacant(ent) => {
                    ent.insert(Clone::clone(&clock));
                    Published::Fresh(Clone::clone(&clock))
                }
            }
        };

        match published {
            Published::Fresh(clock) => {
                info!(
                    "publish wall clock '{}' with authority #{}",
                    clock.name(),
                    clock.authority().id()
                );
                Ok(clock)
            }
            Published::Raced(exist) => {
                warn!(
                    "wall clock '{}' was published concurrently, discard authority #{}",
                    exist.name(),
                    clock.authority().id()
                );
                clock.authority().close();
                Ok(exist)
            }
        }
    }

    /// Same as [`ClockRegistry::get`], but a panic during construction is
    /// reported as [`TsnError::ClockUnavailable`].
    pub async fn obtain(&self, name: &str) -> Result<Arc<WallClock>> {
        boundary::contain(self.get(name), || TsnError::ClockUnavailable(name.to_string())).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clocks.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.read().is_empty()
    }

    /// Names of all published clocks, sorted.
    pub fn names(&self) -> Vec<ClockName> {
        let mut names = self.clocks.read().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    #[inline]
    fn lookup(&self, name: &str) -> Option<Arc<WallClock>> {
        let r = self.clocks.read();
        r.get(name).cloned()
    }

    async fn build(&self, name: &ClockName) -> Result<Arc<WallClock>> {
        let target = self.template.render(name)?;

        let authority = match self.connector.connect(&target).await {
            Ok(it) => it,
            Err(e) => {
                error!("cannot connect wall clock '{}': {:?}", name, e);
                return Err(TsnError::ResourceUnavailable(name.to_string(), e));
            }
        };

        if let Err(e) = authority.ping().await {
            error!("cannot ping wall clock '{}': {:?}", name, e);
            authority.close();
            return Err(TsnError::ResourceUnavailable(name.to_string(), e));
        }

        Ok(Arc::new(WallClock::new(Clone::clone(name), target, authority)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;

    use crate::authority::MemoryConnector;

    use super::*;

    fn init() {
        pretty_env_logger::try_init_timed().ok();
    }

    fn registry(connector: &MemoryConnector) -> ClockRegistry {
        let template = Template::new("mem://$database$", "$database$").unwrap();
        ClockRegistry::new(template, Arc::new(Clone::clone(connector)))
    }

    #[tokio::test]
    async fn test_get_twice() -> anyhow::Result<()> {
        init();

        let c = MemoryConnector::new();
        let reg = registry(&c);

        let first = reg.get("rainer").await?;
        let second = reg.get("rainer").await?;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.same_authority(&second));
        assert_eq!("mem://rainer", first.target());
        assert_eq!(1, c.connects());
        assert_eq!(1, reg.len());

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use() -> anyhow::Result<()> {
        init();

        const N: usize = 16;

        let c = MemoryConnector::new().delay(Duration::from_millis(50));
        let reg = Arc::new(registry(&c));

        let handles = (0..N)
            .map(|_| {
                let reg = Clone::clone(&reg);
                tokio::spawn(async move { reg.obtain("shared").await })
            })
            .collect::<Vec<_>>();

        let mut clocks = vec![];
        for next in join_all(handles).await {
            clocks.push(next??);
        }

        let first = &clocks[0];
        for next in &clocks {
            assert!(Arc::ptr_eq(first, next));
            assert!(first.same_authority(next));
        }

        // every loser closed what it built
        assert_eq!(1, c.live());
        assert_eq!(c.connects() - 1, c.closes());
        assert_eq!(1, reg.len());

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_then_recover() -> anyhow::Result<()> {
        init();

        let c = MemoryConnector::new();
        let reg = registry(&c);

        c.set_reachable(false);
        let res = reg.obtain("rainer").await;
        assert!(matches!(res, Err(TsnError::ResourceUnavailable(name, _)) if name == "rainer"));
        assert!(!reg.contains("rainer"));
        assert!(reg.is_empty());

        c.set_reachable(true);
        let clock = reg.obtain("rainer").await?;
        assert!(clock.new_tsn().await? > 0);
        assert!(reg.contains("rainer"));

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_name() {
        init();

        let c = MemoryConnector::new();
        let reg = registry(&c);

        for bad in ["", "two words", "x$database$"] {
            let res = reg.obtain(bad).await;
            assert!(matches!(res, Err(TsnError::InvalidName(..))), "{:?}", bad);
        }
        assert_eq!(0, c.connects());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_contained() -> anyhow::Result<()> {
        init();

        let c = MemoryConnector::new();
        let reg = registry(&c);

        c.set_panicking(true);
        let res = reg.obtain("rainer").await;
        assert!(matches!(res, Err(TsnError::ClockUnavailable(name)) if name == "rainer"));
        assert!(reg.is_empty());

        c.set_panicking(false);
        let clock = reg.obtain("rainer").await?;

        c.set_panicking(true);
        let res = clock.new_tsn().await;
        assert!(matches!(res, Err(TsnError::TsnUnavailable(name)) if name == "rainer"));

        c.set_panicking(false);
        assert!(clock.new_tsn().await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_independent_clocks() -> anyhow::Result<()> {
        init();

        let c = MemoryConnector::new();
        let reg = registry(&c);

        let a = reg.get("a").await?;
        let b = reg.get("b").await?;
        assert!(!a.same_authority(&b));

        for _ in 0..10 {
            a.new_tsn().await?;
        }
        assert_eq!(1, b.new_tsn().await?);
        assert_eq!(11, a.new_tsn().await?);

        let names = reg.names();
        assert_eq!(vec!["a", "b"], names.iter().map(|it| it.as_str()).collect::<Vec<_>>());

        Ok(())
    }

    #[test]
    fn test_from_config() {
        init();

        assert!(matches!(
            ClockRegistry::from_config(&ClockConfig::default()),
            Err(TsnError::ConfigurationError(_))
        ));

        let reg = ClockRegistry::from_config(&ClockConfig::with_template(
            "host=127.0.0.1 dbname=$database$",
        ));
        assert!(reg.is_ok_and(|it| it.is_empty()));
    }

    #[test]
    fn test_from_config_empty_pool() {
        init();

        let mut c = ClockConfig::with_template("host=127.0.0.1 port=1 dbname=$database$");
        c.pool.max_size = 0;
        assert!(matches!(
            ClockRegistry::from_config(&c),
            Err(TsnError::ConfigurationError(wallclock_etc::ConfigError::Invalid(_)))
        ));
    }
}
