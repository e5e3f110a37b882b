/// Tunable knobs for a [`crate::Store`].
///
/// This is the entire recognized configuration surface: no environment
/// variables, no CLI (the store is a library; `kvtool` is a separate
/// consumer of it).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// When true, force data and the containing directory to stable storage
    /// after each mutating operation.
    pub fsync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { fsync: true }
    }
}

/// Options accepted by [`crate::Store::open`].
///
/// `serializer` selects which [`crate::Codec`] backs the store; handler
/// registries are left to the codec implementation to own (the core treats
/// them as opaque, per the codec contract).
#[derive(Clone, Debug, Default)]
pub struct StoreOptions {
    pub config: Config,
}
