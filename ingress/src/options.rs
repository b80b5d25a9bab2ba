use crate::watch::WatchScope;
use getset::{CopyGetters, Getters};
use std::time::Duration;
use typed_builder::TypedBuilder;
use vg_api::constants::DEFAULT_INGRESS_CLASS;

#[derive(Debug, Clone, Getters, CopyGetters, PartialEq, Eq, TypedBuilder)]
pub struct Options {
    #[getset(get_copy = "pub")]
    #[builder(default = Duration::from_secs(30))]
    resync_interval: Duration,

    #[getset(get = "pub")]
    #[builder(default = DEFAULT_INGRESS_CLASS.to_string(), setter(into))]
    ingress_class: String,

    #[getset(get = "pub")]
    #[builder(default)]
    watch_scope: WatchScope,
}

impl Default for Options {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();

        assert_eq!(options.resync_interval(), Duration::from_secs(30));
        assert_eq!(options.ingress_class(), "vale-gateway");
        assert_eq!(options.watch_scope(), &WatchScope::All);
    }
}
