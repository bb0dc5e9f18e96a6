use std::sync::Arc;

use clinic::{ClinicApi, RemoteError, SymptomMatcher};

use super::config::Config;

pub struct State {
    pub config: Config,
    pub api: ClinicApi,
    pub matcher: SymptomMatcher<'static>,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, RemoteError> {
        let api = ClinicApi::new(&config.api_url, config.upstream_timeout)?;

        Ok(Arc::new(Self {
            config,
            api,
            matcher: SymptomMatcher::default(),
        }))
    }
}
