pub mod api;

use crate::cli::Args;
use api::AppState;
use std::error::Error;

pub struct Server {
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(state: AppState, args: Args) -> Self {
        Self { state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(self.state.clone(), &self.args).await
    }
}
