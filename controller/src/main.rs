mod config;
mod gateway;
mod host;
mod http;
mod ingest;
mod jobs;
mod mirror;
mod persist;
mod publish;
mod reconcile;
mod state;
mod store;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
